//! Mock data source for testing and development
//!
//! Provides a short generated match between two fighters: a few rounds of
//! jump-in aerials, tilts and grabs against a shielding opponent. The
//! matching label dictionary is available through [`dictionary`].

use super::{FighterFrame, FighterInfo, Replay, ReplaySource, SessionMetadata};
use crate::Result;
use crate::labels::{DEFAULT_LAYER, LabelDictionary};
use crate::state::{FighterId, Motion, Position, Status};
use chrono::{TimeZone, Utc};

pub const MOCK_FIGHTER: FighterId = 8;
pub const MOCK_OPPONENT: FighterId = 20;

/// Motion hashes used by the mock match
pub mod motions {
    pub const WAIT: u64 = 0x0000000001;
    pub const JUMP_F: u64 = 0x0000000050;
    pub const JUMP_F_MINI: u64 = 0x0000000051;
    pub const JUMP_AERIAL_F: u64 = 0x0000000052;
    pub const ATTACK_AIR_N: u64 = 0x0000000010;
    pub const LANDING_AIR_N: u64 = 0x0000000011;
    pub const ATTACK_HI3: u64 = 0x0000000020;
    pub const CATCH: u64 = 0x0000000030;
    pub const GUARD: u64 = 0x0000000060;
    pub const DAMAGE_HI: u64 = 0x0000000070;
}

const STATUS_WAIT: Status = 0x00;
const STATUS_JUMP: Status = 0x0b;
const STATUS_ATTACK_AIR: Status = 0x22;
const STATUS_LANDING: Status = 0x23;
const STATUS_ATTACK: Status = 0x27;
const STATUS_CATCH: Status = 0x39;
const STATUS_GUARD: Status = 0x1b;
const STATUS_DAMAGE: Status = 0x48;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Contact {
    None,
    Hit,
    Shield,
}

/// One scripted beat of the match
struct Beat {
    own: (u64, Status),
    other: (u64, Status),
    frames: u32,
    /// Vertical speed of the attacker per frame
    dy: f32,
    contact: Contact,
}

fn beat(
    own: (u64, Status),
    other: (u64, Status),
    frames: u32,
    dy: f32,
    contact: Contact,
) -> Beat {
    Beat {
        own,
        other,
        frames,
        dy,
        contact,
    }
}

fn script() -> Vec<Beat> {
    use motions::*;
    let wait = (WAIT, STATUS_WAIT);
    let guard = (GUARD, STATUS_GUARD);
    let damage = (DAMAGE_HI, STATUS_DAMAGE);
    let nair = (ATTACK_AIR_N, STATUS_ATTACK_AIR);
    let landing = (LANDING_AIR_N, STATUS_LANDING);

    let mut beats = Vec::new();
    for round in 0..3 {
        // neutral, then a full hop nair that lands on shield or connects
        beats.push(beat(wait, wait, 6, 0.0, Contact::None));
        beats.push(beat((JUMP_F, STATUS_JUMP), wait, 4, 3.0, Contact::None));
        let contact = if round == 1 { Contact::Shield } else { Contact::Hit };
        let defender = match contact {
            Contact::Shield => guard,
            _ => damage,
        };
        beats.push(beat(nair, defender, 5, -3.0, contact));
        beats.push(beat(landing, wait, 3, -0.6, Contact::None));
        // follow-up: up tilt on a hit, grab when shielded
        if contact == Contact::Hit {
            beats.push(beat((ATTACK_HI3, STATUS_ATTACK), damage, 6, 0.0, Contact::Hit));
        } else {
            beats.push(beat((CATCH, STATUS_CATCH), guard, 4, 0.0, Contact::None));
        }
    }
    // a short hop into a double jump to close the match
    beats.push(beat((JUMP_F_MINI, STATUS_JUMP), wait, 3, 2.0, Contact::None));
    beats.push(beat((JUMP_AERIAL_F, STATUS_JUMP), wait, 4, 2.0, Contact::None));
    beats.push(beat(nair, wait, 5, -2.0, Contact::None));
    beats.push(beat(wait, wait, 4, -0.6, Contact::None));
    beats
}

/// Mock replay source producing the same match every time
#[derive(Debug, Clone)]
pub struct MockReplaySource {
    player_tags: (String, String),
}

impl Default for MockReplaySource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockReplaySource {
    pub fn new() -> Self {
        Self {
            player_tags: ("P1".to_string(), "P2".to_string()),
        }
    }

    pub fn with_players(mut self, own: impl Into<String>, other: impl Into<String>) -> Self {
        self.player_tags = (own.into(), other.into());
        self
    }

    pub fn replay(&self) -> Replay {
        let start_time = Utc
            .with_ymd_and_hms(2024, 5, 1, 18, 30, 0)
            .single()
            .unwrap_or_default();
        let metadata = SessionMetadata::new(
            start_time,
            vec![
                FighterInfo::new(MOCK_FIGHTER, self.player_tags.0.as_str()).with_name("pikachu"),
                FighterInfo::new(MOCK_OPPONENT, self.player_tags.1.as_str()).with_name("fox"),
            ],
        );

        let mut frames = Vec::new();
        let mut frame = 0u32;
        let mut y = 0.0f32;
        for beat in script() {
            for step in 0..beat.frames {
                y = (y + beat.dy).max(0.0);
                let mut own = FighterFrame::new(frame, Motion::new(beat.own.0), beat.own.1);
                own.position = Position::new(-10.0, y);
                let mut other =
                    FighterFrame::new(frame, Motion::new(beat.other.0), beat.other.1);
                other.position = Position::new(10.0, 0.0);

                let impact = step < 2;
                match beat.contact {
                    Contact::Hit => {
                        own.hitlag = impact;
                        own.attack_connected = impact;
                        other.hitlag = impact;
                        other.hitstun = beat.frames - step;
                    }
                    Contact::Shield => {
                        own.attack_connected = impact;
                        other.shieldlag = impact;
                    }
                    Contact::None => {}
                }
                frames.push(vec![own, other]);
                frame += 1;
            }
        }

        Replay { metadata, frames }
    }
}

impl ReplaySource for MockReplaySource {
    fn describe(&self) -> String {
        "mock replay".to_string()
    }

    fn load(&self) -> Result<Replay> {
        Ok(self.replay())
    }
}

/// Label dictionary describing the mock match
pub fn dictionary() -> LabelDictionary {
    use motions::*;
    let mut dict = LabelDictionary::new();
    for (name, motion) in [
        ("wait", WAIT),
        ("jump_f", JUMP_F),
        ("jump_f_mini", JUMP_F_MINI),
        ("jump_aerial_f", JUMP_AERIAL_F),
        ("attack_air_n", ATTACK_AIR_N),
        ("landing_air_n", LANDING_AIR_N),
        ("attack_hi3", ATTACK_HI3),
        ("catch", CATCH),
        ("guard", GUARD),
        ("damage_hi", DAMAGE_HI),
    ] {
        dict.add_canonical(name, Motion::new(motion));
    }
    dict.add_status("guard", STATUS_GUARD);

    dict.add_fighter(MOCK_FIGHTER, "pikachu");
    dict.add_fighter(MOCK_OPPONENT, "fox");
    for (motion, label) in [
        (ATTACK_AIR_N, "nair"),
        (LANDING_AIR_N, "nair"),
        (ATTACK_HI3, "utilt"),
        (CATCH, "grab"),
        (JUMP_F, "jump"),
        (JUMP_F_MINI, "jump"),
    ] {
        dict.add_user_label(MOCK_FIGHTER, Motion::new(motion), label, DEFAULT_LAYER);
    }
    dict.add_user_label(MOCK_OPPONENT, Motion::new(GUARD), "shield", DEFAULT_LAYER);
    dict
}
