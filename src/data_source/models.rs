//! Core data models for replay frames
//!
//! A replay is a list of frames, and every frame holds one [`FighterFrame`]
//! per fighter slot, in the order of [`SessionMetadata::fighters`].

use crate::state::{FighterId, HitStatus, Motion, Position, State, StateFlags, Status};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of one fighter slot in a session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FighterInfo {
    /// Character id
    pub fighter_id: FighterId,

    /// Tag of the player controlling the character
    pub player_tag: String,

    /// Display name of the character
    #[serde(default)]
    pub name: String,
}

impl FighterInfo {
    pub fn new(fighter_id: FighterId, player_tag: impl Into<String>) -> Self {
        Self {
            fighter_id,
            player_tag: player_tag.into(),
            name: String::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Header describing a replay session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    /// When the game was played
    pub start_time: DateTime<Utc>,

    /// Fighter slots, one per player
    pub fighters: Vec<FighterInfo>,
}

impl SessionMetadata {
    pub fn new(start_time: DateTime<Utc>, fighters: Vec<FighterInfo>) -> Self {
        Self {
            start_time,
            fighters,
        }
    }
}

/// One fighter's data for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FighterFrame {
    /// Frame index within the session
    pub frame: u32,

    /// Motion hash (40 bits)
    pub motion: Motion,

    pub status: Status,

    #[serde(default)]
    pub hit_status: HitStatus,

    #[serde(default)]
    pub position: Position,

    #[serde(default)]
    pub damage: f32,

    #[serde(default)]
    pub shield: f32,

    /// Frozen by a hit, either as attacker or as victim
    #[serde(default)]
    pub hitlag: bool,

    /// Remaining hitstun frames
    #[serde(default)]
    pub hitstun: u32,

    /// Frozen by an attack hitting this fighter's shield
    #[serde(default)]
    pub shieldlag: bool,

    /// This fighter's attack connected on this frame
    #[serde(default)]
    pub attack_connected: bool,
}

impl FighterFrame {
    pub fn new(frame: u32, motion: Motion, status: Status) -> Self {
        Self {
            frame,
            motion,
            status,
            hit_status: 0,
            position: Position::default(),
            damage: 0.0,
            shield: 0.0,
            hitlag: false,
            hitstun: 0,
            shieldlag: false,
            attack_connected: false,
        }
    }

    /// Hitlag from receiving a hit; the attacker's own freeze does not count
    fn hit_freeze(&self) -> bool {
        self.hitlag && !self.attack_connected
    }

    /// Snapshot of this fighter with interaction flags taken from `opponents`
    pub fn to_state(&self, opponents: &[&FighterFrame]) -> State {
        let mut flags = StateFlags::empty();
        flags.set(StateFlags::IN_HITLAG, self.hit_freeze());
        flags.set(StateFlags::IN_HITSTUN, self.hitstun > 0);
        flags.set(StateFlags::IN_SHIELDLAG, self.shieldlag);
        for other in opponents {
            if other.hit_freeze() {
                flags |= StateFlags::OPPONENT_IN_HITLAG;
            }
            if other.hitstun > 0 {
                flags |= StateFlags::OPPONENT_IN_HITSTUN;
            }
            if other.shieldlag {
                flags |= StateFlags::OPPONENT_IN_SHIELDLAG;
            }
        }

        State::new(self.motion, self.status, self.hit_status, flags)
            .with_frame(self.frame)
            .with_position(self.position)
            .with_damage(self.damage, self.shield)
    }
}

/// A complete replay: header plus all frames
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Replay {
    pub metadata: SessionMetadata,

    /// `frames[i][slot]` is fighter `slot` on frame `i`
    pub frames: Vec<Vec<FighterFrame>>,
}

impl Replay {
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn test_flags_from_both_slots() {
        let mut attacker = FighterFrame::new(10, Motion::new(0x10), 0x22);
        attacker.hitlag = true;
        attacker.attack_connected = true;
        let mut victim = FighterFrame::new(10, Motion::new(0x20), 0x4b);
        victim.hitlag = true;
        victim.hitstun = 12;

        let a = attacker.to_state(&[&victim]);
        assert_eq!(
            a.flags,
            StateFlags::OPPONENT_IN_HITLAG | StateFlags::OPPONENT_IN_HITSTUN
        );
        assert!(a.flags.is_hit());
        assert!(!a.flags.is_damaged());
        assert_eq!(a.frame, 10);

        let v = victim.to_state(&[&attacker]);
        assert_eq!(v.flags, StateFlags::IN_HITLAG | StateFlags::IN_HITSTUN);
        assert!(v.flags.is_damaged());
    }

    #[test]
    fn test_shieldlag_flags() {
        let attacker = FighterFrame::new(0, Motion::new(0x10), 0x22);
        let mut defender = FighterFrame::new(0, Motion::new(0x30), 0x1b);
        defender.shieldlag = true;

        assert_eq!(
            attacker.to_state(&[&defender]).flags,
            StateFlags::OPPONENT_IN_SHIELDLAG
        );
        assert_eq!(defender.to_state(&[&attacker]).flags, StateFlags::IN_SHIELDLAG);
    }

    #[test]
    fn test_replay_deserialization() {
        let json = indoc! {r#"
            {
              "metadata": {
                "start_time": "2024-05-01T18:30:00Z",
                "fighters": [
                  { "fighter_id": 8, "player_tag": "TOM", "name": "pikachu" },
                  { "fighter_id": 20, "player_tag": "ANA" }
                ]
              },
              "frames": [
                [
                  { "frame": 0, "motion": 16, "status": 34, "position": { "x": 1.0, "y": 0.0 } },
                  { "frame": 0, "motion": 32, "status": 27, "shieldlag": true }
                ]
              ]
            }
        "#};

        let replay: Replay = serde_json::from_str(json).unwrap();
        assert_eq!(replay.metadata.fighters.len(), 2);
        assert_eq!(replay.metadata.fighters[1].name, "");
        assert_eq!(replay.frame_count(), 1);
        assert_eq!(replay.frames[0][0].motion, Motion::new(0x10));
        assert_eq!(replay.frames[0][0].position.x, 1.0);
        assert!(replay.frames[0][1].shieldlag);
        assert_eq!(replay.frames[0][1].hitstun, 0);
    }
}
