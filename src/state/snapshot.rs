//! State representation

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

pub type FighterId = u16;
pub type Status = u16;
pub type HitStatus = u8;

static HEX_MOTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0[xX]([0-9a-fA-F]{1,10})$").expect("valid motion regex"));

/// Game-internal 40-bit animation identifier ("hash40")
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "u64", into = "u64")]
pub struct Motion(u64);

impl Motion {
    pub const MASK: u64 = 0xff_ffff_ffff;

    pub fn new(value: u64) -> Self {
        Self(value & Self::MASK)
    }

    pub fn value(self) -> u64 {
        self.0
    }

    /// Parse the `0x` + hex form produced by `Display`.
    pub fn parse_hex(text: &str) -> Option<Self> {
        let caps = HEX_MOTION.captures(text.trim())?;
        u64::from_str_radix(&caps[1], 16).ok().map(Self::new)
    }
}

impl From<u64> for Motion {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl From<Motion> for u64 {
    fn from(motion: Motion) -> Self {
        motion.0
    }
}

impl fmt::Display for Motion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{:010x}", self.0)
    }
}

bitflags::bitflags! {
    /// Interaction flags for a fighter and its opponent
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct StateFlags: u8 {
        const IN_HITLAG             = 0b0000_0001;
        const IN_HITSTUN            = 0b0000_0010;
        const IN_SHIELDLAG          = 0b0000_0100;
        const OPPONENT_IN_HITLAG    = 0b0000_1000;
        const OPPONENT_IN_HITSTUN   = 0b0001_0000;
        const OPPONENT_IN_SHIELDLAG = 0b0010_0000;
    }
}

impl StateFlags {
    const SELF_HIT: StateFlags = StateFlags::IN_HITLAG.union(StateFlags::IN_HITSTUN);
    const OPPONENT_HIT: StateFlags =
        StateFlags::OPPONENT_IN_HITLAG.union(StateFlags::OPPONENT_IN_HITSTUN);

    pub fn in_hitlag(self) -> bool {
        self.contains(Self::IN_HITLAG)
    }

    pub fn in_hitstun(self) -> bool {
        self.contains(Self::IN_HITSTUN)
    }

    pub fn in_shieldlag(self) -> bool {
        self.contains(Self::IN_SHIELDLAG)
    }

    pub fn opponent_in_hitlag(self) -> bool {
        self.contains(Self::OPPONENT_IN_HITLAG)
    }

    pub fn opponent_in_hitstun(self) -> bool {
        self.contains(Self::OPPONENT_IN_HITSTUN)
    }

    pub fn opponent_in_shieldlag(self) -> bool {
        self.contains(Self::OPPONENT_IN_SHIELDLAG)
    }

    /// The fighter landed a hit on the opponent
    pub fn is_hit(self) -> bool {
        self.intersects(Self::OPPONENT_HIT)
    }

    /// The fighter was hit
    pub fn is_damaged(self) -> bool {
        self.intersects(Self::SELF_HIT)
    }

    /// Hitlag and hitstun are folded into one "hit" marker for self and
    /// opponent so that instances differing only in hit timing compare equal.
    pub fn normalized(self) -> Self {
        let mut flags = self;
        if self.intersects(Self::SELF_HIT) {
            flags |= Self::SELF_HIT;
        }
        if self.intersects(Self::OPPONENT_HIT) {
            flags |= Self::OPPONENT_HIT;
        }
        flags
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// One meaningfully distinct fighter snapshot.
///
/// Equality and hashing only look at `motion`, `status`, `hit_status` and
/// `flags`. The remaining fields describe the first frame the state was seen
/// on and are carried along for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct State {
    pub frame: u32,
    pub position: Position,
    pub damage: f32,
    pub shield: f32,
    pub motion: Motion,
    pub status: Status,
    pub hit_status: HitStatus,
    pub flags: StateFlags,
}

impl State {
    pub fn new(motion: Motion, status: Status, hit_status: HitStatus, flags: StateFlags) -> Self {
        Self {
            frame: 0,
            position: Position::default(),
            damage: 0.0,
            shield: 0.0,
            motion,
            status,
            hit_status,
            flags,
        }
    }

    pub fn with_frame(mut self, frame: u32) -> Self {
        self.frame = frame;
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    pub fn with_damage(mut self, damage: f32, shield: f32) -> Self {
        self.damage = damage;
        self.shield = shield;
        self
    }

    /// Same action as `other`, ignoring interaction flags
    pub fn same_action(&self, other: &State) -> bool {
        self.motion == other.motion
            && self.status == other.status
            && self.hit_status == other.hit_status
    }

    /// Copy with normalized flags and the given motion
    pub fn normalized(&self, motion: Motion) -> State {
        State {
            motion,
            flags: self.flags.normalized(),
            ..self.clone()
        }
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.same_action(other) && self.flags == other.flags
    }
}

impl Eq for State {}

impl Hash for State {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.motion.hash(state);
        self.status.hash(state);
        self.hit_status.hash(state);
        self.flags.hash(state);
    }
}
