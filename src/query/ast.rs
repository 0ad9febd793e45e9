//! Query syntax tree.
//!
//! The tree owns its children, so dropping the root releases everything.
//! `Display` prints the canonical form of a query, which parses back to an
//! equal tree.

use serde::{Deserialize, Serialize};
use std::fmt;

bitflags::bitflags! {
    /// Context a matched state must be in
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Qualifiers: u16 {
        const HIT                   = 1 << 0;
        const WHIFF                 = 1 << 1;
        const ON_SHIELD             = 1 << 2;
        const OUT_OF_SHIELD         = 1 << 3;
        const DAMAGED               = 1 << 4;
        const RISING                = 1 << 5;
        const FALLING               = 1 << 6;
        const FULL_HOP              = 1 << 7;
        const SHORT_HOP             = 1 << 8;
        const DOUBLE_JUMP           = 1 << 9;
        const IMMEDIATE_DOUBLE_JUMP = 1 << 10;
    }
}

const KEYWORDS: &[(&str, Qualifiers)] = &[
    ("hit", Qualifiers::HIT),
    ("whiff", Qualifiers::WHIFF),
    ("os", Qualifiers::ON_SHIELD),
    ("oos", Qualifiers::OUT_OF_SHIELD),
    ("dmg", Qualifiers::DAMAGED),
    ("rising", Qualifiers::RISING),
    ("falling", Qualifiers::FALLING),
    ("fh", Qualifiers::FULL_HOP),
    ("sh", Qualifiers::SHORT_HOP),
    ("dj", Qualifiers::DOUBLE_JUMP),
    ("idj", Qualifiers::IMMEDIATE_DOUBLE_JUMP),
];

impl Qualifiers {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        KEYWORDS
            .iter()
            .find(|(kw, _)| kw.eq_ignore_ascii_case(keyword))
            .map(|&(_, q)| q)
    }

    /// Keywords of every set bit, in bit order
    pub fn keywords(self) -> impl Iterator<Item = &'static str> {
        KEYWORDS
            .iter()
            .filter(move |(_, q)| self.contains(*q))
            .map(|&(kw, _)| kw)
    }
}

/// Upper bound for repetition counts and wildcard runs
pub const MAX_REPEAT: u32 = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ast {
    /// `a -> b -> c`, always at least two items
    Sequence(Vec<Ast>),
    /// `a{min,max}`, `max == None` is unbounded
    Repetition {
        body: Box<Ast>,
        min: u32,
        max: Option<u32>,
    },
    /// `a | b`, always at least two items
    Union(Vec<Ast>),
    /// `!a`
    Inversion(Box<Ast>),
    /// `.` or `.N`
    Wildcard(u32),
    Label(String),
    /// `a:hit:os`
    Qualifier {
        body: Box<Ast>,
        qualifiers: Qualifiers,
    },
}

impl Ast {
    pub fn label(text: impl Into<String>) -> Self {
        Ast::Label(text.into())
    }

    /// Binding strength used by the printer to decide on parentheses
    fn precedence(&self) -> u8 {
        match self {
            Ast::Sequence(_) => 0,
            Ast::Union(_) => 1,
            Ast::Repetition { .. } | Ast::Qualifier { .. } => 2,
            Ast::Inversion(_) => 3,
            Ast::Wildcard(_) | Ast::Label(_) => 4,
        }
    }

    /// Number of leaf labels, counting repeats once
    pub fn label_count(&self) -> usize {
        match self {
            Ast::Sequence(items) | Ast::Union(items) => items.iter().map(Ast::label_count).sum(),
            Ast::Repetition { body, .. }
            | Ast::Inversion(body)
            | Ast::Qualifier { body, .. } => body.label_count(),
            Ast::Wildcard(_) => 0,
            Ast::Label(_) => 1,
        }
    }

    fn fmt_child(&self, f: &mut fmt::Formatter, min_precedence: u8) -> fmt::Result {
        if self.precedence() < min_precedence {
            write!(f, "({})", self)
        } else {
            write!(f, "{}", self)
        }
    }
}

fn is_plain_label(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        Some('0') => {
            text.len() > 2
                && (text.starts_with("0x") || text.starts_with("0X"))
                && text[2..].chars().all(|c| c.is_ascii_hexdigit())
        }
        _ => false,
    }
}

impl fmt::Display for Ast {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Ast::Sequence(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" -> ")?;
                    }
                    item.fmt_child(f, 1)?;
                }
                Ok(())
            }
            Ast::Union(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    item.fmt_child(f, 2)?;
                }
                Ok(())
            }
            Ast::Repetition { body, min, max } => {
                body.fmt_child(f, 2)?;
                match (min, max) {
                    (1, None) => f.write_str("+"),
                    (0, Some(1)) => f.write_str("?"),
                    (min, None) => write!(f, "{{{},}}", min),
                    (min, Some(max)) if min == max => write!(f, "{{{}}}", min),
                    (min, Some(max)) => write!(f, "{{{},{}}}", min, max),
                }
            }
            Ast::Inversion(body) => {
                f.write_str("!")?;
                body.fmt_child(f, 3)
            }
            Ast::Wildcard(1) => f.write_str("."),
            Ast::Wildcard(n) => write!(f, ".{}", n),
            Ast::Label(text) if is_plain_label(text) => f.write_str(text),
            Ast::Label(text) => write!(f, "\"{}\"", text),
            Ast::Qualifier { body, qualifiers } => {
                body.fmt_child(f, 2)?;
                for keyword in qualifiers.keywords() {
                    write!(f, ":{}", keyword)?;
                }
                Ok(())
            }
        }
    }
}
