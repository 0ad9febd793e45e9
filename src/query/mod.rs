//! Query language - parse, compile and run patterns over state sequences
//!
//! ```text
//! nair -> utilt          two consecutive states
//! jab{2,3} -> grab       bounded repetition
//! (fair | bair):hit      union with a context qualifier
//! !shield -> . -> grab   inversion and wildcard
//! ```

pub mod ast;
pub mod compiler;
pub mod executor;
pub mod lexer;
pub mod matcher;
pub mod parser;

// Re-export key types
pub use ast::{Ast, Qualifiers};
pub use compiler::compile;
pub use executor::{
    NormalizedSequences, OverlappingMatch, find_all_overlapping, merge_motions, normalize_motions,
};
pub use matcher::{CompiledQuery, Matcher, MatcherFlags, Predicate};
pub use parser::parse;
