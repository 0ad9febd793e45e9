//! This module defines all error types used throughout the crate.

use std::io;
use std::ops::Range;
use thiserror::Error;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    /// IO errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Malformed query text
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Query could not be bound to a fighter's labels
    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),

    /// Missing or inconsistent replay data
    #[error("{0}")]
    Data(String),

    /// Label dictionary loading errors
    #[error("Label dictionary error: {0}")]
    Labels(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with custom message
    #[error("{0}")]
    Custom(String),

    /// Wrapped anyhow errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a custom error with a message
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    /// Create a data error
    pub fn data(msg: impl Into<String>) -> Self {
        Self::Data(msg.into())
    }

    /// Create a label dictionary error
    pub fn labels(msg: impl Into<String>) -> Self {
        Self::Labels(msg.into())
    }

    /// Error reported when an operation needs frames that were never loaded
    pub fn no_replay_data() -> Self {
        Self::Data("No replay data loaded".to_string())
    }
}

/// Query text could not be parsed.
///
/// `span` is a byte range into the query string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} at {}..{}", span.start, span.end)]
pub struct ParseError {
    pub message: String,
    pub span: Range<usize>,
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: Range<usize>) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

/// A parsed query could not be turned into an automaton.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("unknown label \"{0}\"")]
    UnknownLabel(String),

    #[error("inversion can only be applied to a single state")]
    InvertedSequence,

    #[error("qualifiers cannot appear inside an inversion")]
    InvertedQualifier,

    #[error("an inverted wildcard never matches")]
    InvertedWildcard,

    #[error("query expands to {0} matchers, which exceeds the limit")]
    TooManyMatchers(usize),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

// Helper macros for creating errors

/// Create a custom error with formatting
#[macro_export]
macro_rules! custom_error {
    ($($arg:tt)*) => {
        $crate::error::Error::Custom(format!($($arg)*))
    };
}

/// Bail with a custom error message
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::custom_error!($($arg)*))
    };
}

/// Ensure a condition is true or return error
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $($arg:tt)*) => {
        if !($cond) {
            $crate::bail!($($arg)*);
        }
    };
}
