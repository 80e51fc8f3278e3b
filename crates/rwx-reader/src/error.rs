//! Error types for RWX reading.

use std::fmt;
use thiserror::Error;

/// Which recursion guard was tripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    /// Nested proto replays.
    Proto,
    /// Nested groups.
    Group,
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitKind::Proto => f.write_str("proto replay"),
            LimitKind::Group => f.write_str("group nesting"),
        }
    }
}

/// Errors that can occur while reading an RWX model.
///
/// Line numbers are 0-based.
#[derive(Error, Debug)]
pub enum ReadError {
    /// I/O error reading the stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Reader settings failed validation.
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    /// The stream could not be decoded as text.
    #[error("Lexer error at line {line}: {message}")]
    Lex {
        /// Line number.
        line: usize,
        /// Error message.
        message: String,
    },

    /// A token that should be a number is not one.
    #[error("Invalid number '{word}' at line {line}")]
    NumericFormat {
        /// Line number.
        line: usize,
        /// Offending word.
        word: String,
    },

    /// `protoinstance` named a proto that was never defined.
    #[error("Unknown proto '{name}' at line {line}")]
    UnknownProto {
        /// Line number.
        line: usize,
        /// Requested proto name.
        name: String,
    },

    /// Proto replay or group nesting went past its configured bound.
    #[error("{kind} deeper than {limit} at line {line}")]
    RecursionLimitExceeded {
        /// Line number.
        line: usize,
        /// Which guard tripped.
        kind: LimitKind,
        /// Configured bound.
        limit: usize,
    },

    /// The stream ended before a required end keyword.
    #[error("Unexpected end of input, expected {expected}")]
    UnexpectedEndOfInput {
        /// What the parser was waiting for.
        expected: String,
    },

    /// A word that is not valid in the current block.
    #[error("Unexpected '{word}' at line {line}: {text}")]
    UnexpectedToken {
        /// Line number.
        line: usize,
        /// Offending word.
        word: String,
        /// Full text of the offending line.
        text: String,
    },
}

impl ReadError {
    /// Create a lexer error.
    pub fn lex(line: usize, message: impl Into<String>) -> Self {
        Self::Lex {
            line,
            message: message.into(),
        }
    }

    /// Create an end-of-input error.
    pub fn end_of_input(expected: impl Into<String>) -> Self {
        Self::UnexpectedEndOfInput {
            expected: expected.into(),
        }
    }

    /// Line number the error points at, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            ReadError::Lex { line, .. }
            | ReadError::NumericFormat { line, .. }
            | ReadError::UnknownProto { line, .. }
            | ReadError::RecursionLimitExceeded { line, .. }
            | ReadError::UnexpectedToken { line, .. } => Some(*line),
            ReadError::Io(_)
            | ReadError::InvalidSettings(_)
            | ReadError::UnexpectedEndOfInput { .. } => None,
        }
    }
}

/// Result type for reader operations.
pub type Result<T> = std::result::Result<T, ReadError>;
