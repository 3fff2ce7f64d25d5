//! Error types shared across the exchange workspace.

use thiserror::Error;

/// Errors produced while parsing a decimal string into an exact rational.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Nothing left to parse after trimming.
    #[error("Empty decimal string")]
    Empty,

    /// The digits around the decimal point do not form an integer.
    #[error("Invalid decimal number: {0:?}")]
    InvalidNumber(String),
}

/// Result type for parsing operations.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
