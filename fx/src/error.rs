//! Rate store error types.

use std::path::PathBuf;

use exchange_common::ParseError;
use thiserror::Error;

use crate::cache::CacheError;

/// Errors that can occur while refreshing rates or converting amounts.
#[derive(Debug, Error)]
pub enum FxError {
    /// Client construction or directory resolution failed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The request could not be sent or the response body not read.
    #[error("Sending request: {0}")]
    Request(#[source] reqwest::Error),

    /// The API answered with something other than 200 OK.
    #[error("Unexpected status code: {0}")]
    UnexpectedStatus(u16),

    /// The caller gave up on the operation.
    #[error("Request cancelled")]
    Cancelled,

    /// The response body is not a rate table.
    #[error("Decoding response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A rate in the table is not a decimal number.
    #[error("Parsing rate for {currency}: {source}")]
    InvalidRate {
        currency: String,
        #[source]
        source: ParseError,
    },

    /// Fetched rates could not be written to the cache file.
    #[error("Caching data to {}: {source}", path.display())]
    CacheSave {
        path: PathBuf,
        #[source]
        source: CacheError,
    },

    /// The rate table has no entry for the requested currency.
    #[error("No exchange rate for {currency} from {base_currency}")]
    NoExchangeRate {
        base_currency: String,
        currency: String,
    },

    /// Converting a quantity of zero would divide by zero.
    #[error("Quantity must not be zero")]
    ZeroQuantity,

    /// A user supplied decimal could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl FxError {
    /// Check if retrying the refresh later might succeed.
    ///
    /// The store never retries on its own; this is for callers that do.
    pub fn is_retryable(&self) -> bool {
        match self {
            FxError::Request(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            FxError::UnexpectedStatus(code) => *code == 429 || (500..600).contains(code),
            _ => false,
        }
    }

    /// Check if this error came from talking to the rates API.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            FxError::Request(_) | FxError::UnexpectedStatus(_) | FxError::Cancelled
        )
    }
}

/// Result type for rate store operations.
pub type FxResult<T> = Result<T, FxError>;
