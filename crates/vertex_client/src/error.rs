use core::time::Duration;

use platform_structs::ParseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("operation {name} failed ({code}): {message}")]
    Operation {
        name: String,
        code: i32,
        message: String,
    },

    #[error("operation {0} is still running")]
    OperationPending(String),

    #[error("timed out after {elapsed:?} waiting for {what}")]
    Timeout { what: String, elapsed: Duration },

    #[error("unexpected response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("could not obtain an access token: {0}")]
    Auth(String),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl PlatformError {
    /// Returns true for a 404 from the platform.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }
}

pub type Result<T, E = PlatformError> = core::result::Result<T, E>;
