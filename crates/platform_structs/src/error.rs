use thiserror::Error;

/// Errors raised when a locally supplied identifier is malformed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("storage URI must start with gs://: {0}")]
    MissingScheme(String),

    #[error("storage URI has no bucket: {0}")]
    MissingBucket(String),

    #[error("malformed resource name: {0}")]
    ResourceName(String),

    #[error("malformed result line: {0}")]
    ResultLine(String),

    #[error("traffic split must sum to 100, got {0}")]
    TrafficSum(u32),
}
