use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("CSV must have columns: text,label (missing: {})", .0.join(","))]
    MissingColumns(Vec<&'static str>),

    #[error("failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("dataset has no rows")]
    EmptyDataset,

    #[error("row {row} has an empty label")]
    EmptyLabel { row: usize },

    #[error("invalid model artifact: {0}")]
    Artifact(#[from] serde_json::Error),

    #[error("unsupported model artifact format {found}, expected {expected}")]
    UnsupportedFormat { found: u32, expected: u32 },
}

pub type Result<T, E = ClassifierError> = core::result::Result<T, E>;
