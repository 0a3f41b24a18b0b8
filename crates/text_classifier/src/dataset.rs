//! Labelled text dataset loaded from CSV.

use std::io::Read;

use tracing::debug;

use crate::{ClassifierError, Result};

/// Column holding the input text.
pub const TEXT_COLUMN: &str = "text";

/// Column holding the class label.
pub const LABEL_COLUMN: &str = "label";

/// Texts and their labels, index-aligned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    pub texts: Vec<String>,
    pub labels: Vec<String>,
}

impl Dataset {
    /// Reads a CSV with a header row containing `text` and `label`.
    ///
    /// Other columns are ignored. The header is checked before any row is read.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = csv.headers()?.clone();
        let position = |name: &str| headers.iter().position(|h| h.trim() == name);

        let (text_idx, label_idx) = match (position(TEXT_COLUMN), position(LABEL_COLUMN)) {
            (Some(text), Some(label)) => (text, label),
            (text, label) => {
                let mut missing = Vec::new();
                if text.is_none() {
                    missing.push(TEXT_COLUMN);
                }
                if label.is_none() {
                    missing.push(LABEL_COLUMN);
                }
                return Err(ClassifierError::MissingColumns(missing));
            }
        };

        let mut dataset = Self::default();
        for (row, record) in csv.records().enumerate() {
            let record = record?;
            let label = record.get(label_idx).map(str::trim).unwrap_or_default();
            if label.is_empty() {
                return Err(ClassifierError::EmptyLabel { row: row + 1 });
            }

            dataset
                .texts
                .push(record.get(text_idx).unwrap_or_default().to_string());
            dataset.labels.push(label.to_string());
        }

        if dataset.is_empty() {
            return Err(ClassifierError::EmptyDataset);
        }

        debug!(rows = dataset.len(), "Loaded dataset");

        Ok(dataset)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.texts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }
}
