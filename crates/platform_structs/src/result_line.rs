use core::fmt;
use core::str::FromStr;

use crate::ParseError;

const RESULT_PREFIX: &str = "[RESULT] ";

/// A `[RESULT] KEY=value` line, the value one command hands to the next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultLine {
    pub key: String,
    pub value: String,
}

impl ResultLine {
    pub const ARTIFACT_DIR: &'static str = "ARTIFACT_DIR";
    pub const ENDPOINT_ID: &'static str = "ENDPOINT_ID";
    pub const ENDPOINT_RESOURCE: &'static str = "ENDPOINT_RESOURCE";
    pub const PREDICTIONS: &'static str = "PREDICTIONS";
    pub const PIPELINE_FILE: &'static str = "PIPELINE_FILE";
    pub const PIPELINE_JOB: &'static str = "PIPELINE_JOB";

    #[must_use]
    pub fn new(key: impl Into<String>, value: impl fmt::Display) -> Self {
        Self {
            key: key.into(),
            value: value.to_string(),
        }
    }

    /// Finds the value for `key` in a block of command output.
    #[must_use]
    pub fn find(output: &str, key: &str) -> Option<String> {
        output
            .lines()
            .filter_map(|line| line.parse::<Self>().ok())
            .find(|line| line.key == key)
            .map(|line| line.value)
    }
}

impl fmt::Display for ResultLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{RESULT_PREFIX}{}={}", self.key, self.value)
    }
}

impl FromStr for ResultLine {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ParseError::ResultLine(s.to_string());

        let body = s.trim_end().strip_prefix(RESULT_PREFIX).ok_or_else(malformed)?;
        let (key, value) = body.split_once('=').ok_or_else(malformed)?;
        if key.is_empty() {
            return Err(malformed());
        }

        Ok(Self::new(key, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render() {
        let line = ResultLine::new(ResultLine::ENDPOINT_ID, 1234);
        assert_eq!(line.to_string(), "[RESULT] ENDPOINT_ID=1234");
    }

    #[test]
    fn test_parse_keeps_equals_in_value() {
        let line: ResultLine = "[RESULT] PREDICTIONS=[\"a=b\"]".parse().unwrap();
        assert_eq!(line.key, "PREDICTIONS");
        assert_eq!(line.value, "[\"a=b\"]");
    }

    #[test]
    fn test_parse_rejects_other_lines() {
        assert!("[INFO] hello".parse::<ResultLine>().is_err());
        assert!("[RESULT] no-separator".parse::<ResultLine>().is_err());
    }

    #[test]
    fn test_find_in_output() {
        let output = "[INFO] Uploading\n[RESULT] ARTIFACT_DIR=gs://b/models/m/\n";
        assert_eq!(
            ResultLine::find(output, ResultLine::ARTIFACT_DIR).as_deref(),
            Some("gs://b/models/m/")
        );
        assert_eq!(ResultLine::find(output, ResultLine::ENDPOINT_ID), None);
    }
}
