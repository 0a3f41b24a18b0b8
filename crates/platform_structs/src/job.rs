use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{GcsUri, ResourceName};

/// Run state of a platform job, as reported by the API.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    JobStateQueued,
    JobStatePending,
    JobStateRunning,
    JobStateSucceeded,
    JobStateFailed,
    JobStateCancelling,
    JobStateCancelled,
    JobStatePaused,
    JobStateExpired,
    JobStateUpdating,
    JobStatePartiallySucceeded,

    /// Also covers states this client does not know yet
    #[default]
    #[serde(other)]
    JobStateUnspecified,
}

impl JobState {
    /// Returns true once the job will not change state anymore.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::JobStateSucceeded
                | Self::JobStateFailed
                | Self::JobStateCancelled
                | Self::JobStateExpired
                | Self::JobStatePartiallySucceeded
        )
    }

    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::JobStateSucceeded)
    }
}

/// Outcome of a training job submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingJobRecord {
    pub display_name: String,
    pub resource_name: ResourceName,
    pub state: JobState,
    pub create_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,

    /// Directory the job wrote the model artifact to
    pub artifact_dir: GcsUri,
}

#[cfg(test)]
mod tests {
    use core::str::FromStr;

    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(JobState::JobStateSucceeded.is_terminal());
        assert!(JobState::JobStateFailed.is_terminal());
        assert!(JobState::JobStateCancelled.is_terminal());
        assert!(!JobState::JobStateRunning.is_terminal());
        assert!(!JobState::JobStateQueued.is_terminal());
        assert!(!JobState::JobStateCancelling.is_terminal());
    }

    #[test]
    fn test_only_succeeded_is_success() {
        assert!(JobState::JobStateSucceeded.is_success());
        assert!(!JobState::JobStatePartiallySucceeded.is_success());
    }

    #[test]
    fn test_wire_format() {
        let state: JobState = serde_json::from_str("\"JOB_STATE_RUNNING\"").unwrap();
        assert_eq!(state, JobState::JobStateRunning);
        assert_eq!(state.to_string(), "JOB_STATE_RUNNING");
        assert_eq!(
            JobState::from_str("JOB_STATE_FAILED").unwrap(),
            JobState::JobStateFailed
        );
    }

    #[test]
    fn test_unknown_state_is_unspecified() {
        let state: JobState = serde_json::from_str("\"JOB_STATE_SOMETHING_NEW\"").unwrap();
        assert_eq!(state, JobState::JobStateUnspecified);
        assert!(!state.is_terminal());
    }
}
