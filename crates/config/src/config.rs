use core::time::Duration;
use std::sync::Arc;

use anyhow::{Context, Result};
use object_store::ObjectStore;
use object_store::gcp::GoogleCloudStorageBuilder;

/// Default region used when none is configured.
pub const DEFAULT_REGION: &str = "us-central1";

/// Default timeout for a single HTTP request to the platform.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Default interval between two polls of a job or long-running operation.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Default upper bound for a long-running operation (upload, deploy, delete).
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Default upper bound for a training job to reach a terminal state.
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(2 * 60 * 60);

/// Loads a `.env` file from the working directory, if there is one.
///
/// Must run before the CLI is parsed so that `env = ...` flags see the values.
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// Connection settings for the managed ML platform.
///
/// One value is built per process and passed explicitly to every operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformConfig {
    /// Cloud project identifier
    pub project_id: String,

    /// Platform region, e.g. `us-central1`
    pub region: String,

    /// Bucket used by the platform for staging job files (`gs://...`)
    pub staging_bucket: Option<String>,

    /// Explicit API base URL; derived from the region when absent
    pub api_endpoint: Option<String>,

    /// Timeout applied to every HTTP request
    pub request_timeout: Duration,

    /// Delay between two status polls
    pub poll_interval: Duration,

    /// Upper bound for long-running operations
    pub operation_timeout: Duration,

    /// Upper bound for training jobs
    pub job_timeout: Duration,
}

impl PlatformConfig {
    /// Creates a configuration with default timeouts.
    #[must_use]
    pub fn new(project_id: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            region: region.into(),
            staging_bucket: None,
            api_endpoint: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
            job_timeout: DEFAULT_JOB_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_staging_bucket(mut self, staging_bucket: Option<String>) -> Self {
        self.staging_bucket = staging_bucket;
        self
    }

    #[must_use]
    pub fn with_api_endpoint(mut self, api_endpoint: Option<String>) -> Self {
        self.api_endpoint = api_endpoint;
        self
    }

    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    #[must_use]
    pub const fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = timeout;
        self
    }

    /// Returns the REST base URL, e.g. `https://us-central1-aiplatform.googleapis.com/v1`.
    #[must_use]
    pub fn base_url(&self) -> String {
        self.api_endpoint.as_ref().map_or_else(
            || format!("https://{}-aiplatform.googleapis.com/v1", self.region),
            |endpoint| endpoint.trim_end_matches('/').to_string(),
        )
    }

    /// Returns the `projects/{project}/locations/{region}` parent of every resource.
    #[must_use]
    pub fn location_path(&self) -> String {
        format!("projects/{}/locations/{}", self.project_id, self.region)
    }

    /// Returns the default image of this workspace in the project's Artifact Registry.
    #[must_use]
    pub fn default_image_uri(&self) -> String {
        format!(
            "{}-docker.pkg.dev/{}/sentiment-ops/sentiment-ops:latest",
            self.region, self.project_id
        )
    }
}

/// Builds an object store for a Cloud Storage bucket.
///
/// Credentials are taken from the ambient Google environment
/// (`GOOGLE_APPLICATION_CREDENTIALS`, `GOOGLE_SERVICE_ACCOUNT`, metadata server).
///
/// # Errors
///
/// Returns an error if the store cannot be configured.
pub fn object_store_for_bucket(bucket: &str) -> Result<Arc<dyn ObjectStore>> {
    let store = GoogleCloudStorageBuilder::from_env()
        .with_bucket_name(bucket)
        .build()
        .with_context(|| format!("Failed to create object store for bucket {bucket}"))?;

    Ok(Arc::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_derived_from_region() {
        let config = PlatformConfig::new("demo", "europe-west4");
        assert_eq!(
            config.base_url(),
            "https://europe-west4-aiplatform.googleapis.com/v1"
        );
    }

    #[test]
    fn test_base_url_override_trims_slash() {
        let config = PlatformConfig::new("demo", DEFAULT_REGION)
            .with_api_endpoint(Some("http://localhost:9000/v1/".to_string()));
        assert_eq!(config.base_url(), "http://localhost:9000/v1");
    }

    #[test]
    fn test_location_path() {
        let config = PlatformConfig::new("sentiment-demo", DEFAULT_REGION);
        assert_eq!(
            config.location_path(),
            "projects/sentiment-demo/locations/us-central1"
        );
    }

    #[test]
    fn test_default_image_uri() {
        let config = PlatformConfig::new("sentiment-demo", DEFAULT_REGION);
        assert_eq!(
            config.default_image_uri(),
            "us-central1-docker.pkg.dev/sentiment-demo/sentiment-ops/sentiment-ops:latest"
        );
    }

    #[test]
    fn test_builder_overrides_timeouts() {
        let config = PlatformConfig::new("p", "r")
            .with_poll_interval(Duration::from_secs(1))
            .with_job_timeout(Duration::from_secs(5));
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.job_timeout, Duration::from_secs(5));
        assert_eq!(config.operation_timeout, DEFAULT_OPERATION_TIMEOUT);
    }
}
