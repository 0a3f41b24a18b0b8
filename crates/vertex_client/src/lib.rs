//! Client for the Vertex AI REST API.
//!
//! Every call is a plain awaited request; long-running operations are polled
//! until done within the configured timeout. Mutating calls are never retried.

pub mod api;
mod auth;
mod error;

use async_trait::async_trait;
use platform_structs::{ResourceName, TrafficSplit};
use serde_json::Value;

pub use api::client::VertexClient;
pub use api::models::*;
pub use auth::AccessToken;
pub use error::{PlatformError, Result};

/// The platform operations the commands are written against.
///
/// Calls that start a long-running operation return once it has finished.
#[async_trait]
pub trait PlatformApi: Send + Sync {
    /// Submits a custom training job and returns it as created.
    async fn create_custom_job(&self, job: &CustomJob) -> Result<CustomJob>;

    /// Fetches the current state of a custom job by resource name.
    async fn get_custom_job(&self, name: &str) -> Result<CustomJob>;

    /// Registers a model and returns its resource name.
    async fn upload_model(&self, model: &Model) -> Result<ResourceName>;

    /// Creates an empty endpoint.
    async fn create_endpoint(&self, display_name: &str) -> Result<Endpoint>;

    /// Attaches a model to an endpoint and returns the deployment.
    async fn deploy_model(
        &self,
        endpoint: &ResourceName,
        deployed_model: &DeployedModel,
        traffic_split: &TrafficSplit,
    ) -> Result<DeployedModel>;

    async fn get_endpoint(&self, endpoint: &ResourceName) -> Result<Endpoint>;

    /// Detaches a deployment; `traffic_split` is the split of what remains.
    async fn undeploy_model(
        &self,
        endpoint: &ResourceName,
        deployed_model_id: &str,
        traffic_split: &TrafficSplit,
    ) -> Result<()>;

    async fn delete_endpoint(&self, endpoint: &ResourceName) -> Result<()>;

    async fn delete_model(&self, model: &ResourceName) -> Result<()>;

    /// Runs one synchronous online prediction.
    async fn predict(&self, endpoint: &ResourceName, instances: Vec<Value>)
    -> Result<PredictResponse>;

    /// Submits a compiled pipeline to the managed pipeline runner.
    async fn create_pipeline_job(&self, job: &PipelineJob, job_id: &str) -> Result<PipelineJob>;
}
