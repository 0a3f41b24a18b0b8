//! HTTP client for the Vertex AI v1 REST API.

use core::time::Duration;

use async_trait::async_trait;
use backon::{ConstantBuilder, Retryable};
use config::PlatformConfig;
use platform_structs::{ResourceName, TrafficSplit};
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, info};

use super::models::{
    CustomJob, DeployModelRequest, DeployModelResponse, DeployedModel, Endpoint, ErrorResponse,
    Model, Operation, PipelineJob, PredictRequest, PredictResponse, UndeployModelRequest,
    UploadModelRequest, UploadModelResponse,
};
use crate::{AccessToken, PlatformApi, PlatformError, Result};

/// Client bound to one project and region.
pub struct VertexClient {
    client: Client,
    base_url: String,
    location_path: String,
    token: AccessToken,
    poll_interval: Duration,
    operation_timeout: Duration,
}

impl VertexClient {
    /// Creates a client using the request timeout from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: &PlatformConfig, token: AccessToken) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url(),
            location_path: config.location_path(),
            token,
            poll_interval: config.poll_interval,
            operation_timeout: config.operation_timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn collection_url(&self, collection: &str) -> String {
        self.url(&format!("{}/{collection}", self.location_path))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request
            .header("Authorization", self.token.bearer())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(PlatformError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response.bytes().await?;
        let body: &[u8] = if bytes.is_empty() { b"{}" } else { &bytes[..] };
        Ok(serde_json::from_slice(body)?)
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.send(self.client.get(url)).await
    }

    async fn post<B: Serialize + Sync, T: DeserializeOwned>(&self, url: &str, body: &B) -> Result<T> {
        self.send(self.client.post(url).json(body)).await
    }

    async fn delete<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.send(self.client.delete(url)).await
    }

    /// Polls an operation until it is done and returns its response payload.
    ///
    /// Gives up once `operation_timeout` has elapsed since the first poll.
    async fn wait_for_operation(&self, operation: Operation) -> Result<Value> {
        if operation.done {
            return operation_result(operation);
        }

        let name = operation.name.as_str();
        let url = self.url(name);
        let url = url.as_str();
        info!(operation = name, "Waiting for operation");

        let started = Instant::now();
        let timeout = self.operation_timeout;
        let finished = (|| async move {
            let current: Operation = self.get(url).await?;
            if current.done {
                Ok(current)
            } else {
                Err(PlatformError::OperationPending(current.name))
            }
        })
        .retry(
            ConstantBuilder::default()
                .with_delay(self.poll_interval)
                .without_max_times(),
        )
        .when(|e| matches!(e, PlatformError::OperationPending(_)) && started.elapsed() < timeout)
        .notify(|_, delay| debug!(operation = name, ?delay, "Operation still running"))
        .await
        .map_err(|e| match e {
            PlatformError::OperationPending(what) => PlatformError::Timeout {
                what,
                elapsed: started.elapsed(),
            },
            other => other,
        })?;

        operation_result(finished)
    }

    async fn run_operation<T: DeserializeOwned>(&self, operation: Operation) -> Result<T> {
        let response = self.wait_for_operation(operation).await?;
        Ok(serde_json::from_value(response)?)
    }
}

/// Extracts the response payload of a finished operation.
fn operation_result(operation: Operation) -> Result<Value> {
    if let Some(status) = operation.error {
        return Err(PlatformError::Operation {
            name: operation.name,
            code: status.code,
            message: status.message,
        });
    }

    Ok(operation.response.unwrap_or_else(|| Value::Object(serde_json::Map::new())))
}

#[async_trait]
impl PlatformApi for VertexClient {
    async fn create_custom_job(&self, job: &CustomJob) -> Result<CustomJob> {
        info!(display_name = %job.display_name, "Creating custom job");
        self.post(&self.collection_url("customJobs"), job).await
    }

    async fn get_custom_job(&self, name: &str) -> Result<CustomJob> {
        self.get(&self.url(name)).await
    }

    async fn upload_model(&self, model: &Model) -> Result<ResourceName> {
        info!(
            display_name = %model.display_name,
            artifact_uri = %model.artifact_uri,
            "Uploading model"
        );
        let request = UploadModelRequest {
            model: model.clone(),
        };
        let operation: Operation = self
            .post(&self.collection_url("models:upload"), &request)
            .await?;
        let response: UploadModelResponse = self.run_operation(operation).await?;

        Ok(response.model.parse()?)
    }

    async fn create_endpoint(&self, display_name: &str) -> Result<Endpoint> {
        info!(display_name, "Creating endpoint");
        let body = Endpoint {
            display_name: display_name.to_string(),
            ..Endpoint::default()
        };
        let operation: Operation = self.post(&self.collection_url("endpoints"), &body).await?;
        self.run_operation(operation).await
    }

    async fn deploy_model(
        &self,
        endpoint: &ResourceName,
        deployed_model: &DeployedModel,
        traffic_split: &TrafficSplit,
    ) -> Result<DeployedModel> {
        info!(endpoint = %endpoint, model = %deployed_model.model, "Deploying model");
        let request = DeployModelRequest {
            deployed_model: deployed_model.clone(),
            traffic_split: traffic_split.clone(),
        };
        let operation: Operation = self
            .post(&self.url(&format!("{endpoint}:deployModel")), &request)
            .await?;
        let response: DeployModelResponse = self.run_operation(operation).await?;

        Ok(response.deployed_model)
    }

    async fn get_endpoint(&self, endpoint: &ResourceName) -> Result<Endpoint> {
        self.get(&self.url(&endpoint.to_string())).await
    }

    async fn undeploy_model(
        &self,
        endpoint: &ResourceName,
        deployed_model_id: &str,
        traffic_split: &TrafficSplit,
    ) -> Result<()> {
        info!(endpoint = %endpoint, deployed_model_id, "Undeploying model");
        let request = UndeployModelRequest {
            deployed_model_id: deployed_model_id.to_string(),
            traffic_split: traffic_split.clone(),
        };
        let operation: Operation = self
            .post(&self.url(&format!("{endpoint}:undeployModel")), &request)
            .await?;
        self.wait_for_operation(operation).await?;

        Ok(())
    }

    async fn delete_endpoint(&self, endpoint: &ResourceName) -> Result<()> {
        info!(endpoint = %endpoint, "Deleting endpoint");
        let operation: Operation = self.delete(&self.url(&endpoint.to_string())).await?;
        self.wait_for_operation(operation).await?;

        Ok(())
    }

    async fn delete_model(&self, model: &ResourceName) -> Result<()> {
        info!(model = %model, "Deleting model");
        let operation: Operation = self.delete(&self.url(&model.to_string())).await?;
        self.wait_for_operation(operation).await?;

        Ok(())
    }

    async fn predict(
        &self,
        endpoint: &ResourceName,
        instances: Vec<Value>,
    ) -> Result<PredictResponse> {
        info!(endpoint = %endpoint, instances = instances.len(), "Predicting");
        let request = PredictRequest {
            instances,
            parameters: None,
        };
        self.post(&self.url(&format!("{endpoint}:predict")), &request)
            .await
    }

    async fn create_pipeline_job(&self, job: &PipelineJob, job_id: &str) -> Result<PipelineJob> {
        info!(display_name = %job.display_name, job_id, "Creating pipeline job");
        let url = format!(
            "{}?pipelineJobId={job_id}",
            self.collection_url("pipelineJobs")
        );
        self.post(&url, job).await
    }
}
