//! REST payload types for the Vertex AI v1 API.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use platform_structs::{DeployedModelRecord, JobState, TrafficSplit};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A long-running operation, returned by every mutating call.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Operation resource name
    pub name: String,

    /// Whether the operation has finished
    #[serde(default)]
    pub done: bool,

    /// Set when the operation finished with an error
    pub error: Option<Status>,

    /// Result payload once `done` is true
    pub response: Option<Value>,

    /// Progress metadata
    pub metadata: Option<Value>,
}

/// Error detail of a failed operation or job.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Status {
    #[serde(default)]
    pub code: i32,

    #[serde(default)]
    pub message: String,
}

/// Error body of a non-2xx response.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: Status,
}

/// Machine sizing for a worker pool or a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineSpec {
    pub machine_type: String,
}

/// An environment variable passed to a container.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

/// Container run by a training worker pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSpec {
    pub image_uri: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
}

/// One pool of identical training workers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerPoolSpec {
    pub machine_spec: MachineSpec,

    #[serde(with = "int64")]
    pub replica_count: u32,

    pub container_spec: ContainerSpec,
}

/// Storage prefix a job may write its outputs under.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GcsDestination {
    pub output_uri_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomJobSpec {
    pub worker_pool_specs: Vec<WorkerPoolSpec>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_output_directory: Option<GcsDestination>,
}

/// A custom training job.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomJob {
    /// Resource name, assigned by the platform
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub display_name: String,

    pub job_spec: CustomJobSpec,

    #[serde(default, skip_serializing)]
    pub state: JobState,

    #[serde(default, skip_serializing)]
    pub error: Option<Status>,

    #[serde(default, skip_serializing)]
    pub create_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing)]
    pub end_time: Option<DateTime<Utc>>,
}

/// Serving container of a model record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelContainerSpec {
    pub image_uri: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_route: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub predict_route: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<Port>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Port {
    pub container_port: u16,
}

/// A model record.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub display_name: String,

    pub artifact_uri: String,

    pub container_spec: ModelContainerSpec,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadModelRequest {
    pub model: Model,
}

/// Result of a finished upload operation.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadModelResponse {
    /// Resource name of the new model record
    pub model: String,
}

/// Compute dedicated to a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DedicatedResources {
    pub machine_spec: MachineSpec,
    pub min_replica_count: u32,
    pub max_replica_count: u32,
}

/// A model attached to an endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployedModel {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub model: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dedicated_resources: Option<DedicatedResources>,
}

impl DeployedModel {
    /// Converts into a record; deployments without an id are skipped.
    #[must_use]
    pub fn into_record(self) -> Option<DeployedModelRecord> {
        Some(DeployedModelRecord {
            id: self.id?,
            model: self.model,
            display_name: self.display_name,
        })
    }
}

/// A serving endpoint.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub display_name: String,

    #[serde(default, skip_serializing)]
    pub deployed_models: Vec<DeployedModel>,

    #[serde(default, skip_serializing)]
    pub traffic_split: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployModelRequest {
    pub deployed_model: DeployedModel,
    pub traffic_split: TrafficSplit,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployModelResponse {
    pub deployed_model: DeployedModel,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UndeployModelRequest {
    pub deployed_model_id: String,
    pub traffic_split: TrafficSplit,
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictRequest {
    pub instances: Vec<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictResponse {
    #[serde(default)]
    pub predictions: Vec<Value>,

    pub deployed_model_id: Option<String>,

    pub model: Option<String>,
}

/// Runtime parameters of a pipeline job.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeConfig {
    pub gcs_output_directory: String,

    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub parameter_values: serde_json::Map<String, Value>,
}

/// A run of a compiled pipeline on the managed pipeline runner.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineJob {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub display_name: String,

    pub pipeline_spec: Value,

    pub runtime_config: RuntimeConfig,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_account: Option<String>,

    #[serde(default, skip_serializing)]
    pub state: Option<String>,
}

/// proto3 JSON encodes int64 as a string; accept either form on input.
mod int64 {
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(value: &u32, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(u32),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(value),
            Repr::Text(text) => text.parse().map_err(de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_custom_job_request_shape() {
        let job = CustomJob {
            name: None,
            display_name: "train-sentiment-v1".to_string(),
            job_spec: CustomJobSpec {
                worker_pool_specs: vec![WorkerPoolSpec {
                    machine_spec: MachineSpec {
                        machine_type: "n1-standard-4".to_string(),
                    },
                    replica_count: 1,
                    container_spec: ContainerSpec {
                        image_uri: "image".to_string(),
                        args: vec!["train-worker".to_string()],
                        ..ContainerSpec::default()
                    },
                }],
                base_output_directory: None,
            },
            state: JobState::default(),
            error: None,
            create_time: None,
            end_time: None,
        };

        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(
            value,
            json!({
                "displayName": "train-sentiment-v1",
                "jobSpec": {
                    "workerPoolSpecs": [{
                        "machineSpec": { "machineType": "n1-standard-4" },
                        "replicaCount": "1",
                        "containerSpec": { "imageUri": "image", "args": ["train-worker"] }
                    }]
                }
            })
        );
    }

    #[test]
    fn test_custom_job_response_parses_state() {
        let job: CustomJob = serde_json::from_value(json!({
            "name": "projects/1/locations/us-central1/customJobs/99",
            "displayName": "train-m",
            "jobSpec": {
                "workerPoolSpecs": [{
                    "machineSpec": { "machineType": "n1-standard-4" },
                    "replicaCount": 1,
                    "containerSpec": { "imageUri": "image" }
                }]
            },
            "state": "JOB_STATE_RUNNING",
            "createTime": "2024-05-01T10:00:00.123456Z"
        }))
        .unwrap();

        assert_eq!(job.state, JobState::JobStateRunning);
        assert_eq!(job.job_spec.worker_pool_specs[0].replica_count, 1);
        assert!(job.create_time.is_some());
    }

    #[test]
    fn test_endpoint_response_with_deployments() {
        let endpoint: Endpoint = serde_json::from_value(json!({
            "name": "projects/1/locations/us-central1/endpoints/5",
            "displayName": "tweet-sentiment-endpoint",
            "deployedModels": [
                { "id": "111", "model": "projects/1/locations/us-central1/models/7" }
            ],
            "trafficSplit": { "111": 100 }
        }))
        .unwrap();

        assert_eq!(endpoint.deployed_models.len(), 1);
        assert_eq!(endpoint.traffic_split.get("111"), Some(&100));
    }

    #[test]
    fn test_operation_defaults_to_not_done() {
        let operation: Operation =
            serde_json::from_value(json!({ "name": "projects/1/operations/2" })).unwrap();
        assert!(!operation.done);
        assert!(operation.error.is_none());
    }
}
