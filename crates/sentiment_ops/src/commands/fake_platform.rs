//! In-memory stand-in for the platform, recording every call.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use platform_structs::{JobState, ResourceName, TrafficSplit};
use serde_json::{Value, json};
use vertex_client::{
    CustomJob, DeployedModel, Endpoint, Model, PipelineJob, PlatformApi, PlatformError,
    PredictResponse, Result, Status,
};

pub const LOCATION: &str = "projects/demo/locations/us-central1";

#[derive(Default)]
pub struct FakePlatform {
    /// States handed out by successive `get_custom_job` calls; succeeded once drained
    pub job_states: Mutex<VecDeque<JobState>>,
    pub job_error: Option<String>,

    pub endpoint: Option<Endpoint>,
    pub fail_undeploy: bool,
    pub fail_delete_endpoint: bool,
    pub failing_model_deletes: HashSet<String>,

    /// Truncates prediction responses to this many entries
    pub prediction_limit: Option<usize>,

    pub calls: Mutex<Vec<String>>,
    pub created_jobs: Mutex<Vec<CustomJob>>,
    pub uploaded_models: Mutex<Vec<Model>>,
    pub deployments: Mutex<Vec<(ResourceName, DeployedModel, TrafficSplit)>>,
    pub undeployments: Mutex<Vec<(String, TrafficSplit)>>,
    pub deleted_models: Mutex<Vec<String>>,
    pub predictions: Mutex<Vec<Vec<Value>>>,
    pub pipeline_jobs: Mutex<Vec<(PipelineJob, String)>>,
}

impl FakePlatform {
    pub fn with_job_states(states: &[JobState]) -> Self {
        Self {
            job_states: Mutex::new(states.iter().copied().collect()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }
}

fn api_error(status: u16, message: &str) -> PlatformError {
    PlatformError::Api {
        status,
        message: message.to_string(),
    }
}

#[async_trait]
impl PlatformApi for FakePlatform {
    async fn create_custom_job(&self, job: &CustomJob) -> Result<CustomJob> {
        self.record("create_custom_job");
        self.created_jobs.lock().unwrap().push(job.clone());

        let mut created = job.clone();
        created.name = Some(format!("{LOCATION}/customJobs/42"));
        created.state = JobState::JobStatePending;
        Ok(created)
    }

    async fn get_custom_job(&self, name: &str) -> Result<CustomJob> {
        self.record("get_custom_job");
        let state = self
            .job_states
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(JobState::JobStateSucceeded);

        let created = self
            .created_jobs
            .lock()
            .unwrap()
            .last()
            .cloned()
            .ok_or_else(|| api_error(404, "job not found"))?;

        Ok(CustomJob {
            name: Some(name.to_string()),
            state,
            error: (state == JobState::JobStateFailed).then(|| Status {
                code: 13,
                message: self.job_error.clone().unwrap_or_default(),
            }),
            ..created
        })
    }

    async fn upload_model(&self, model: &Model) -> Result<ResourceName> {
        self.record("upload_model");
        self.uploaded_models.lock().unwrap().push(model.clone());
        Ok(ResourceName::model("demo", "us-central1", "7"))
    }

    async fn create_endpoint(&self, display_name: &str) -> Result<Endpoint> {
        self.record("create_endpoint");
        Ok(Endpoint {
            name: Some(format!("{LOCATION}/endpoints/5")),
            display_name: display_name.to_string(),
            ..Endpoint::default()
        })
    }

    async fn deploy_model(
        &self,
        endpoint: &ResourceName,
        deployed_model: &DeployedModel,
        traffic_split: &TrafficSplit,
    ) -> Result<DeployedModel> {
        self.record("deploy_model");
        self.deployments.lock().unwrap().push((
            endpoint.clone(),
            deployed_model.clone(),
            traffic_split.clone(),
        ));

        Ok(DeployedModel {
            id: Some("111".to_string()),
            ..deployed_model.clone()
        })
    }

    async fn get_endpoint(&self, _endpoint: &ResourceName) -> Result<Endpoint> {
        self.record("get_endpoint");
        self.endpoint
            .clone()
            .ok_or_else(|| api_error(404, "Endpoint not found."))
    }

    async fn undeploy_model(
        &self,
        _endpoint: &ResourceName,
        deployed_model_id: &str,
        traffic_split: &TrafficSplit,
    ) -> Result<()> {
        self.record("undeploy_model");
        if self.fail_undeploy {
            return Err(api_error(500, "undeploy failed"));
        }
        self.undeployments
            .lock()
            .unwrap()
            .push((deployed_model_id.to_string(), traffic_split.clone()));
        Ok(())
    }

    async fn delete_endpoint(&self, _endpoint: &ResourceName) -> Result<()> {
        self.record("delete_endpoint");
        if self.fail_delete_endpoint {
            return Err(api_error(400, "endpoint still has deployed models"));
        }
        Ok(())
    }

    async fn delete_model(&self, model: &ResourceName) -> Result<()> {
        self.record("delete_model");
        let name = model.to_string();
        if self.failing_model_deletes.contains(&name) {
            return Err(api_error(400, "model is in use"));
        }
        self.deleted_models.lock().unwrap().push(name);
        Ok(())
    }

    async fn predict(
        &self,
        _endpoint: &ResourceName,
        instances: Vec<Value>,
    ) -> Result<PredictResponse> {
        self.record("predict");
        self.predictions.lock().unwrap().push(instances.clone());

        let mut predictions: Vec<Value> = instances
            .iter()
            .map(|text| json!({ "label": "positive", "score": 0.9, "text": text }))
            .collect();
        if let Some(limit) = self.prediction_limit {
            predictions.truncate(limit);
        }

        Ok(PredictResponse {
            predictions,
            deployed_model_id: Some("111".to_string()),
            model: None,
        })
    }

    async fn create_pipeline_job(&self, job: &PipelineJob, job_id: &str) -> Result<PipelineJob> {
        self.record("create_pipeline_job");
        self.pipeline_jobs
            .lock()
            .unwrap()
            .push((job.clone(), job_id.to_string()));

        let mut created = job.clone();
        created.name = Some(format!("{LOCATION}/pipelineJobs/{job_id}"));
        created.state = Some("PIPELINE_STATE_PENDING".to_string());
        Ok(created)
    }
}
