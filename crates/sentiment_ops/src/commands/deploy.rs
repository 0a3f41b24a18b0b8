//! Deploy command - registers a trained artifact and serves it from a new endpoint.

use anyhow::{Context, Result};
use config::PlatformConfig;
use platform_structs::{
    ArtifactLocation, EndpointRecord, GcsUri, ModelRecord, NEW_DEPLOYMENT_KEY, ResourceName,
    ResultLine, TrafficSplit,
};
use tracing::info;
use vertex_client::{
    DedicatedResources, DeployedModel, MachineSpec, Model, ModelContainerSpec, PlatformApi, Port,
};

pub const DEFAULT_DISPLAY_NAME: &str = "tweet-sentiment-model";
pub const DEFAULT_ENDPOINT_NAME: &str = "tweet-sentiment-endpoint";
pub const DEFAULT_MACHINE_TYPE: &str = "n1-standard-2";

pub const HEALTH_ROUTE: &str = "/ping";
pub const PREDICT_ROUTE: &str = "/predict";
pub const SERVING_PORT: u16 = 8080;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployRequest {
    /// Directory holding `model.joblib`
    pub artifact_dir: GcsUri,

    pub display_name: String,
    pub endpoint_name: String,
    pub machine_type: String,

    /// Serving image; runs `serve`
    pub image: String,
}

impl DeployRequest {
    /// Builds the model record to upload.
    #[must_use]
    pub fn model(&self) -> Model {
        let artifact_dir = ArtifactLocation::from_dir(self.artifact_dir.clone()).dir;

        Model {
            name: None,
            display_name: self.display_name.clone(),
            artifact_uri: artifact_dir.to_string(),
            container_spec: ModelContainerSpec {
                image_uri: self.image.clone(),
                command: Vec::new(),
                args: vec!["serve".to_string()],
                health_route: Some(HEALTH_ROUTE.to_string()),
                predict_route: Some(PREDICT_ROUTE.to_string()),
                ports: vec![Port {
                    container_port: SERVING_PORT,
                }],
            },
        }
    }

    fn deployed_model(&self, model: &ResourceName) -> DeployedModel {
        DeployedModel {
            id: None,
            model: model.to_string(),
            display_name: Some(self.display_name.clone()),
            dedicated_resources: Some(DedicatedResources {
                machine_spec: MachineSpec {
                    machine_type: self.machine_type.clone(),
                },
                min_replica_count: 1,
                max_replica_count: 1,
            }),
        }
    }
}

/// What a deploy run created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    pub model: ModelRecord,
    pub endpoint: EndpointRecord,
}

impl Deployment {
    #[must_use]
    pub fn result_lines(&self) -> Vec<ResultLine> {
        vec![
            ResultLine::new(ResultLine::ENDPOINT_ID, self.endpoint.endpoint_id()),
            ResultLine::new(ResultLine::ENDPOINT_RESOURCE, &self.endpoint.resource_name),
        ]
    }
}

/// Runs the deploy command.
///
/// Uploads the model, creates a fresh endpoint and routes all of its traffic
/// to the new deployment. Nothing is rolled back when a later step fails.
pub async fn run<P: PlatformApi + ?Sized>(
    platform: &P,
    config: &PlatformConfig,
    request: &DeployRequest,
) -> Result<Deployment> {
    let model = request.model();
    info!(artifact_dir = %model.artifact_uri, "Uploading model");
    let model_name = platform
        .upload_model(&model)
        .await
        .context("Failed to upload model")?;
    info!(model = %model_name, "Model uploaded");

    let endpoint = platform
        .create_endpoint(&request.endpoint_name)
        .await
        .context("Failed to create endpoint")?;
    let endpoint_name = endpoint
        .name
        .as_deref()
        .context("Platform returned an endpoint without a resource name")?
        .parse::<ResourceName>()
        .context("Platform returned an invalid endpoint name")?;
    info!(endpoint = %endpoint_name, "Endpoint created");

    let traffic_split = TrafficSplit::single(NEW_DEPLOYMENT_KEY);
    let deployed = platform
        .deploy_model(
            &endpoint_name,
            &request.deployed_model(&model_name),
            &traffic_split,
        )
        .await
        .with_context(|| format!("Failed to deploy {model_name} to {endpoint_name}"))?;

    let deployed = deployed
        .into_record()
        .context("Platform returned a deployment without an id")?;
    info!(
        endpoint = %endpoint_name,
        deployed_model_id = %deployed.id,
        location = %config.location_path(),
        "Model deployed"
    );

    Ok(Deployment {
        model: ModelRecord {
            resource_name: model_name,
            display_name: request.display_name.clone(),
            artifact_uri: ArtifactLocation::from_dir(request.artifact_dir.clone()).dir,
            serving_image: request.image.clone(),
        },
        endpoint: EndpointRecord {
            resource_name: endpoint_name,
            display_name: endpoint.display_name,
            traffic_split: TrafficSplit::single(deployed.id.clone()),
            deployed_models: vec![deployed],
        },
    })
}
