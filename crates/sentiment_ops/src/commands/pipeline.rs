//! Pipeline commands - compile the train, deploy and predict chain into a
//! descriptor, and submit a compiled descriptor to the managed runner.

use std::path::Path;

use anyhow::{Context, Result};
use config::PlatformConfig;
use pipeline_graph::{
    Binding, Component, Parameter, PipelineDefinition, PipelineDescriptor, Task,
};
use platform_structs::{GcsUri, ResultLine};
use serde_json::{Map, Value};
use tracing::info;
use uuid::Uuid;
use vertex_client::{PipelineJob, PlatformApi, RuntimeConfig};

use super::{deploy, train};

pub const PIPELINE_NAME: &str = "sentiment-train-deploy-pipeline";
pub const PIPELINE_DESCRIPTION: &str =
    "Train a text classifier on Vertex AI, upload, deploy, and test-predict.";
pub const DEFAULT_DESCRIPTOR_FILE: &str = "sentiment_pipeline.json";

pub const TRAIN_TASK: &str = "launch-training-job";
pub const DEPLOY_TASK: &str = "upload-and-deploy-model";
pub const PREDICT_TASK: &str = "test-predict";

/// Texts the last step sends to the fresh endpoint.
pub const PREDICT_TEXTS: [&str; 2] = ["I love my school", "This exam is terrible"];

const SDK_VERSION: &str = concat!("sentiment-ops-", env!("CARGO_PKG_VERSION"));
const ENTRYPOINT: &str = "sentiment-ops";

const PIPELINE_PARAMETERS: [(&str, &str); 8] = [
    ("project_id", "sentiment-demo-476518"),
    ("region", config::DEFAULT_REGION),
    ("staging_bucket", "gs://sentiment-demo-bucket"),
    ("data_uri", "gs://sentiment-demo-bucket/data/tweets.csv"),
    ("bucket", "sentiment-demo-bucket"),
    ("model_name", "sentiment-v1"),
    ("display_name", "sentiment-model"),
    ("endpoint_name", "sentiment-endpoint"),
];

fn platform_flags(component: Component) -> Component {
    component
        .with_input_flag("--project-id", Parameter::required("project_id"))
        .with_input_flag("--region", Parameter::required("region"))
}

/// The three-step pipeline; every step runs `image`.
#[must_use]
pub fn sentiment_pipeline(image: &str) -> PipelineDefinition {
    let train_step = platform_flags(
        Component::new(TRAIN_TASK, image)
            .with_command([ENTRYPOINT])
            .with_arg("train"),
    )
    .with_input_flag("--staging-bucket", Parameter::required("staging_bucket"))
    .with_input_flag("--data-uri", Parameter::required("data_uri"))
    .with_input_flag("--bucket", Parameter::required("bucket"))
    .with_input_flag("--model-name", Parameter::required("model_name"))
    .with_input_flag(
        "--machine-type",
        Parameter::with_default("machine_type", train::DEFAULT_MACHINE_TYPE),
    )
    .with_arg("--image")
    .with_arg(image)
    .with_output_flag("--output-file");

    let deploy_step = platform_flags(
        Component::new(DEPLOY_TASK, image)
            .with_command([ENTRYPOINT])
            .with_arg("deploy"),
    )
    .with_input_flag("--artifact-dir", Parameter::required("artifact_dir"))
    .with_input_flag(
        "--display-name",
        Parameter::with_default("display_name", "sentiment-model"),
    )
    .with_input_flag(
        "--endpoint-name",
        Parameter::with_default("endpoint_name", "sentiment-endpoint"),
    )
    .with_input_flag(
        "--machine-type",
        Parameter::with_default("machine_type", deploy::DEFAULT_MACHINE_TYPE),
    )
    .with_arg("--image")
    .with_arg(image)
    .with_output_flag("--output-file");

    let [text1, text2] = PREDICT_TEXTS;
    let predict_step = platform_flags(
        Component::new(PREDICT_TASK, image)
            .with_command([ENTRYPOINT])
            .with_arg("predict"),
    )
    .with_input_flag("--endpoint-id", Parameter::required("endpoint_id"))
    .with_arg("--texts")
    .with_input_arg(Parameter::with_default("text1", text1))
    .with_input_arg(Parameter::with_default("text2", text2))
    .with_output_flag("--output-file");

    PipelineDefinition {
        name: PIPELINE_NAME.to_string(),
        description: Some(PIPELINE_DESCRIPTION.to_string()),
        parameters: PIPELINE_PARAMETERS
            .iter()
            .map(|(name, default)| Parameter::with_default(*name, *default))
            .collect(),
        components: vec![train_step, deploy_step, predict_step],
        tasks: vec![
            Task::new(TRAIN_TASK, TRAIN_TASK).bind_parameters(&[
                "project_id",
                "region",
                "staging_bucket",
                "data_uri",
                "bucket",
                "model_name",
            ]),
            Task::new(DEPLOY_TASK, DEPLOY_TASK)
                .bind_parameters(&["project_id", "region", "display_name", "endpoint_name"])
                .bind("artifact_dir", Binding::TaskOutput(TRAIN_TASK.to_string())),
            Task::new(PREDICT_TASK, PREDICT_TASK)
                .bind_parameters(&["project_id", "region"])
                .bind("endpoint_id", Binding::TaskOutput(DEPLOY_TASK.to_string())),
        ],
    }
}

/// Compiles the pipeline and writes the descriptor to `output`.
pub async fn compile(image: &str, output: &Path) -> Result<PipelineDescriptor> {
    let descriptor = sentiment_pipeline(image)
        .compile(SDK_VERSION)
        .context("Failed to compile pipeline")?;

    let json = serde_json::to_string_pretty(&descriptor)?;
    tokio::fs::write(output, json)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;

    info!(
        path = %output.display(),
        tasks = descriptor.root.dag.tasks.len(),
        "Wrote pipeline descriptor"
    );

    Ok(descriptor)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitRequest {
    pub descriptor: std::path::PathBuf,

    /// Root directory for pipeline outputs, `gs://...`
    pub pipeline_root: String,

    /// Parameter overrides, `name=value`
    pub parameters: Vec<(String, String)>,

    pub service_account: Option<String>,
}

/// Parses a `name=value` parameter override.
pub fn parse_parameter(value: &str) -> Result<(String, String), String> {
    let (name, value) = value
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got {value}"))?;
    if name.is_empty() {
        return Err("parameter name must not be empty".to_string());
    }

    Ok((name.to_string(), value.to_string()))
}

/// Submits a compiled descriptor as a pipeline job. Nothing runs locally.
///
/// `project_id`, `region` and `staging_bucket` default to the configured
/// values; explicit overrides win.
pub async fn submit<P: PlatformApi + ?Sized>(
    platform: &P,
    config: &PlatformConfig,
    request: &SubmitRequest,
) -> Result<PipelineJob> {
    let raw = tokio::fs::read(&request.descriptor)
        .await
        .with_context(|| format!("Failed to read {}", request.descriptor.display()))?;
    let pipeline_spec: Value = serde_json::from_slice(&raw)
        .with_context(|| format!("{} is not valid JSON", request.descriptor.display()))?;
    let descriptor: PipelineDescriptor = serde_json::from_value(pipeline_spec.clone())
        .with_context(|| format!("{} is not a pipeline descriptor", request.descriptor.display()))?;
    descriptor
        .task_order()
        .context("Pipeline descriptor has an invalid task graph")?;

    let pipeline_root = request
        .pipeline_root
        .parse::<GcsUri>()
        .with_context(|| format!("Invalid pipeline root {}", request.pipeline_root))?;

    let declared = &descriptor.root.input_definitions.parameters;
    let mut parameter_values = Map::new();
    let configured = [
        ("project_id", Some(config.project_id.clone())),
        ("region", Some(config.region.clone())),
        ("staging_bucket", config.staging_bucket.clone()),
    ];
    for (name, value) in configured {
        if let Some(value) = value
            && declared.contains_key(name)
        {
            parameter_values.insert(name.to_string(), Value::String(value));
        }
    }
    for (name, value) in &request.parameters {
        if !declared.contains_key(name) {
            anyhow::bail!("Pipeline {} has no parameter {name}", descriptor.pipeline_info.name);
        }
        parameter_values.insert(name.clone(), Value::String(value.clone()));
    }

    let job = PipelineJob {
        name: None,
        display_name: descriptor.pipeline_info.name.clone(),
        pipeline_spec,
        runtime_config: RuntimeConfig {
            gcs_output_directory: pipeline_root.to_string(),
            parameter_values,
        },
        service_account: request.service_account.clone(),
        state: None,
    };

    let job_id = format!("{}-{}", descriptor.pipeline_info.name, Uuid::new_v4().simple());
    let created = platform
        .create_pipeline_job(&job, &job_id)
        .await
        .context("Failed to submit pipeline job")?;

    info!(
        job = created.name.as_deref().unwrap_or(&job_id),
        pipeline_root = %pipeline_root,
        "Pipeline job submitted"
    );

    Ok(created)
}

#[must_use]
pub fn result_line(job: &PipelineJob) -> ResultLine {
    ResultLine::new(
        ResultLine::PIPELINE_JOB,
        job.name.as_deref().unwrap_or_default(),
    )
}
