//! Train command - submits a training job and waits for it to finish.

use anyhow::{Context, Result};
use config::PlatformConfig;
use platform_structs::{ArtifactLocation, JobState, ResourceName, ResultLine, TrainingJobRecord};
use tokio::time::{Instant, sleep};
use tracing::{debug, info};
use vertex_client::{
    ContainerSpec, CustomJob, CustomJobSpec, GcsDestination, MachineSpec, PlatformApi,
    WorkerPoolSpec,
};

/// Machine type of the training worker when none is given.
pub const DEFAULT_MACHINE_TYPE: &str = "n1-standard-4";

/// What to train and where the job runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainRequest {
    /// CSV with `text,label` columns, `gs://` or a path inside the image
    pub data_uri: String,

    /// Bucket receiving the artifact, without `gs://`
    pub bucket: String,

    pub model_name: String,
    pub machine_type: String,
    pub replica_count: u32,

    /// Image whose entrypoint is this binary
    pub image: String,
}

impl TrainRequest {
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("train-{}", self.model_name)
    }

    #[must_use]
    pub fn artifact_location(&self) -> ArtifactLocation {
        ArtifactLocation::for_model(&self.bucket, &self.model_name)
    }

    /// Builds the job: one worker pool running `train-worker` in the image.
    #[must_use]
    pub fn custom_job(&self, config: &PlatformConfig) -> CustomJob {
        let container_spec = ContainerSpec {
            image_uri: self.image.clone(),
            command: Vec::new(),
            args: vec![
                "train-worker".to_string(),
                "--data-uri".to_string(),
                self.data_uri.clone(),
                "--bucket".to_string(),
                self.bucket.clone(),
                "--model-name".to_string(),
                self.model_name.clone(),
            ],
            env: Vec::new(),
        };

        CustomJob {
            name: None,
            display_name: self.display_name(),
            job_spec: CustomJobSpec {
                worker_pool_specs: vec![WorkerPoolSpec {
                    machine_spec: MachineSpec {
                        machine_type: self.machine_type.clone(),
                    },
                    replica_count: self.replica_count,
                    container_spec,
                }],
                base_output_directory: config.staging_bucket.as_ref().map(|bucket| {
                    GcsDestination {
                        output_uri_prefix: format!(
                            "{}/{}",
                            bucket.trim_end_matches('/'),
                            self.display_name()
                        ),
                    }
                }),
            },
            state: JobState::default(),
            error: None,
            create_time: None,
            end_time: None,
        }
    }
}

/// Runs the train command.
///
/// Blocks until the job reaches a terminal state or the configured job
/// timeout elapses.
///
/// # Errors
///
/// Returns an error if submission fails, if the job ends in any state other
/// than succeeded, or on timeout.
pub async fn run<P: PlatformApi + ?Sized>(
    platform: &P,
    config: &PlatformConfig,
    request: &TrainRequest,
) -> Result<TrainingJobRecord> {
    info!(
        model_name = %request.model_name,
        data_uri = %request.data_uri,
        machine_type = %request.machine_type,
        "Submitting training job"
    );

    let created = platform
        .create_custom_job(&request.custom_job(config))
        .await
        .context("Failed to submit training job")?;
    let name = created
        .name
        .clone()
        .context("Platform returned a training job without a resource name")?;
    info!(job = %name, "Training job submitted");

    let started = Instant::now();
    let job = loop {
        let job = platform
            .get_custom_job(&name)
            .await
            .with_context(|| format!("Failed to read state of {name}"))?;
        debug!(job = %name, state = %job.state, "Polled training job");

        if job.state.is_terminal() {
            break job;
        }

        let elapsed = started.elapsed();
        if elapsed >= config.job_timeout {
            anyhow::bail!(
                "Training job {name} still {} after {elapsed:?}",
                job.state
            );
        }
        sleep(config.poll_interval).await;
    };

    if !job.state.is_success() {
        let message = job.error.map(|e| e.message).unwrap_or_default();
        anyhow::bail!("Training job {name} ended in state {}: {message}", job.state);
    }

    let record = TrainingJobRecord {
        display_name: job.display_name,
        resource_name: name
            .parse::<ResourceName>()
            .with_context(|| format!("Invalid training job name {name}"))?,
        state: job.state,
        create_time: job.create_time,
        end_time: job.end_time,
        artifact_dir: request.artifact_location().dir,
    };

    info!(
        job = %record.resource_name,
        artifact_dir = %record.artifact_dir,
        "Training job succeeded"
    );

    Ok(record)
}

/// Renders the lines the train command prints.
#[must_use]
pub fn result_lines(record: &TrainingJobRecord) -> Vec<ResultLine> {
    vec![ResultLine::new(ResultLine::ARTIFACT_DIR, &record.artifact_dir)]
}
