//! Sentiment model operations on Vertex AI.
//!
//! Trains a text classifier as a custom job, deploys it behind an endpoint,
//! queries and tears down the endpoint, and compiles the whole chain into a
//! pipeline descriptor.

use core::time::Duration;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use config::PlatformConfig;
use platform_structs::{GcsUri, ResultLine};
use sentiment_ops::commands::{
    self, deploy, emit, pipeline, predict, serve, shutdown, storage::GcsStores, train,
    train_worker, write_output_file,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Sentiment model operations on Vertex AI
#[derive(Parser)]
#[command(name = "sentiment-ops")]
#[command(about = "Train, deploy, query and tear down a sentiment model on Vertex AI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    platform: PlatformArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Platform connection settings, from flags or the environment.
#[derive(Args)]
struct PlatformArgs {
    /// Cloud project id
    #[arg(long, env = "VERTEX_PROJECT_ID", global = true)]
    project_id: Option<String>,

    /// Platform region
    #[arg(long, env = "VERTEX_REGION", default_value = config::DEFAULT_REGION, global = true)]
    region: String,

    /// Staging bucket for job files (gs://...)
    #[arg(long, env = "VERTEX_STAGING_BUCKET", global = true)]
    staging_bucket: Option<String>,

    /// Override of the REST base URL
    #[arg(long, env = "VERTEX_API_ENDPOINT", global = true)]
    api_endpoint: Option<String>,

    #[arg(
        long,
        env = "VERTEX_REQUEST_TIMEOUT_SECS",
        default_value_t = config::DEFAULT_REQUEST_TIMEOUT.as_secs(),
        global = true
    )]
    request_timeout_secs: u64,

    #[arg(
        long,
        env = "VERTEX_POLL_INTERVAL_SECS",
        default_value_t = config::DEFAULT_POLL_INTERVAL.as_secs(),
        global = true
    )]
    poll_interval_secs: u64,

    #[arg(
        long,
        env = "VERTEX_OPERATION_TIMEOUT_SECS",
        default_value_t = config::DEFAULT_OPERATION_TIMEOUT.as_secs(),
        global = true
    )]
    operation_timeout_secs: u64,

    #[arg(
        long,
        env = "VERTEX_JOB_TIMEOUT_SECS",
        default_value_t = config::DEFAULT_JOB_TIMEOUT.as_secs(),
        global = true
    )]
    job_timeout_secs: u64,
}

impl PlatformArgs {
    fn config(&self) -> Result<PlatformConfig> {
        let project_id = self
            .project_id
            .clone()
            .context("A project id is required (--project-id or VERTEX_PROJECT_ID)")?;

        Ok(PlatformConfig::new(project_id, self.region.clone())
            .with_staging_bucket(self.staging_bucket.clone())
            .with_api_endpoint(self.api_endpoint.clone())
            .with_request_timeout(Duration::from_secs(self.request_timeout_secs))
            .with_poll_interval(Duration::from_secs(self.poll_interval_secs))
            .with_operation_timeout(Duration::from_secs(self.operation_timeout_secs))
            .with_job_timeout(Duration::from_secs(self.job_timeout_secs)))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a training job and wait for it to finish
    Train {
        /// Labelled CSV with `text,label` columns (gs://... or a path in the image)
        #[arg(long)]
        data_uri: String,

        /// Bucket receiving the model artifact, without gs://
        #[arg(long)]
        bucket: String,

        #[arg(long)]
        model_name: String,

        #[arg(long, default_value = train::DEFAULT_MACHINE_TYPE)]
        machine_type: String,

        #[arg(long, default_value_t = 1)]
        replica_count: u32,

        /// Image running the worker; derived from project and region when absent
        #[arg(long, env = "SENTIMENT_OPS_IMAGE")]
        image: Option<String>,

        /// Also write the artifact directory to this file
        #[arg(long)]
        output_file: Option<PathBuf>,
    },

    /// Train the model in-process and upload the artifact (runs inside the job)
    TrainWorker {
        #[arg(long)]
        data_uri: String,

        #[arg(long)]
        bucket: String,

        #[arg(long)]
        model_name: String,
    },

    /// Upload a trained artifact and deploy it to a new endpoint
    Deploy {
        /// Directory containing model.joblib (gs://...)
        #[arg(long)]
        artifact_dir: String,

        #[arg(long, default_value = deploy::DEFAULT_DISPLAY_NAME)]
        display_name: String,

        #[arg(long, default_value = deploy::DEFAULT_ENDPOINT_NAME)]
        endpoint_name: String,

        #[arg(long, default_value = deploy::DEFAULT_MACHINE_TYPE)]
        machine_type: String,

        /// Serving image; derived from project and region when absent
        #[arg(long, env = "SENTIMENT_OPS_IMAGE")]
        image: Option<String>,

        /// Also write the endpoint id to this file
        #[arg(long)]
        output_file: Option<PathBuf>,
    },

    /// Send texts to a deployed endpoint
    Predict {
        /// Endpoint id or full resource name
        #[arg(long)]
        endpoint_id: String,

        #[arg(long, num_args = 1.., required = true)]
        texts: Vec<String>,

        /// Also write the predictions (JSON) to this file
        #[arg(long)]
        output_file: Option<PathBuf>,
    },

    /// Undeploy every model from an endpoint
    Shutdown {
        /// Endpoint id or full resource name
        #[arg(long)]
        endpoint_id: String,

        /// Delete the endpoint afterwards
        #[arg(long)]
        delete_endpoint: bool,

        /// Delete the undeployed model records afterwards
        #[arg(long)]
        delete_model: bool,
    },

    /// Compile the train, deploy and predict pipeline to a JSON descriptor
    CompilePipeline {
        #[arg(long, default_value = pipeline::DEFAULT_DESCRIPTOR_FILE)]
        output: PathBuf,

        /// Image every step runs; derived from project and region when absent
        #[arg(long, env = "SENTIMENT_OPS_IMAGE")]
        image: Option<String>,
    },

    /// Submit a compiled descriptor to the managed pipeline runner
    SubmitPipeline {
        #[arg(long, default_value = pipeline::DEFAULT_DESCRIPTOR_FILE)]
        descriptor: PathBuf,

        /// Root for pipeline outputs (gs://...)
        #[arg(long)]
        pipeline_root: String,

        /// Pipeline parameter override, `name=value`; repeatable
        #[arg(long = "param", value_parser = pipeline::parse_parameter)]
        parameters: Vec<(String, String)>,

        #[arg(long)]
        service_account: Option<String>,
    },

    /// Serve predictions from a trained artifact (the endpoint container)
    Serve {
        #[arg(long, env = "AIP_HTTP_PORT", default_value_t = deploy::SERVING_PORT)]
        port: u16,

        #[arg(long, env = "AIP_HEALTH_ROUTE", default_value = deploy::HEALTH_ROUTE)]
        health_route: String,

        #[arg(long, env = "AIP_PREDICT_ROUTE", default_value = deploy::PREDICT_ROUTE)]
        predict_route: String,

        /// Artifact directory (gs://... or a local path)
        #[arg(long, env = "AIP_STORAGE_URI")]
        storage_uri: String,
    },
}

#[tokio::main(flavor = "current_thread")]
#[expect(clippy::too_many_lines, reason = "one arm per subcommand")]
async fn main() -> Result<()> {
    config::load_dotenv();
    let cli = Cli::parse();

    // stdout is reserved for [RESULT] lines
    let default_filter = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Train {
            data_uri,
            bucket,
            model_name,
            machine_type,
            replica_count,
            image,
            output_file,
        } => {
            let config = cli.platform.config()?;
            let client = commands::connect(&config).await?;
            let request = train::TrainRequest {
                data_uri,
                bucket,
                model_name,
                machine_type,
                replica_count,
                image: image.unwrap_or_else(|| config.default_image_uri()),
            };

            let record = train::run(&client, &config, &request).await?;
            emit(&train::result_lines(&record));
            write_output_file(output_file.as_deref(), &record.artifact_dir.to_string()).await?;
        }
        Commands::TrainWorker {
            data_uri,
            bucket,
            model_name,
        } => {
            let request = train_worker::WorkerRequest {
                data_uri,
                bucket,
                model_name,
            };

            let trained = train_worker::run(&request, &GcsStores).await?;
            emit([&trained.result_line()]);
        }
        Commands::Deploy {
            artifact_dir,
            display_name,
            endpoint_name,
            machine_type,
            image,
            output_file,
        } => {
            let config = cli.platform.config()?;
            let artifact_dir = artifact_dir
                .parse::<GcsUri>()
                .with_context(|| format!("Invalid artifact directory {artifact_dir}"))?;
            let client = commands::connect(&config).await?;
            let request = deploy::DeployRequest {
                artifact_dir,
                display_name,
                endpoint_name,
                machine_type,
                image: image.unwrap_or_else(|| config.default_image_uri()),
            };

            let deployment = deploy::run(&client, &config, &request).await?;
            emit(&deployment.result_lines());
            write_output_file(output_file.as_deref(), deployment.endpoint.endpoint_id()).await?;
        }
        Commands::Predict {
            endpoint_id,
            texts,
            output_file,
        } => {
            let config = cli.platform.config()?;
            let client = commands::connect(&config).await?;

            let predictions = predict::run(&client, &config, &endpoint_id, &texts).await?;
            let line = predict::result_line(&predictions)?;
            emit([&line]);
            write_output_file(output_file.as_deref(), &line.value).await?;
        }
        Commands::Shutdown {
            endpoint_id,
            delete_endpoint,
            delete_model,
        } => {
            let config = cli.platform.config()?;
            let client = commands::connect(&config).await?;
            let request = shutdown::ShutdownRequest {
                endpoint_id,
                delete_endpoint,
                delete_model,
            };

            let report = shutdown::run(&client, &config, &request).await?;
            if !report.failed_models.is_empty() {
                info!(failed = ?report.failed_models, "Some model records were left in place");
            }
        }
        Commands::CompilePipeline { output, image } => {
            let image = match image {
                Some(image) => image,
                None => cli.platform.config()?.default_image_uri(),
            };

            pipeline::compile(&image, &output).await?;
            emit([&ResultLine::new(ResultLine::PIPELINE_FILE, output.display())]);
        }
        Commands::SubmitPipeline {
            descriptor,
            pipeline_root,
            parameters,
            service_account,
        } => {
            let config = cli.platform.config()?;
            let client = commands::connect(&config).await?;
            let request = pipeline::SubmitRequest {
                descriptor,
                pipeline_root,
                parameters,
                service_account,
            };

            let job = pipeline::submit(&client, &config, &request).await?;
            emit([&pipeline::result_line(&job)]);
        }
        Commands::Serve {
            port,
            health_route,
            predict_route,
            storage_uri,
        } => {
            let settings = serve::ServeSettings {
                port,
                health_route,
                predict_route,
                storage_uri,
            };
            serve::run(&settings, &GcsStores).await?;
        }
    }

    Ok(())
}
