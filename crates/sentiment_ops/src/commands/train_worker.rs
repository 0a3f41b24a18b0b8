//! Training worker - runs inside the training job.
//!
//! Reads the labelled CSV, fits the text pipeline and uploads the artifact to
//! `gs://{bucket}/models/{model_name}/model.joblib`.

use anyhow::{Context, Result};
use bytes::Bytes;
use platform_structs::{ArtifactLocation, ResultLine};
use text_classifier::{DEFAULT_ALPHA, Dataset, TextPipeline};
use tracing::info;

use super::storage::{Location, StoreProvider};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerRequest {
    pub data_uri: String,
    pub bucket: String,
    pub model_name: String,
}

/// Result of a finished training run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainedArtifact {
    pub location: ArtifactLocation,
    pub documents: usize,
    pub classes: Vec<String>,
}

impl TrainedArtifact {
    #[must_use]
    pub fn result_line(&self) -> ResultLine {
        ResultLine::new(ResultLine::ARTIFACT_DIR, &self.location.dir)
    }
}

/// Runs the training worker.
///
/// # Errors
///
/// Returns an error if the dataset cannot be read or lacks the `text` and
/// `label` columns, if fitting fails, or if the upload fails.
pub async fn run(request: &WorkerRequest, stores: &dyn StoreProvider) -> Result<TrainedArtifact> {
    let source = Location::parse(&request.data_uri)?;
    info!(data_uri = %source, "Reading dataset");

    let raw = source.read(stores).await?;
    let dataset = Dataset::from_csv_reader(raw.as_ref())
        .with_context(|| format!("Failed to load dataset from {source}"))?;
    info!(rows = dataset.len(), "Dataset loaded");

    let pipeline = TextPipeline::fit(&dataset, DEFAULT_ALPHA).context("Failed to fit model")?;
    let artifact = Bytes::from(pipeline.to_bytes()?);

    let location = ArtifactLocation::for_model(&request.bucket, &request.model_name);
    info!(artifact_uri = %location.file, bytes = artifact.len(), "Uploading model artifact");
    Location::Gcs(location.file.clone())
        .write(artifact, stores)
        .await
        .context("Failed to upload model artifact")?;

    Ok(TrainedArtifact {
        location,
        documents: dataset.len(),
        classes: pipeline.classes().to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use object_store::memory::InMemory;

    use super::super::storage::SingleStore;
    use super::*;

    const TWEETS: &str = "text,label\n\
        I love my school,positive\n\
        Great game tonight,positive\n\
        This exam is terrible,negative\n\
        I hate rainy mondays,negative\n";

    fn request(data_uri: &str) -> WorkerRequest {
        WorkerRequest {
            data_uri: data_uri.to_string(),
            bucket: "sentiment-demo-bucket".to_string(),
            model_name: "sentiment-v1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_trains_from_bucket_and_uploads_artifact() {
        let stores = SingleStore(Arc::new(InMemory::new()));
        Location::parse("gs://sentiment-demo-bucket/data/tweets.csv")
            .unwrap()
            .write(Bytes::from_static(TWEETS.as_bytes()), &stores)
            .await
            .unwrap();

        let trained = run(&request("gs://sentiment-demo-bucket/data/tweets.csv"), &stores)
            .await
            .unwrap();

        assert_eq!(trained.documents, 4);
        assert_eq!(trained.classes, vec!["negative", "positive"]);
        assert_eq!(
            trained.result_line().to_string(),
            "[RESULT] ARTIFACT_DIR=gs://sentiment-demo-bucket/models/sentiment-v1/"
        );

        let bytes = Location::Gcs(trained.location.file)
            .read(&stores)
            .await
            .unwrap();
        let pipeline = TextPipeline::from_bytes(&bytes).unwrap();
        assert_eq!(pipeline.predict(&["I love school"])[0].label, "positive");
    }

    #[tokio::test]
    async fn test_trains_from_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tweets.csv");
        std::fs::write(&path, TWEETS).unwrap();
        let stores = SingleStore(Arc::new(InMemory::new()));

        let trained = run(&request(path.to_str().unwrap()), &stores).await.unwrap();
        assert_eq!(trained.documents, 4);
    }

    #[tokio::test]
    async fn test_missing_columns_fail_before_upload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tweets.csv");
        std::fs::write(&path, "tweet,sentiment\nhello,positive\n").unwrap();
        let stores = SingleStore(Arc::new(InMemory::new()));

        let err = run(&request(path.to_str().unwrap()), &stores).await.unwrap_err();
        assert!(format!("{err:#}").contains("CSV must have columns: text,label"));

        let artifact = Location::parse("gs://sentiment-demo-bucket/models/sentiment-v1/model.joblib")
            .unwrap();
        assert!(artifact.read(&stores).await.is_err());
    }
}
