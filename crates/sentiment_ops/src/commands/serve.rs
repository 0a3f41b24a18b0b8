//! Serve command - the prediction container run by the endpoint.
//!
//! Follows the platform's custom-container contract: listen on
//! `AIP_HTTP_PORT`, answer health checks on `AIP_HEALTH_ROUTE`, predictions on
//! `AIP_PREDICT_ROUTE`, and load the model from `AIP_STORAGE_URI`.

use core::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use platform_structs::MODEL_FILE_NAME;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use text_classifier::{Prediction, TextPipeline};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use super::storage::{Location, StoreProvider};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeSettings {
    pub port: u16,
    pub health_route: String,
    pub predict_route: String,

    /// Artifact directory, `gs://` or local
    pub storage_uri: String,
}

#[derive(Debug, Deserialize)]
pub struct PredictBody {
    pub instances: Vec<Value>,
}

#[derive(Debug, Serialize)]
pub struct PredictReply {
    pub predictions: Vec<Prediction>,
}

#[derive(Debug, Serialize)]
pub struct ErrorReply {
    pub error: String,
}

/// Loads `model.joblib` from the artifact directory.
pub async fn load_model(storage_uri: &str, stores: &dyn StoreProvider) -> Result<TextPipeline> {
    let location = Location::parse(storage_uri)?.join(MODEL_FILE_NAME);
    info!(artifact = %location, "Loading model");

    let bytes = location.read(stores).await?;
    TextPipeline::from_bytes(&bytes).with_context(|| format!("Failed to load model from {location}"))
}

pub fn router(settings: &ServeSettings, model: Arc<TextPipeline>) -> Router {
    Router::new()
        .route(&settings.health_route, get(health_check))
        .route(&settings.predict_route, post(handle_predict))
        .with_state(model)
}

/// Runs the serve command until interrupted.
pub async fn run(settings: &ServeSettings, stores: &dyn StoreProvider) -> Result<()> {
    let model = Arc::new(load_model(&settings.storage_uri, stores).await?);
    info!(classes = ?model.classes(), "Model loaded");

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, settings.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(addr = %addr, "Prediction server listening");

    axum::serve(listener, router(settings, model))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for shutdown signal");
            }
        })
        .await
        .context("Prediction server failed")?;

    info!("Prediction server stopped");
    Ok(())
}

async fn health_check() -> StatusCode {
    StatusCode::OK
}

async fn handle_predict(
    State(model): State<Arc<TextPipeline>>,
    Json(body): Json<PredictBody>,
) -> Result<Json<PredictReply>, (StatusCode, Json<ErrorReply>)> {
    let texts = body
        .instances
        .iter()
        .enumerate()
        .map(|(i, instance)| {
            instance.as_str().ok_or_else(|| {
                (
                    StatusCode::BAD_REQUEST,
                    Json(ErrorReply {
                        error: format!("instance {i} is not a string"),
                    }),
                )
            })
        })
        .collect::<Result<Vec<&str>, _>>()?;

    debug!(instances = texts.len(), "Predicting");
    Ok(Json(PredictReply {
        predictions: model.predict(&texts),
    }))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use text_classifier::{DEFAULT_ALPHA, Dataset};

    use super::super::storage::GcsStores;
    use super::*;

    const TWEETS: &str = "text,label\n\
        I love my school,positive\n\
        Such a lovely day,positive\n\
        This exam is terrible,negative\n\
        Terrible traffic again,negative\n";

    fn model() -> Arc<TextPipeline> {
        let dataset = Dataset::from_csv_reader(TWEETS.as_bytes()).unwrap();
        Arc::new(TextPipeline::fit(&dataset, DEFAULT_ALPHA).unwrap())
    }

    #[tokio::test]
    async fn test_predict_keeps_order() {
        let body = PredictBody {
            instances: vec![json!("I love my school"), json!("This exam is terrible")],
        };

        let Json(reply) = handle_predict(State(model()), Json(body)).await.unwrap();

        assert_eq!(reply.predictions.len(), 2);
        assert_eq!(reply.predictions[0].label, "positive");
        assert_eq!(reply.predictions[1].label, "negative");
    }

    #[tokio::test]
    async fn test_non_string_instance_is_rejected() {
        let body = PredictBody {
            instances: vec![json!("fine"), json!({ "text": "nested" })],
        };

        let (status, Json(reply)) = handle_predict(State(model()), Json(body))
            .await
            .unwrap_err();

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.error, "instance 1 is not a string");
    }

    #[tokio::test]
    async fn test_load_model_from_local_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(MODEL_FILE_NAME),
            model().to_bytes().unwrap(),
        )
        .unwrap();

        let loaded = load_model(dir.path().to_str().unwrap(), &GcsStores)
            .await
            .unwrap();
        assert_eq!(loaded.classes(), ["negative", "positive"]);
    }

    #[tokio::test]
    async fn test_routes_over_http() {
        let settings = ServeSettings {
            port: 0,
            health_route: "/ping".to_string(),
            predict_route: "/predict".to_string(),
            storage_uri: String::new(),
        };
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(&settings, model());
        tokio::spawn(async move { axum::serve(listener, app).await });

        let client = reqwest::Client::new();
        let health = client
            .get(format!("http://{addr}/ping"))
            .send()
            .await
            .unwrap();
        assert_eq!(health.status(), 200);

        let reply: Value = client
            .post(format!("http://{addr}/predict"))
            .json(&json!({ "instances": ["What a lovely school"] }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(reply["predictions"][0]["label"], "positive");

        let rejected = client
            .post(format!("http://{addr}/predict"))
            .json(&json!({ "instances": [42] }))
            .send()
            .await
            .unwrap();
        assert_eq!(rejected.status(), 400);
    }
}
