//! Predict command - one online prediction against a deployed endpoint.

use anyhow::{Context, Result};
use config::PlatformConfig;
use platform_structs::ResultLine;
use serde_json::Value;
use tracing::info;
use vertex_client::PlatformApi;

use super::endpoint_resource;

/// Sends `texts` to the endpoint and returns one prediction per text, in order.
///
/// The call is made once and never retried.
///
/// # Errors
///
/// Returns an error if the endpoint cannot be reached or answers with a
/// different number of predictions than texts sent.
pub async fn run<P: PlatformApi + ?Sized>(
    platform: &P,
    config: &PlatformConfig,
    endpoint_id: &str,
    texts: &[String],
) -> Result<Vec<Value>> {
    if texts.is_empty() {
        anyhow::bail!("At least one text is required");
    }

    let endpoint = endpoint_resource(config, endpoint_id)?;
    let instances = texts.iter().cloned().map(Value::String).collect();

    let response = platform
        .predict(&endpoint, instances)
        .await
        .with_context(|| format!("Prediction request to {endpoint} failed"))?;

    if response.predictions.len() != texts.len() {
        anyhow::bail!(
            "Endpoint {endpoint} returned {} predictions for {} texts",
            response.predictions.len(),
            texts.len()
        );
    }

    info!(
        endpoint = %endpoint,
        deployed_model_id = response.deployed_model_id.as_deref().unwrap_or_default(),
        predictions = response.predictions.len(),
        "Received predictions"
    );

    Ok(response.predictions)
}

/// Renders predictions as a `PREDICTIONS` result line.
pub fn result_line(predictions: &[Value]) -> Result<ResultLine> {
    Ok(ResultLine::new(
        ResultLine::PREDICTIONS,
        serde_json::to_string(predictions)?,
    ))
}
