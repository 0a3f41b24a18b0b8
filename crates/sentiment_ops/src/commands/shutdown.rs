//! Shutdown command - detaches every model from an endpoint and optionally
//! deletes the endpoint and the detached model records.

use anyhow::{Context, Result};
use config::PlatformConfig;
use platform_structs::{ResourceName, TrafficSplit};
use serde::Serialize;
use tracing::{info, warn};
use vertex_client::PlatformApi;

use super::endpoint_resource;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownRequest {
    pub endpoint_id: String,
    pub delete_endpoint: bool,
    pub delete_model: bool,
}

/// What a shutdown run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DecommissionReport {
    pub endpoint: String,

    /// Deployment ids detached from the endpoint
    pub undeployed: Vec<String>,

    pub endpoint_deleted: bool,

    /// Model records deleted
    pub deleted_models: Vec<String>,

    /// Model records whose deletion failed
    pub failed_models: Vec<String>,
}

/// Runs the shutdown command.
///
/// Undeploy and endpoint deletion failures abort the run. Model deletion is
/// best effort: each failure is logged and the remaining models are still
/// deleted.
pub async fn run<P: PlatformApi + ?Sized>(
    platform: &P,
    config: &PlatformConfig,
    request: &ShutdownRequest,
) -> Result<DecommissionReport> {
    let endpoint_name = endpoint_resource(config, &request.endpoint_id)?;
    let endpoint = platform
        .get_endpoint(&endpoint_name)
        .await
        .with_context(|| format!("Failed to read endpoint {endpoint_name}"))?;

    let mut report = DecommissionReport {
        endpoint: endpoint_name.to_string(),
        ..DecommissionReport::default()
    };

    // captured before undeploying; the endpoint forgets them afterwards
    let models: Vec<String> = endpoint
        .deployed_models
        .iter()
        .map(|deployed| deployed.model.clone())
        .collect();

    let mut traffic_split =
        TrafficSplit::from_percentages(endpoint.traffic_split).unwrap_or_else(|e| {
            warn!(endpoint = %endpoint_name, error = %e, "Ignoring invalid traffic split");
            TrafficSplit::default()
        });

    for deployed in endpoint.deployed_models {
        let Some(id) = deployed.id else {
            warn!(model = %deployed.model, "Deployed model without id, skipping");
            continue;
        };

        let remaining = traffic_split.without(&id);
        platform
            .undeploy_model(&endpoint_name, &id, &remaining)
            .await
            .with_context(|| format!("Failed to undeploy {id} from {endpoint_name}"))?;
        info!(endpoint = %endpoint_name, deployed_model_id = %id, "Undeployed model");

        traffic_split = remaining;
        report.undeployed.push(id);
    }

    if request.delete_endpoint {
        platform
            .delete_endpoint(&endpoint_name)
            .await
            .with_context(|| format!("Failed to delete endpoint {endpoint_name}"))?;
        info!(endpoint = %endpoint_name, "Deleted endpoint");
        report.endpoint_deleted = true;
    }

    if request.delete_model {
        for model in models {
            match delete_model(platform, &model).await {
                Ok(()) => {
                    info!(model = %model, "Deleted model");
                    report.deleted_models.push(model);
                }
                Err(e) => {
                    warn!(model = %model, error = %e, "Failed to delete model, continuing");
                    report.failed_models.push(model);
                }
            }
        }
    }

    info!(
        endpoint = %report.endpoint,
        undeployed = report.undeployed.len(),
        endpoint_deleted = report.endpoint_deleted,
        deleted_models = report.deleted_models.len(),
        failed_models = report.failed_models.len(),
        "Shutdown complete"
    );

    Ok(report)
}

async fn delete_model<P: PlatformApi + ?Sized>(platform: &P, model: &str) -> Result<()> {
    let name = model.parse::<ResourceName>()?;
    platform.delete_model(&name).await?;
    Ok(())
}
