//! CLI command implementations.

use std::path::Path;

use anyhow::{Context, Result};
use config::PlatformConfig;
use platform_structs::{Collection, ResourceName, ResultLine};
use tracing::debug;
use vertex_client::{AccessToken, VertexClient};

pub mod deploy;
pub mod pipeline;
pub mod predict;
pub mod serve;
pub mod shutdown;
pub mod storage;
pub mod train;
pub mod train_worker;

#[cfg(test)]
mod fake_platform;

/// Builds an authenticated client for `config`.
pub async fn connect(config: &PlatformConfig) -> Result<VertexClient> {
    let token = AccessToken::from_env_or_gcloud()
        .await
        .context("Failed to obtain an access token")?;

    VertexClient::new(config, token).context("Failed to create the platform client")
}

/// Prints `[RESULT] KEY=value` lines on stdout, the only output that goes there.
pub fn emit<'a>(lines: impl IntoIterator<Item = &'a ResultLine>) {
    for line in lines {
        println!("{line}");
    }
}

/// Writes a step output to `path`, creating parent directories.
///
/// Pipeline steps hand their result to the next step this way.
pub async fn write_output_file(path: Option<&Path>, value: &str) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    tokio::fs::write(path, value)
        .await
        .with_context(|| format!("Failed to write output file {}", path.display()))?;
    debug!(path = %path.display(), "Wrote output file");

    Ok(())
}

/// Resolves an endpoint given either as a short id or a full resource name.
pub fn endpoint_resource(config: &PlatformConfig, endpoint_id: &str) -> Result<ResourceName> {
    let endpoint_id = endpoint_id.trim();
    if endpoint_id.contains('/') {
        let name: ResourceName = endpoint_id
            .parse()
            .with_context(|| format!("Invalid endpoint name {endpoint_id}"))?;
        if name.collection != Collection::Endpoints {
            anyhow::bail!("{endpoint_id} is not an endpoint");
        }
        return Ok(name);
    }
    if endpoint_id.is_empty() {
        anyhow::bail!("Endpoint id must not be empty");
    }

    Ok(ResourceName::endpoint(
        &config.project_id,
        &config.region,
        endpoint_id,
    ))
}
