//! OAuth access token for the platform REST API.

use core::fmt;
use core::time::Duration;

use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::{PlatformError, Result};

/// Environment variables checked, in order, for a ready-made token.
const TOKEN_ENV_VARS: [&str; 2] = ["VERTEX_ACCESS_TOKEN", "GOOGLE_OAUTH_ACCESS_TOKEN"];

/// Token endpoint of the metadata server, reachable inside platform containers.
const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

const METADATA_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Deserialize)]
struct MetadataToken {
    access_token: String,
}

/// A bearer token. The value is never printed.
#[derive(Clone)]
pub struct AccessToken(String);

impl AccessToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Reads the token from the environment, then the metadata server of the
    /// container it runs in, then `gcloud auth print-access-token`.
    pub async fn from_env_or_gcloud() -> Result<Self> {
        for var in TOKEN_ENV_VARS {
            if let Ok(token) = std::env::var(var)
                && !token.trim().is_empty()
            {
                debug!(source = var, "Using access token from environment");
                return Ok(Self::new(token.trim()));
            }
        }

        match Self::from_metadata_server(METADATA_TOKEN_URL).await {
            Ok(token) => return Ok(token),
            Err(e) => debug!(error = %e, "Metadata server unavailable"),
        }

        debug!("Requesting access token from gcloud");
        let output = Command::new("gcloud")
            .args(["auth", "print-access-token"])
            .output()
            .await
            .map_err(|e| PlatformError::Auth(format!("failed to run gcloud: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PlatformError::Auth(format!(
                "gcloud exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            return Err(PlatformError::Auth("gcloud returned an empty token".to_string()));
        }

        Ok(Self(token))
    }

    async fn from_metadata_server(url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(METADATA_TIMEOUT)
            .build()?;
        let response = client
            .get(url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await?
            .error_for_status()?;
        let token: MetadataToken = response.json().await?;

        debug!("Using access token from metadata server");
        Ok(Self(token.access_token))
    }

    pub(crate) fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}
