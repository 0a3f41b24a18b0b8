use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ParseError;

/// File name the serving container looks for inside an artifact directory.
pub const MODEL_FILE_NAME: &str = "model.joblib";

const GCS_SCHEME: &str = "gs://";

/// A Cloud Storage location, `gs://{bucket}/{object}`.
///
/// `object` may be empty (bucket root) and keeps a trailing `/` for directories.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GcsUri {
    pub bucket: String,
    pub object: String,
}

impl GcsUri {
    #[must_use]
    pub fn new(bucket: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            object: object.into(),
        }
    }

    /// Returns the location of `name` inside this directory.
    #[must_use]
    pub fn join(&self, name: &str) -> Self {
        let object = if self.object.is_empty() || self.object.ends_with('/') {
            format!("{}{name}", self.object)
        } else {
            format!("{}/{name}", self.object)
        };
        Self::new(self.bucket.clone(), object)
    }

    /// Returns true when the URI names a directory (empty or `/`-terminated object).
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.object.is_empty() || self.object.ends_with('/')
    }
}

impl FromStr for GcsUri {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix(GCS_SCHEME)
            .ok_or_else(|| ParseError::MissingScheme(s.to_string()))?;

        let (bucket, object) = rest.split_once('/').unwrap_or((rest, ""));
        if bucket.is_empty() {
            return Err(ParseError::MissingBucket(s.to_string()));
        }

        Ok(Self::new(bucket, object))
    }
}

impl fmt::Display for GcsUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{GCS_SCHEME}{}/{}", self.bucket, self.object)
    }
}

/// Where a trained model is written and where the platform reads it from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactLocation {
    /// `gs://{bucket}/models/{model_name}/model.joblib`
    pub file: GcsUri,

    /// `gs://{bucket}/models/{model_name}/`
    pub dir: GcsUri,
}

impl ArtifactLocation {
    /// Returns the conventional location for `model_name` in `bucket`.
    ///
    /// `bucket` is a bare bucket name; a leading `gs://` is tolerated.
    #[must_use]
    pub fn for_model(bucket: &str, model_name: &str) -> Self {
        let bucket = bucket
            .strip_prefix(GCS_SCHEME)
            .unwrap_or(bucket)
            .trim_end_matches('/');
        let dir = GcsUri::new(bucket, format!("models/{model_name}/"));
        let file = dir.join(MODEL_FILE_NAME);

        Self { file, dir }
    }

    /// Returns the artifact file inside an already known artifact directory.
    #[must_use]
    pub fn from_dir(dir: GcsUri) -> Self {
        let dir = if dir.is_dir() {
            dir
        } else {
            GcsUri::new(dir.bucket, format!("{}/", dir.object))
        };
        let file = dir.join(MODEL_FILE_NAME);

        Self { file, dir }
    }
}
