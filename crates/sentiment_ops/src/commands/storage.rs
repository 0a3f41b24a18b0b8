//! Reading and writing artifacts on Cloud Storage or the local disk.

use core::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use bytes::Bytes;
use object_store::path::Path as ObjectStorePath;
use object_store::{ObjectStore, ObjectStoreExt};
use platform_structs::GcsUri;
use tracing::debug;

/// Hands out an object store per bucket.
pub trait StoreProvider: Send + Sync {
    fn store_for(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>>;
}

/// Cloud Storage buckets, with credentials from the ambient Google environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct GcsStores;

impl StoreProvider for GcsStores {
    fn store_for(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>> {
        config::object_store_for_bucket(bucket)
    }
}

/// One store serving every bucket. Used with in-memory stores.
#[derive(Debug, Clone)]
pub struct SingleStore(pub Arc<dyn ObjectStore>);

impl StoreProvider for SingleStore {
    fn store_for(&self, _bucket: &str) -> Result<Arc<dyn ObjectStore>> {
        Ok(Arc::clone(&self.0))
    }
}

/// A `gs://` object or a local file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Gcs(GcsUri),
    Local(PathBuf),
}

impl Location {
    /// Parses `gs://bucket/object` as a bucket object and anything else as a path.
    pub fn parse(value: &str) -> Result<Self> {
        if value.starts_with("gs://") {
            let uri: GcsUri = value
                .parse()
                .with_context(|| format!("Invalid storage URI {value}"))?;
            Ok(Self::Gcs(uri))
        } else {
            Ok(Self::Local(PathBuf::from(value)))
        }
    }

    /// Returns the location of `name` inside this directory.
    #[must_use]
    pub fn join(&self, name: &str) -> Self {
        match self {
            Self::Gcs(uri) => Self::Gcs(uri.join(name)),
            Self::Local(path) => Self::Local(path.join(name)),
        }
    }

    pub async fn read(&self, stores: &dyn StoreProvider) -> Result<Bytes> {
        match self {
            Self::Gcs(uri) => {
                let store = stores.store_for(&uri.bucket)?;
                let object_path = ObjectStorePath::from(uri.object.as_str());
                debug!(uri = %uri, "Reading from object store");

                store
                    .get(&object_path)
                    .await
                    .with_context(|| format!("Failed to read {uri}"))?
                    .bytes()
                    .await
                    .with_context(|| format!("Failed to read bytes of {uri}"))
            }
            Self::Local(path) => {
                let data = tokio::fs::read(path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                Ok(Bytes::from(data))
            }
        }
    }

    pub async fn write(&self, data: Bytes, stores: &dyn StoreProvider) -> Result<()> {
        match self {
            Self::Gcs(uri) => {
                let store = stores.store_for(&uri.bucket)?;
                let object_path = ObjectStorePath::from(uri.object.as_str());
                debug!(uri = %uri, bytes = data.len(), "Writing to object store");

                store
                    .put(&object_path, data.into())
                    .await
                    .with_context(|| format!("Failed to write {uri}"))?;
            }
            Self::Local(path) => {
                if let Some(parent) = path.parent()
                    && !parent.as_os_str().is_empty()
                {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(path, &data)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?;
            }
        }

        Ok(())
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gcs(uri) => write!(f, "{uri}"),
            Self::Local(path) => write!(f, "{}", path.display()),
        }
    }
}
