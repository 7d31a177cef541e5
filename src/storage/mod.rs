// src/storage/mod.rs

pub mod gcs;

use std::{fs, io::ErrorKind, path::Path, sync::Arc};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{EtlError, Result};

pub use gcs::GcsStore;

/// The bits of an object store the upload stage needs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Make sure `bucket` exists, creating it in `location` if it does not.
    async fn ensure_bucket(&self, bucket: &str, location: &str) -> Result<()>;

    /// Write `data` as `bucket/name`, failing with [`EtlError::ObjectExists`]
    /// instead of overwriting.
    async fn upload_new(&self, bucket: &str, name: &str, data: Vec<u8>) -> Result<()>;

    async fn exists(&self, bucket: &str, name: &str) -> Result<bool>;
}

#[async_trait]
impl<T: ObjectStore + ?Sized> ObjectStore for Arc<T> {
    async fn ensure_bucket(&self, bucket: &str, location: &str) -> Result<()> {
        (**self).ensure_bucket(bucket, location).await
    }

    async fn upload_new(&self, bucket: &str, name: &str, data: Vec<u8>) -> Result<()> {
        (**self).upload_new(bucket, name, data).await
    }

    async fn exists(&self, bucket: &str, name: &str) -> Result<bool> {
        (**self).exists(bucket, name).await
    }
}

/// Upload a local file under its own file name and return `"<bucket>/<file_name>"`.
pub async fn upload_file<S: ObjectStore + ?Sized>(
    store: &S,
    bucket: &str,
    location: &str,
    path: &Path,
) -> Result<String> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| EtlError::NoFileName(path.to_path_buf()))?;

    store.ensure_bucket(bucket, location).await?;

    let data = tokio::fs::read(path).await?;
    let bytes = data.len();
    store.upload_new(bucket, name, data).await?;

    let remote = format!("{}/{}", bucket, name);
    info!(bytes, "Uploaded {} to gs://{}", path.display(), remote);
    Ok(remote)
}

/// Remove a local file. A file that is already gone is not an error.
pub fn clean(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(file = %path.display(), "removed local file");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
