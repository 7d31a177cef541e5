// src/storage/gcs.rs

use async_trait::async_trait;
use google_cloud_storage::{
    client::{Client, ClientConfig},
    http::{
        buckets::{
            get::GetBucketRequest,
            insert::{BucketCreationConfig, InsertBucketParam, InsertBucketRequest},
        },
        objects::{
            get::GetObjectRequest,
            upload::{Media, UploadObjectRequest, UploadType},
        },
        Error,
    },
};
use tracing::{debug, info, warn};

use super::ObjectStore;
use crate::error::{EtlError, Result};

const NOT_FOUND: u16 = 404;
const CONFLICT: u16 = 409;
const PRECONDITION_FAILED: u16 = 412;

/// Google Cloud Storage, authenticated with application default credentials.
pub struct GcsStore {
    client: Client,
    project_id: String,
}

impl GcsStore {
    pub async fn new(project_id: impl Into<String>) -> Result<Self> {
        let config = ClientConfig::default()
            .with_auth()
            .await
            .map_err(|e| EtlError::Auth(Box::new(e)))?;

        Ok(Self {
            client: Client::new(config),
            project_id: project_id.into(),
        })
    }
}

fn response_code(err: &Error) -> Option<u16> {
    match err {
        Error::Response(resp) => Some(resp.code),
        _ => None,
    }
}

#[async_trait]
impl ObjectStore for GcsStore {
    async fn ensure_bucket(&self, bucket: &str, location: &str) -> Result<()> {
        let get = GetBucketRequest {
            bucket: bucket.to_string(),
            ..Default::default()
        };
        match self.client.get_bucket(&get).await {
            Ok(_) => {
                debug!(bucket, "bucket exists");
                return Ok(());
            }
            Err(e) if response_code(&e) == Some(NOT_FOUND) => {}
            Err(e) => return Err(e.into()),
        }

        info!(bucket, location, "bucket not found, creating");
        let insert = InsertBucketRequest {
            name: bucket.to_string(),
            param: InsertBucketParam {
                project: self.project_id.clone(),
                ..Default::default()
            },
            bucket: BucketCreationConfig {
                location: location.to_string(),
                ..Default::default()
            },
        };
        match self.client.insert_bucket(&insert).await {
            Ok(_) => Ok(()),
            // someone else created it between our check and our insert
            Err(e) if response_code(&e) == Some(CONFLICT) => {
                warn!(bucket, "bucket created concurrently, continuing");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn upload_new(&self, bucket: &str, name: &str, data: Vec<u8>) -> Result<()> {
        let request = UploadObjectRequest {
            bucket: bucket.to_string(),
            if_generation_match: Some(0),
            ..Default::default()
        };
        let upload_type = UploadType::Simple(Media::new(name.to_string()));

        match self.client.upload_object(&request, data, &upload_type).await {
            Ok(_) => Ok(()),
            Err(e) if response_code(&e) == Some(PRECONDITION_FAILED) => {
                Err(EtlError::ObjectExists {
                    bucket: bucket.to_string(),
                    name: name.to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, bucket: &str, name: &str) -> Result<bool> {
        let request = GetObjectRequest {
            bucket: bucket.to_string(),
            object: name.to_string(),
            ..Default::default()
        };
        match self.client.get_object(&request).await {
            Ok(_) => Ok(true),
            Err(e) if response_code(&e) == Some(NOT_FOUND) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
