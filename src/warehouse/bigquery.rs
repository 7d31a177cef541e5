// src/warehouse/bigquery.rs

use std::time::Duration;

use async_trait::async_trait;
use google_cloud_bigquery::{
    client::{Client, ClientConfig},
    http::{
        dataset::{Dataset, DatasetReference},
        error::Error,
        job::{
            get::GetJobRequest, CreateDisposition, Job, JobConfiguration, JobConfigurationLoad,
            JobReference, JobState, JobStatus, JobType, WriteDisposition,
        },
        table::{SourceFormat, TableReference},
    },
};
use tracing::{debug, info};
use uuid::Uuid;

use super::{schema::build_table_schema, Column, TableRef, Warehouse};
use crate::error::{EtlError, Result};

const CONFLICT: u16 = 409;
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// BigQuery, authenticated with application default credentials.
pub struct BigQueryWarehouse {
    client: Client,
    /// Location jobs run in; must match the dataset's.
    location: Option<String>,
}

impl BigQueryWarehouse {
    pub async fn new(location: Option<String>) -> Result<Self> {
        let (config, _project) = ClientConfig::new_with_auth()
            .await
            .map_err(|e| EtlError::Auth(Box::new(e)))?;
        let client = Client::new(config)
            .await
            .map_err(|e| EtlError::Auth(Box::new(e)))?;

        Ok(Self { client, location })
    }

    async fn wait_for(&self, project_id: &str, job_id: &str, mut status: JobStatus) -> Result<JobStatus> {
        let request = GetJobRequest {
            location: self.location.clone(),
        };
        // no overall timeout: the job either finishes or reports an error
        while !matches!(status.state, JobState::Done) {
            debug!(job_id, state = ?status.state, "waiting for load job");
            tokio::time::sleep(POLL_INTERVAL).await;
            status = self.client.job().get(project_id, job_id, &request).await?.status;
        }
        Ok(status)
    }
}

fn response_code(err: &Error) -> Option<u16> {
    match err {
        Error::Response(resp) => Some(resp.code),
        _ => None,
    }
}

#[async_trait]
impl Warehouse for BigQueryWarehouse {
    async fn ensure_dataset(
        &self,
        project_id: &str,
        dataset_id: &str,
        location: &str,
    ) -> Result<()> {
        let dataset = Dataset {
            dataset_reference: DatasetReference {
                project_id: project_id.to_string(),
                dataset_id: dataset_id.to_string(),
            },
            location: location.to_string(),
            ..Default::default()
        };

        match self.client.dataset().create(&dataset).await {
            Ok(_) => {
                info!(project_id, dataset_id, location, "created dataset");
                Ok(())
            }
            Err(e) if response_code(&e) == Some(CONFLICT) => {
                debug!(project_id, dataset_id, "dataset exists");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn load_ndjson(&self, uri: &str, destination: &TableRef, schema: &[Column]) -> Result<()> {
        let job_id = format!("simple_el_{}", Uuid::new_v4().simple());
        let job = Job {
            job_reference: JobReference {
                project_id: destination.project_id.clone(),
                job_id: job_id.clone(),
                location: self.location.clone(),
            },
            configuration: JobConfiguration {
                job: JobType::Load(JobConfigurationLoad {
                    source_uris: vec![uri.to_string()],
                    source_format: Some(SourceFormat::NewlineDelimitedJson),
                    destination_table: TableReference {
                        project_id: destination.project_id.clone(),
                        dataset_id: destination.dataset_id.clone(),
                        table_id: destination.table_id.clone(),
                    },
                    schema: Some(build_table_schema(schema)),
                    create_disposition: Some(CreateDisposition::CreateIfNeeded),
                    write_disposition: Some(WriteDisposition::WriteAppend),
                    ..Default::default()
                }),
                ..Default::default()
            },
            ..Default::default()
        };

        let created = self.client.job().create(&job).await?;
        info!(job_id = %job_id, "submitted load job");

        let status = self
            .wait_for(&destination.project_id, &job_id, created.status)
            .await?;

        if let Some(err) = status.error_result {
            return Err(EtlError::LoadJob {
                job_id,
                reason: err.reason.unwrap_or_default(),
                message: err.message.unwrap_or_default(),
            });
        }
        debug!(job_id = %job_id, "load job done");
        Ok(())
    }
}
