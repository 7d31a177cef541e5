// src/warehouse/mod.rs

pub mod bigquery;
pub mod schema;

use std::fmt;

use async_trait::async_trait;
use tracing::info;

use crate::{config::Config, error::Result};

pub use bigquery::BigQueryWarehouse;
pub use schema::{Column, ColumnType, MARATHON_EVENTS_SCHEMA};

/// Fully-qualified destination table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub project_id: String,
    pub dataset_id: String,
    pub table_id: String,
}

impl TableRef {
    pub fn new(project_id: &str, dataset_id: &str, table_id: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            dataset_id: dataset_id.to_string(),
            table_id: table_id.to_string(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project_id, self.dataset_id, self.table_id)
    }
}

#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Create the dataset unless it already exists.
    async fn ensure_dataset(&self, project_id: &str, dataset_id: &str, location: &str)
        -> Result<()>;

    /// Append newline-delimited JSON at `uri` to `destination` and wait for the job to finish.
    async fn load_ndjson(&self, uri: &str, destination: &TableRef, schema: &[Column]) -> Result<()>;
}

/// Load an uploaded `"<bucket>/<file>"` into the configured dataset.
/// `table` overrides the configured table name.
pub async fn load<W: Warehouse + ?Sized>(
    warehouse: &W,
    config: &Config,
    remote_location: &str,
    table: Option<&str>,
) -> Result<()> {
    let destination = TableRef::new(
        &config.project_id,
        &config.dataset,
        table.unwrap_or(&config.table),
    );

    warehouse
        .ensure_dataset(
            &destination.project_id,
            &destination.dataset_id,
            &config.dataset_location,
        )
        .await?;

    let uri = format!("gs://{}", remote_location);
    info!(uri = %uri, table = %destination, "starting load job");
    warehouse
        .load_ndjson(&uri, &destination, &MARATHON_EVENTS_SCHEMA)
        .await?;

    info!("Loaded {} into {}", uri, destination);
    Ok(())
}
