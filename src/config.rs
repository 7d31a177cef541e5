// src/config.rs

use std::{path::PathBuf, time::Duration};

use tracing::{info, warn};
use url::Url;

use crate::error::{EtlError, Result};

pub const DEFAULT_URL: &str = "https://my.api.mockaroo.com/marathons_events.json";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

pub const BUCKET_NAME: &str = "simple-el-tool-raw";
pub const BUCKET_LOCATION: &str = "EU";

pub const DATASET: &str = "raw";
pub const DATASET_LOCATION: &str = "EU";
pub const DEFAULT_TABLE: &str = "mockaroo";

pub const API_KEY_VAR: &str = "MOCKAROO_API_KEY";
pub const PROJECT_VAR: &str = "GOOGLE_CLOUD_PROJECT";

/// Everything a run needs to know about the outside world.
#[derive(Debug, Clone)]
pub struct Config {
    pub url: Url,
    pub api_key: Option<String>,
    pub project_id: String,
    pub bucket: String,
    pub bucket_location: String,
    pub dataset: String,
    pub dataset_location: String,
    pub table: String,
    pub request_timeout: Duration,
    /// Directory the transient `<stamp>.json` file is written to.
    pub work_dir: PathBuf,
}

impl Config {
    /// Hard-coded defaults for everything except the project and API key.
    pub fn new(project_id: impl Into<String>, api_key: Option<String>) -> Result<Self> {
        let url = Url::parse(DEFAULT_URL)
            .map_err(|e| EtlError::Config(format!("parsing default URL {}: {}", DEFAULT_URL, e)))?;

        Ok(Self {
            url,
            api_key,
            project_id: project_id.into(),
            bucket: BUCKET_NAME.to_string(),
            bucket_location: BUCKET_LOCATION.to_string(),
            dataset: DATASET.to_string(),
            dataset_location: DATASET_LOCATION.to_string(),
            table: DEFAULT_TABLE.to_string(),
            request_timeout: REQUEST_TIMEOUT,
            work_dir: PathBuf::from("."),
        })
    }

    /// Reads `MOCKAROO_API_KEY` and `GOOGLE_CLOUD_PROJECT`, loading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            info!(path = %path.display(), "loaded .env");
        }

        let project_id = std::env::var(PROJECT_VAR)
            .map_err(|_| EtlError::Config(format!("Please set env var {}", PROJECT_VAR)))?;

        let api_key = std::env::var(API_KEY_VAR).ok();
        if api_key.is_none() {
            warn!("{} not set, requests will carry no API key", API_KEY_VAR);
        }

        Self::new(project_id, api_key)
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    pub fn with_url(mut self, url: Url) -> Self {
        self.url = url;
        self
    }

    /// `project.dataset.table` as the warehouse expects it.
    pub fn table_id(&self) -> String {
        format!("{}.{}.{}", self.project_id, self.dataset, self.table)
    }
}
