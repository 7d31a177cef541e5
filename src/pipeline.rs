// src/pipeline.rs

use std::{
    fmt,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use tracing::{error, info};
use url::Url;

use crate::{
    config::Config,
    error::Result,
    fetch::Extractor,
    storage::{self, ObjectStore},
    transform,
    warehouse::{self, Warehouse},
};

/// UTC run identifier at second resolution (`YYYYMMDDHHMMSS`).
///
/// Two runs started within the same second share a stamp, and therefore a file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStamp(String);

impl RunStamp {
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(at.format("%Y%m%d%H%M%S").to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the file a run writes and uploads.
    pub fn file_name(&self) -> String {
        format!("{}.json", self.0)
    }
}

impl fmt::Display for RunStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Log a failed stage and hand the error back untouched.
fn stage<T>(name: &'static str, res: Result<T>) -> Result<T> {
    if let Err(e) = &res {
        error!(stage = name, "{} failed: {}", name, e);
    }
    res
}

/// One extract → transform → upload → clean → load run.
pub struct Pipeline<S, W> {
    config: Config,
    stamp: RunStamp,
    extractor: Extractor,
    store: S,
    warehouse: W,
}

impl<S: ObjectStore, W: Warehouse> Pipeline<S, W> {
    /// Captures the run stamp and opens the HTTP session.
    pub fn new(config: Config, store: S, warehouse: W) -> Result<Self> {
        let extractor = Extractor::new(&config)?;
        Ok(Self {
            config,
            stamp: RunStamp::now(),
            extractor,
            store,
            warehouse,
        })
    }

    pub fn with_stamp(mut self, stamp: RunStamp) -> Self {
        self.stamp = stamp;
        self
    }

    pub fn stamp(&self) -> &RunStamp {
        &self.stamp
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn warehouse(&self) -> &W {
        &self.warehouse
    }

    pub async fn extract(&self, url: Option<&Url>) -> Result<String> {
        self.extractor.fetch(url).await
    }

    pub fn transform(&self, text: &str) -> Result<PathBuf> {
        transform::csv_to_ndjson(text, &self.config.work_dir, &self.stamp)
    }

    pub async fn upload(&self, path: &Path) -> Result<String> {
        storage::upload_file(
            &self.store,
            &self.config.bucket,
            &self.config.bucket_location,
            path,
        )
        .await
    }

    pub fn clean(&self, path: &Path) -> Result<()> {
        storage::clean(path)
    }

    pub async fn load(&self, remote_location: &str, table: Option<&str>) -> Result<()> {
        warehouse::load(&self.warehouse, &self.config, remote_location, table).await
    }

    /// Run every stage in order. The first failure aborts the run; nothing is rolled back.
    pub async fn run(&self) -> Result<()> {
        info!(run = %self.stamp, url = %self.config.url, "starting run");

        let text = stage("extract", self.extract(None).await)?;
        let path = stage("transform", self.transform(&text))?;
        let remote = stage("upload", self.upload(&path).await)?;
        stage("clean", self.clean(&path))?;
        stage("load", self.load(&remote, None).await)?;

        info!(run = %self.stamp, table = %self.config.table_id(), "run finished");
        Ok(())
    }
}
