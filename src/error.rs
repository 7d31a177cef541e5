use std::path::PathBuf;

/// Broad class of an HTTP failure, mirroring how the fetch stage reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// The server answered with a 4xx/5xx status.
    Status,
    /// The connection could not be established.
    Connect,
    /// The request exceeded its timeout.
    Timeout,
    /// Anything else reqwest can fail with (body decode, redirect loop, ...).
    Other,
}

impl TransportKind {
    pub fn of(err: &reqwest::Error) -> Self {
        if err.is_status() {
            TransportKind::Status
        } else if err.is_timeout() {
            TransportKind::Timeout
        } else if err.is_connect() {
            TransportKind::Connect
        } else {
            TransportKind::Other
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TransportKind::Status => "Http Error",
            TransportKind::Connect => "Error Connecting",
            TransportKind::Timeout => "Timeout Error",
            TransportKind::Other => "Something Else",
        }
    }
}

/// Every way a pipeline run can fail. The underlying error is kept as the source.
#[derive(Debug, thiserror::Error)]
pub enum EtlError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("authenticating cloud client: {0}")]
    Auth(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("object storage error: {0}")]
    Storage(#[from] google_cloud_storage::http::Error),

    #[error("object gs://{bucket}/{name} already exists")]
    ObjectExists { bucket: String, name: String },

    #[error("warehouse error: {0}")]
    Warehouse(#[from] google_cloud_bigquery::http::error::Error),

    #[error("load job {job_id} failed: {reason}: {message}")]
    LoadJob {
        job_id: String,
        reason: String,
        message: String,
    },

    #[error("{} has no file name", .0.display())]
    NoFileName(PathBuf),
}

impl EtlError {
    /// Transport classification for HTTP failures, `None` for everything else.
    pub fn transport_kind(&self) -> Option<TransportKind> {
        match self {
            EtlError::Http(e) => Some(TransportKind::of(e)),
            _ => None,
        }
    }

    /// HTTP status carried by the failure, if any.
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            EtlError::Http(e) => e.status(),
            _ => None,
        }
    }
}

pub type Result<T, E = EtlError> = std::result::Result<T, E>;
