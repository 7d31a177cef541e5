//! In-process stand-ins for the HTTP API, the object store and the warehouse.

use std::{
    collections::{HashMap, HashSet},
    io,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
    sync::oneshot,
};
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::{fmt, fmt::MakeWriter, EnvFilter};
use url::Url;
use uuid::Uuid;

use crate::{
    error::{EtlError, Result},
    storage::ObjectStore,
    warehouse::{Column, ColumnType, TableRef, Warehouse, MARATHON_EVENTS_SCHEMA},
};

pub fn init_logging() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

/// Log lines written while a [`capture_logs`] guard is alive on this thread.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Route this thread's events into a buffer until the guard drops.
/// Works with `#[tokio::test]`, which runs everything on the test thread.
pub fn capture_logs() -> (LogCapture, DefaultGuard) {
    let capture = LogCapture::default();
    let subscriber = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_writer(capture.clone())
        .with_ansi(false)
        .finish();
    (capture, tracing::subscriber::set_default(subscriber))
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

/// Answer exactly one request with `status` and `body`.
/// The receiver yields the raw request head once the response is written.
pub async fn serve_once(status: u16, body: String) -> (Url, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut head = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            head.extend_from_slice(&chunk[..n]);
            if head.windows(4).any(|w| w == b"\r\n\r\n") {
                break;
            }
        }

        let response = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: text/csv; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            reason_phrase(status),
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
        let _ = tx.send(String::from_utf8_lossy(&head).into_owned());
    });

    (
        Url::parse(&format!("http://{}/data.csv", addr)).unwrap(),
        rx,
    )
}

/// Accept one connection and never answer.
pub async fn serve_silent() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (_socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
    });
    Url::parse(&format!("http://{}/data.csv", addr)).unwrap()
}

/// One row as the transform stage writes it, matching [`MARATHON_EVENTS_SCHEMA`].
pub fn marathon_line(id: u32) -> String {
    serde_json::json!({
        "id": id.to_string(),
        "event_name": format!("Marathon {}", id),
        "city": "Berlin",
        "country": "Germany",
        "event_date": "2024-09-29",
        "distance_km": "42",
        "participants": "45000",
        "organizer": "SCC Events",
        "website": "https://example.com",
        "upload_timestamp": 1_700_000_000,
    })
    .to_string()
}

/// CSV with the full marathon header and `rows` data rows.
pub fn marathon_csv(rows: u32) -> String {
    let header: Vec<&str> = MARATHON_EVENTS_SCHEMA
        .iter()
        .map(|c| c.name)
        .filter(|n| *n != "upload_timestamp")
        .collect();
    let mut csv = header.join(",");
    csv.push('\n');
    for id in 1..=rows {
        csv.push_str(&format!(
            "{id},Marathon {id},Berlin,Germany,2024-09-29,42,45000,SCC Events,https://example.com\n"
        ));
    }
    csv
}

#[derive(Default)]
pub struct MemoryStore {
    buckets: Mutex<HashMap<String, String>>,
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
}

impl MemoryStore {
    pub fn put(&self, bucket: &str, name: &str, data: impl Into<Vec<u8>>) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), name.to_string()), data.into());
    }

    pub fn object(&self, bucket: &str, name: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), name.to_string()))
            .cloned()
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn bucket_location(&self, bucket: &str) -> Option<String> {
        self.buckets.lock().unwrap().get(bucket).cloned()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn ensure_bucket(&self, bucket: &str, location: &str) -> Result<()> {
        self.buckets
            .lock()
            .unwrap()
            .entry(bucket.to_string())
            .or_insert_with(|| location.to_string());
        Ok(())
    }

    async fn upload_new(&self, bucket: &str, name: &str, data: Vec<u8>) -> Result<()> {
        let mut objects = self.objects.lock().unwrap();
        let key = (bucket.to_string(), name.to_string());
        if objects.contains_key(&key) {
            return Err(EtlError::ObjectExists {
                bucket: bucket.to_string(),
                name: name.to_string(),
            });
        }
        objects.insert(key, data);
        Ok(())
    }

    async fn exists(&self, bucket: &str, name: &str) -> Result<bool> {
        Ok(self.object(bucket, name).is_some())
    }
}

/// Loads from a [`MemoryStore`]; a job either appends every row or none.
pub struct MemoryWarehouse {
    store: Arc<MemoryStore>,
    datasets: Mutex<HashSet<(String, String)>>,
    tables: Mutex<HashMap<String, Vec<Map<String, Value>>>>,
}

impl MemoryWarehouse {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            datasets: Mutex::new(HashSet::new()),
            tables: Mutex::new(HashMap::new()),
        }
    }

    pub fn has_dataset(&self, project_id: &str, dataset_id: &str) -> bool {
        self.datasets
            .lock()
            .unwrap()
            .contains(&(project_id.to_string(), dataset_id.to_string()))
    }

    pub fn rows(&self, table: &str) -> Vec<Map<String, Value>> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }
}

fn accepts(ty: ColumnType, value: &Value) -> bool {
    match (ty, value) {
        (_, Value::Null) => true,
        (ColumnType::Integer, Value::Number(n)) => n.is_i64(),
        (ColumnType::Integer, Value::String(s)) => s.parse::<i64>().is_ok(),
        (ColumnType::String, Value::String(_)) => true,
        _ => false,
    }
}

#[async_trait]
impl Warehouse for MemoryWarehouse {
    async fn ensure_dataset(&self, project_id: &str, dataset_id: &str, _location: &str) -> Result<()> {
        self.datasets
            .lock()
            .unwrap()
            .insert((project_id.to_string(), dataset_id.to_string()));
        Ok(())
    }

    async fn load_ndjson(&self, uri: &str, destination: &TableRef, schema: &[Column]) -> Result<()> {
        let job_id = format!("memory_{}", Uuid::new_v4().simple());
        let fail = |reason: &str, message: String| EtlError::LoadJob {
            job_id: job_id.clone(),
            reason: reason.to_string(),
            message,
        };

        if !self.has_dataset(&destination.project_id, &destination.dataset_id) {
            return Err(fail("notFound", format!("Not found: Dataset {}", destination)));
        }

        let (bucket, name) = uri
            .strip_prefix("gs://")
            .and_then(|p| p.split_once('/'))
            .ok_or_else(|| fail("invalid", format!("bad source URI {}", uri)))?;
        let data = self
            .store
            .object(bucket, name)
            .ok_or_else(|| fail("notFound", format!("Not found: URI {}", uri)))?;
        let text = String::from_utf8(data).map_err(|e| fail("invalid", e.to_string()))?;

        let mut staged = Vec::new();
        for (i, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let row: Map<String, Value> = serde_json::from_str(line)
                .map_err(|e| fail("invalid", format!("line {}: {}", i + 1, e)))?;
            for (key, value) in &row {
                let column = schema
                    .iter()
                    .find(|c| c.name == key.as_str())
                    .ok_or_else(|| fail("invalid", format!("line {}: no such field: {}", i + 1, key)))?;
                if !accepts(column.ty, value) {
                    return Err(fail(
                        "invalid",
                        format!("line {}: bad value for {}: {}", i + 1, key, value),
                    ));
                }
            }
            staged.push(row);
        }

        self.tables
            .lock()
            .unwrap()
            .entry(destination.to_string())
            .or_default()
            .extend(staged);
        Ok(())
    }
}
