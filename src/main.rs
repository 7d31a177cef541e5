use anyhow::Result;
use simple_el_tool::{storage::GcsStore, warehouse::BigQueryWarehouse, Config, Pipeline};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_target(false)
        .init();
    info!("startup");

    // ─── 2) configuration from the environment ───────────────────────
    let config = Config::from_env()?;
    info!(
        project = %config.project_id,
        bucket = %config.bucket,
        table = %config.table_id(),
        "configuration"
    );

    // ─── 3) cloud clients ────────────────────────────────────────────
    let store = GcsStore::new(config.project_id.clone()).await?;
    let warehouse = BigQueryWarehouse::new(Some(config.dataset_location.clone())).await?;

    // ─── 4) run ──────────────────────────────────────────────────────
    let pipeline = Pipeline::new(config, store, warehouse)?;
    if let Err(e) = pipeline.run().await {
        error!(run = %pipeline.stamp(), "run aborted: {}", e);
        return Err(e.into());
    }

    info!("all done");
    Ok(())
}
