use std::path::PathBuf;

use anyhow::{Context, Result};
use env_logger::Env;

use candle_worker::app::bootstrap;
use candle_worker::config::{self, WorkerConfig};

const CONFIG_ENV: &str = "CANDLE_WORKER_CONFIG";

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = match std::env::var_os(CONFIG_ENV) {
        Some(path) => {
            let path = PathBuf::from(path);
            log::info!("Loading worker config from {}", path.display());
            config::load(&path).context("Failed to load worker configuration")?
        }
        None => WorkerConfig::builtin(),
    };

    bootstrap::run(config).await.context("Worker stopped")?;
    Ok(())
}
