// ------------------------------------------------------------
// Module declarations
// ------------------------------------------------------------
//
// - config:    Configuration structs loaded from JSON
// - schema:    Frame, timed record and batch types
// - util:      Time helpers
// - endpoint:  Feed URL and WebSocket / TLS connection setup
// - sink:      Output channel seam and the consumer-side drain
// - collector: Timed collection loop and worker fan-out
// - metrics:   Process-wide run counters
//
mod config;
mod schema;
mod util;
mod endpoint;
mod sink;
mod collector;
mod metrics;

use std::path::Path;
use std::fs;

use anyhow::Context;
use log::{info, warn};
use rustls::crypto::{CryptoProvider, ring};
use tokio::sync::mpsc;

use collector::runner::spawn_workers;
use config::Config;
use metrics::METRICS;
use sink::{drain_batches, write_batches};

// ------------------------------------------------------------
// Application entry point
// ------------------------------------------------------------
//
// Responsibilities:
// - Initialize cryptography backend (rustls)
// - Load configuration
// - Spawn the collectors
// - Drain every posted batch and write them to disk
//
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // rustls >= 0.23 requires an explicit CryptoProvider when
    // more than one backend is compiled in. Install once, early.
    CryptoProvider::install_default(ring::default_provider())
        .map_err(|_| anyhow::anyhow!("failed to install rustls CryptoProvider"))?;

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.json".to_string());
    let config = load_config(&config_path)?;

    init_logging(config.debug_log());

    if !Path::new(&config_path).exists() {
        warn!("{} not found, using defaults", config_path);
    }

    info!(
        "collecting {} for {}s with {} workers",
        config.endpoint.url, config.run.duration_secs, config.run.workers
    );

    // --------------------------------------------------------
    // Fan out
    //
    // Every worker holds a clone of the same sender. The drain
    // ends once the last worker has finished and dropped it.
    // --------------------------------------------------------
    let (tx, rx) = mpsc::unbounded_channel();
    let mut workers = spawn_workers(&config, tx)?;

    let drain = tokio::spawn(drain_batches(rx));

    while let Some(res) = workers.join_next().await {
        if let Err(e) = res {
            warn!("worker task aborted: {}", e);
        }
    }

    let batches = drain.await?;

    write_batches(&config.output.path, &batches)?;
    info!("{} batches saved to {}", batches.len(), config.output.path);
    info!("{}", METRICS.summary());

    Ok(())
}

// ------------------------------------------------------------
// Logging
// ------------------------------------------------------------
//
// Default filter is `info` (`debug` with `debug.log`).
// RUST_LOG always wins.
//
fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

// ------------------------------------------------------------
// Configuration loader
// ------------------------------------------------------------
//
// Reads a JSON configuration file and validates it.
// A missing file is not an error: every field has a default.
//
fn load_config(path: &str) -> anyhow::Result<Config> {
    let cfg: Config = if Path::new(path).exists() {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path))?;
        serde_json::from_str(&data)
            .with_context(|| format!("invalid config {}", path))?
    } else {
        Config::default()
    };

    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_file_means_defaults() {
        let cfg = load_config("/nonexistent/config.json").unwrap();
        assert_eq!(cfg.run.workers, 5);
        assert_eq!(cfg.endpoint.url, endpoint::DEFAULT_URL);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let path = std::env::temp_dir().join(format!("collector-cfg-{}.json", std::process::id()));
        fs::write(&path, r#"{ "run": { "workers": 0 } }"#).unwrap();

        assert!(load_config(path.to_str().unwrap()).is_err());

        let _ = fs::remove_file(&path);
    }
}
