use serde::Deserialize;
use std::time::Duration;

use crate::endpoint::DEFAULT_URL;

// ------------------------------------------------------------
// Root configuration
// ------------------------------------------------------------
//
// Top-level configuration loaded from `config.json`.
//
// Every section is optional. An empty object (or a missing
// file) yields the stock run: 5 workers, 60 seconds each,
// against the BTCUSDT book ticker stream.
//
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    /// Feed endpoint and transport settings
    #[serde(default)]
    pub endpoint: EndpointConfig,

    /// Collection run parameters
    #[serde(default)]
    pub run: RunConfig,

    /// Where drained batches are written
    #[serde(default)]
    pub output: OutputConfig,

    /// Optional debug configuration
    pub debug: Option<DebugConfig>,
}

impl Config {
    /// Rejects configurations that cannot produce a run.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.run.workers == 0 {
            anyhow::bail!("run.workers must be at least 1");
        }

        self.run.budget()?;

        if let Some(idle) = self.run.idle_timeout_secs {
            if !idle.is_finite() || idle <= 0.0 {
                anyhow::bail!("run.idle_timeout_secs must be a positive number, got {}", idle);
            }
        }

        if self.endpoint.url.is_empty() {
            anyhow::bail!("endpoint.url must not be empty");
        }

        Ok(())
    }

    /// True when `debug.log` is set.
    pub fn debug_log(&self) -> bool {
        self.debug
            .as_ref()
            .map_or(false, |d| d.log.unwrap_or(false))
    }
}

// ------------------------------------------------------------
// Endpoint configuration
// ------------------------------------------------------------
//
// NOTE:
// `insecure_tls` disables server certificate verification.
// It exists for sandboxed environments with intercepting
// proxies and is off unless set explicitly.
//
#[derive(Debug, Deserialize, Clone)]
pub struct EndpointConfig {
    /// WebSocket URL of the feed (ws:// or wss://)
    #[serde(default = "default_url")]
    pub url: String,

    /// Skip TLS certificate verification
    #[serde(default)]
    pub insecure_tls: bool,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            insecure_tls: false,
        }
    }
}

fn default_url() -> String {
    DEFAULT_URL.to_string()
}

// ------------------------------------------------------------
// Run configuration
// ------------------------------------------------------------
#[derive(Debug, Deserialize, Clone)]
pub struct RunConfig {
    /// Collection budget per worker, in seconds
    #[serde(default = "default_duration_secs")]
    pub duration_secs: f64,

    /// Number of concurrent collectors
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Give up when no frame arrives for this long.
    ///
    /// Absent means wait for the next frame indefinitely.
    #[serde(default)]
    pub idle_timeout_secs: Option<f64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            duration_secs: default_duration_secs(),
            workers: default_workers(),
            idle_timeout_secs: None,
        }
    }
}

impl RunConfig {
    /// Collection budget at nanosecond resolution.
    pub fn budget(&self) -> anyhow::Result<Duration> {
        secs_to_duration(self.duration_secs)
    }

    pub fn idle_timeout(&self) -> anyhow::Result<Option<Duration>> {
        self.idle_timeout_secs.map(secs_to_duration).transpose()
    }
}

fn default_duration_secs() -> f64 {
    60.0
}

fn default_workers() -> usize {
    5
}

/// Converts fractional seconds into a `Duration`.
///
/// Fails on zero, negative, NaN and values too large to represent.
pub fn secs_to_duration(secs: f64) -> anyhow::Result<Duration> {
    if !secs.is_finite() || secs <= 0.0 {
        anyhow::bail!("duration must be a positive number of seconds, got {}", secs);
    }

    Duration::try_from_secs_f64(secs)
        .map_err(|e| anyhow::anyhow!("duration {}s out of range: {}", secs, e))
}

// ------------------------------------------------------------
// Output configuration
// ------------------------------------------------------------
#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    /// JSON file receiving every drained batch
    #[serde(default = "default_output_path")]
    pub path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
        }
    }
}

fn default_output_path() -> String {
    "batches.json".to_string()
}

// ------------------------------------------------------------
// Debug configuration
// ------------------------------------------------------------
#[derive(Debug, Deserialize, Clone)]
pub struct DebugConfig {
    /// Raises the default log filter to `debug`
    pub log: Option<bool>,
}
