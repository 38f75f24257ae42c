//! Dashboard configuration.
//!
//! Every cadence and threshold the dashboard uses lives here so tests and the
//! CLI can override them with struct-update syntax:
//!
//! ```
//! use solarwatch_core::DashboardConfig;
//! use std::time::Duration;
//!
//! let config = DashboardConfig {
//!     stream_interval: Duration::from_millis(500),
//!     ..Default::default()
//! };
//! assert_eq!(config.history_capacity, 20);
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default forecasting API base URL.
pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000";

/// Timings, thresholds and endpoints for one dashboard instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Base URL of the forecasting API (no trailing slash required).
    pub api_base: String,
    /// Transport-level timeout applied to every request.
    #[serde(with = "secs")]
    pub request_timeout: Duration,
    /// Cadence of the telemetry snapshot poll.
    #[serde(with = "secs")]
    pub snapshot_interval: Duration,
    /// Cadence of the flux stream poll.
    #[serde(with = "secs")]
    pub stream_interval: Duration,
    /// How often the alert engine draws.
    #[serde(with = "secs")]
    pub alert_check_interval: Duration,
    /// How long an alert stays active.
    #[serde(with = "secs")]
    pub alert_duration: Duration,
    /// A draw strictly above this value raises the alert.
    pub alert_threshold: f64,
    /// Capacity of the flux stream and prediction history buffers.
    pub history_capacity: usize,
    /// Frame period of the surface animation loop.
    #[serde(with = "secs")]
    pub frame_interval: Duration,
    /// Whether last-known-good model metrics may stand in for a failed load.
    pub metrics_fallback: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout: Duration::from_secs(10),
            snapshot_interval: Duration::from_secs(30),
            stream_interval: Duration::from_secs(1),
            alert_check_interval: Duration::from_secs(15),
            alert_duration: Duration::from_secs(3),
            alert_threshold: 0.8,
            history_capacity: 20,
            frame_interval: Duration::from_millis(50),
            metrics_fallback: true,
        }
    }
}

impl DashboardConfig {
    /// Load a JSON config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

/// (De)serialize a `Duration` as fractional seconds.
mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
