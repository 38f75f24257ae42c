//! # solarwatch-core
//!
//! **A fail-open space-weather dashboard core.**
//!
//! `solarwatch-core` polls a forecasting API for telemetry snapshots, X-ray
//! flux readings, flare predictions and model metrics, and turns them into
//! renderable state. Every fetch that fails is replaced by a locally
//! generated value of the same shape, so the presentation layer always has
//! something to draw.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use solarwatch_core::{Dashboard, DashboardConfig, HttpForecastClient, random};
//!
//! # async fn demo() -> Result<(), solarwatch_core::ApiError> {
//! let config = DashboardConfig::default();
//! let client = HttpForecastClient::from_config(&config)?;
//! let dashboard = Dashboard::start(config, Arc::new(client), random::seeded(None));
//!
//! let view = dashboard.view();
//! println!("{} flux samples", view.stream.len());
//!
//! if let Some(record) = dashboard.predict().await {
//!     println!("{} -> {}", record.percent(), record.flare_class);
//! }
//! dashboard.teardown();
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ForecastApi → PollingScheduler (fallback on error) → buffers → DashboardView
//!
//! The pure parts ([`classify`], [`animation::render`], [`RingBuffer`],
//! [`AlertMachine`]) take no clock and no randomness; the tasks that drive
//! them take a [`RandomSource`] and run on tokio time, so tests can pause the
//! clock and script every draw.

pub mod alert;
pub mod animation;
pub mod api;
pub mod buffer;
pub mod classify;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod fallback;
pub mod metrics;
pub mod prediction;
pub mod random;
pub mod scheduler;

pub use alert::{AlertEngine, AlertMachine, AlertState, AlertStatus, Transition};
pub use animation::{
    ActiveRegion, AnimationLoop, CoreShade, FlareStroke, Halo, RegionFrame, SurfaceFrame,
    default_regions, render,
};
pub use api::{
    Event, FluxReading, FluxValue, ForecastApi, ModelMetrics, PredictRequest, PredictionResponse,
    TelemetrySnapshot, parse_timestamp,
};
pub use buffer::{RingBuffer, Sample};
pub use classify::{Confidence, FlareClass, FluxClass, format_flux};
pub use client::HttpForecastClient;
pub use config::DashboardConfig;
pub use dashboard::{Dashboard, DashboardView};
pub use error::{ApiError, ApiResult, ErrorKind};
pub use fallback::FallbackGenerator;
pub use metrics::{MetricsView, load_metrics};
pub use prediction::{FEATURE_NAMES, PredictionRecord, predict_once, random_features};
pub use random::{RandomSource, Scripted, SharedRandom};
pub use scheduler::{PollSource, PollingScheduler, Shutdown};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
