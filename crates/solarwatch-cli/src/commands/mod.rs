pub mod metrics;
pub mod monitor;
pub mod predict;
pub mod server;
pub mod surface;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use solarwatch_core::{DashboardConfig, HttpForecastClient};

/// Connection options shared by every command that talks to the API.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ApiArgs {
    /// Forecasting API base URL (overrides the config file)
    #[arg(long)]
    pub api: Option<String>,

    /// JSON config file; missing fields take their defaults
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<f64>,

    /// Seed for local random draws (fallback predictions, alerts, features)
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Resolve the dashboard config: file first, then flags on top.
pub fn build_config(args: &ApiArgs) -> Result<DashboardConfig, String> {
    let mut config = match &args.config {
        Some(path) => DashboardConfig::load(path)
            .map_err(|e| format!("cannot read config {}: {e}", path.display()))?,
        None => DashboardConfig::default(),
    };
    if let Some(api) = &args.api {
        config.api_base = api.clone();
    }
    if let Some(secs) = args.timeout {
        config.request_timeout = parse_secs(secs, "--timeout")?;
    }
    Ok(config)
}

/// Seconds from a flag, rejecting negative and non-finite values.
pub fn parse_secs(secs: f64, flag: &str) -> Result<Duration, String> {
    Duration::try_from_secs_f64(secs).map_err(|_| format!("{flag}: invalid duration {secs}"))
}

/// Like [`build_config`], but exits on error.
pub fn config_or_exit(args: &ApiArgs) -> DashboardConfig {
    build_config(args).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    })
}

pub fn client_or_exit(config: &DashboardConfig) -> Arc<HttpForecastClient> {
    match HttpForecastClient::from_config(config) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

pub fn runtime_or_exit() -> tokio::runtime::Runtime {
    tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("Error: cannot start async runtime: {e}");
        std::process::exit(1);
    })
}
