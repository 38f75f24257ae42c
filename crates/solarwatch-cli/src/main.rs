//! CLI for solarwatch: live flux stream, flare forecasts and an animated solar
//! surface in your terminal.

mod commands;
mod tui;

use clap::{Parser, Subcommand};

use commands::ApiArgs;

#[derive(Parser)]
#[command(name = "solarwatch")]
#[command(about = "solarwatch: space-weather dashboard for the terminal")]
#[command(version = solarwatch_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full-screen live dashboard: surface, flux stream, predictions, alerts.
    /// Keys: p predict, q/Esc quit.
    Monitor {
        #[command(flatten)]
        api: ApiArgs,

        /// Telemetry snapshot poll interval in seconds
        #[arg(long)]
        snapshot_interval: Option<f64>,

        /// Flux stream poll interval in seconds
        #[arg(long)]
        stream_interval: Option<f64>,
    },

    /// Headless: print each flux sample and alert transition until Ctrl+C
    Watch {
        #[command(flatten)]
        api: ApiArgs,

        /// Stop after this many seconds
        #[arg(long)]
        duration: Option<f64>,

        /// Flux stream poll interval in seconds
        #[arg(long)]
        stream_interval: Option<f64>,
    },

    /// Request one flare prediction (falls back to a local draw on failure)
    Predict {
        #[command(flatten)]
        api: ApiArgs,

        /// Print the record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Load model performance metrics. Exits 1 if none are available.
    Metrics {
        #[command(flatten)]
        api: ApiArgs,

        /// Print the metrics view as JSON
        #[arg(long)]
        json: bool,

        /// Do not substitute last-known-good metrics on failure
        #[arg(long)]
        no_fallback: bool,
    },

    /// Print the animated surface frame at a given time as JSON
    Surface {
        /// Elapsed time in seconds
        #[arg(long, default_value = "0")]
        at: f64,
    },

    /// Run the reference forecasting API server
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "8000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Seed for every random draw the server makes
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() {
    let cli = Cli::parse();

    // Log lines would tear the alternate screen, so the TUI stays quiet
    // unless RUST_LOG asks otherwise.
    let default_filter = match cli.command {
        Commands::Monitor { .. } => "off",
        _ => "info",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match cli.command {
        Commands::Monitor {
            api,
            snapshot_interval,
            stream_interval,
        } => commands::monitor::run(&api, snapshot_interval, stream_interval),
        Commands::Watch {
            api,
            duration,
            stream_interval,
        } => commands::watch::run(&api, duration, stream_interval),
        Commands::Predict { api, json } => commands::predict::run(&api, json),
        Commands::Metrics {
            api,
            json,
            no_fallback,
        } => commands::metrics::run(&api, json, no_fallback),
        Commands::Surface { at } => commands::surface::run(at),
        Commands::Serve { port, host, seed } => commands::server::run(&host, port, seed),
    }
}
