//! Reference forecasting API server.
//!
//! Serves the four endpoints the dashboard polls, plus an index and a health
//! check. There is no trained model behind `/predict`: probabilities are drawn
//! uniformly and classified with the shared classifier. Telemetry and metrics
//! are the same educational data the dashboard falls back to.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use chrono::{SecondsFormat, Utc};
use log::{debug, info};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use solarwatch_core::api::paths;
use solarwatch_core::fallback::{FALLBACK_ENERGY_BAND, FALLBACK_FLUX};
use solarwatch_core::random::{self, RandomSource, SharedRandom};
use solarwatch_core::{
    FallbackGenerator, FluxReading, FluxValue, ModelMetrics, PredictRequest, PredictionResponse,
    TelemetrySnapshot,
};

/// Bounds of the simulated flux walk (B-class).
const FLUX_FLOOR: f64 = 5e-7;
const FLUX_CEILING: f64 = 9e-6;
/// Largest relative change per reading.
const FLUX_STEP: f64 = 0.05;

const DEMO_MODEL: &str = "Random Forest + Isolation Forest Ensemble (demo mode)";

/// Shared server state.
struct AppState {
    generator: FallbackGenerator,
    flux: Mutex<FluxWalk>,
}

/// Multiplicative random walk clamped to [`FLUX_FLOOR`, `FLUX_CEILING`].
struct FluxWalk {
    value: f64,
    rng: Box<dyn RandomSource>,
}

impl FluxWalk {
    fn step(&mut self) -> f64 {
        let factor = 1.0 + self.rng.uniform_in(-FLUX_STEP, FLUX_STEP);
        self.value = (self.value * factor).clamp(FLUX_FLOOR, FLUX_CEILING);
        self.value
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: String,
    components: Components,
    data_sources: [&'static str; 3],
}

#[derive(Serialize)]
struct Components {
    telemetry: &'static str,
    flux: &'static str,
    model: &'static str,
    api: &'static str,
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

async fn handle_index() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "Solarwatch Forecast API",
        "version": solarwatch_core::VERSION,
        "status": "active",
        "endpoints": {
            "/": "This API index",
            (paths::TELEMETRY_SNAPSHOT): "Recent flare events and active region count",
            (paths::FLUX_READING): "Latest X-ray flux reading",
            (paths::PREDICT): {
                "method": "POST",
                "description": "Flare probability for a feature vector",
                "body": { "features": "list of numbers (non-empty)" },
            },
            (paths::MODEL_METRICS): "Performance of the model behind /predict",
            "/health": "Health check",
        },
    }))
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "operational",
        version: solarwatch_core::VERSION,
        timestamp: now_iso(),
        components: Components {
            telemetry: "active",
            flux: "active",
            model: "demo_mode",
            api: "healthy",
        },
        data_sources: ["NASA DONKI", "NOAA GOES", "SDO/AIA"],
    })
}

async fn handle_telemetry(State(state): State<Arc<AppState>>) -> Json<TelemetrySnapshot> {
    Json(state.generator.telemetry_snapshot(Utc::now()))
}

async fn handle_flux(State(state): State<Arc<AppState>>) -> Json<FluxReading> {
    let watts = state.flux.lock().await.step();
    Json(FluxReading {
        flux: FluxValue::Watts(watts),
        energy_band: FALLBACK_ENERGY_BAND.to_string(),
        timestamp: now_iso(),
        source: "Simulated GOES feed".to_string(),
    })
}

async fn handle_predict(
    State(state): State<Arc<AppState>>,
    body: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictionResponse>, (StatusCode, Json<ErrorBody>)> {
    let Json(request) = body.map_err(|e| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorBody {
                detail: e.body_text(),
            }),
        )
    })?;
    if request.features.is_empty() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorBody {
                detail: "features must not be empty".to_string(),
            }),
        ));
    }

    let mut response = state.generator.prediction(Utc::now());
    response.model_used = DEMO_MODEL.to_string();
    debug!(
        "predict: {} features -> {:.3} ({})",
        request.features.len(),
        response.prediction,
        response.flare_class
    );
    Ok(Json(response))
}

async fn handle_metrics(State(state): State<Arc<AppState>>) -> Json<ModelMetrics> {
    Json(state.generator.model_metrics())
}

/// Build the axum router. `seed` fixes every random draw the server makes.
pub fn build_router(seed: Option<u64>) -> Router {
    let rng = SharedRandom::new(random::seeded(seed));
    let state = Arc::new(AppState {
        generator: FallbackGenerator::new(Box::new(rng.clone())),
        flux: Mutex::new(FluxWalk {
            value: FALLBACK_FLUX,
            rng: Box::new(rng),
        }),
    });

    Router::new()
        .route("/", get(handle_index))
        .route("/health", get(handle_health))
        .route(paths::TELEMETRY_SNAPSHOT, get(handle_telemetry))
        .route(paths::FLUX_READING, get(handle_flux))
        .route(paths::PREDICT, post(handle_predict))
        .route(paths::MODEL_METRICS, get(handle_metrics))
        .with_state(state)
}

/// Serve on an already-bound listener until the task is dropped.
pub async fn serve(listener: TcpListener, seed: Option<u64>) -> std::io::Result<()> {
    axum::serve(listener, build_router(seed)).await
}

/// Bind `host:port` and serve forever.
pub async fn run_server(host: &str, port: u16, seed: Option<u64>) -> std::io::Result<()> {
    let listener = TcpListener::bind((host, port)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    info!("serving forecast API on http://{addr}");
    serve(listener, seed).await
}
