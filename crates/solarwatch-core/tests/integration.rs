//! Integration tests for solarwatch-core.
//!
//! These drive a whole [`Dashboard`] against scripted APIs on a paused clock:
//! API → schedulers (with fallback) → buffers → view.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use solarwatch_core::fallback::{FALLBACK_FLUX, FALLBACK_TELEMETRY_SOURCE};
use solarwatch_core::{
    ApiError, ApiResult, Dashboard, DashboardConfig, FlareClass, FluxReading, FluxValue,
    ForecastApi, MetricsView, ModelMetrics, PredictionResponse, Scripted, TelemetrySnapshot,
    format_flux,
};

/// Every call fails with a transport error.
#[derive(Default)]
struct DownApi {
    calls: AtomicUsize,
}

#[async_trait]
impl ForecastApi for DownApi {
    async fn telemetry_snapshot(&self) -> ApiResult<TelemetrySnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ApiError::Transport("connection refused".into()))
    }

    async fn flux_reading(&self) -> ApiResult<FluxReading> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ApiError::Transport("connection refused".into()))
    }

    async fn predict(&self, _features: &[f64]) -> ApiResult<PredictionResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ApiError::Transport("connection refused".into()))
    }

    async fn model_metrics(&self) -> ApiResult<ModelMetrics> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ApiError::Transport("connection refused".into()))
    }
}

/// A healthy API with a quiet sun.
struct QuietApi;

#[async_trait]
impl ForecastApi for QuietApi {
    async fn telemetry_snapshot(&self) -> ApiResult<TelemetrySnapshot> {
        Ok(TelemetrySnapshot {
            live_events: Vec::new(),
            timestamp: "2024-03-01T12:00:00Z".into(),
            status: "success".into(),
            active_region_count: None,
            source: Some("NASA DONKI".into()),
            event_count: Some(0),
            message: None,
        })
    }

    async fn flux_reading(&self) -> ApiResult<FluxReading> {
        Ok(FluxReading {
            flux: FluxValue::Watts(0.000005),
            energy_band: "0.1-0.8nm".into(),
            timestamp: "2024-03-01T12:00:00Z".into(),
            source: "GOES-18".into(),
        })
    }

    async fn predict(&self, features: &[f64]) -> ApiResult<PredictionResponse> {
        assert_eq!(features.len(), 23);
        Ok(PredictionResponse {
            prediction: 0.75,
            confidence: solarwatch_core::Confidence::High,
            flare_class: "X-Class".into(),
            timestamp: "2024-03-01T12:00:00Z".into(),
            model_used: "rf".into(),
        })
    }

    async fn model_metrics(&self) -> ApiResult<ModelMetrics> {
        Ok(solarwatch_core::fallback::last_known_metrics())
    }
}

fn headless(api: Arc<dyn ForecastApi>, config: DashboardConfig) -> Dashboard {
    Dashboard::start_with(config, api, Box::new(Scripted::constant(0.5)), None)
}

#[tokio::test(start_paused = true)]
async fn unreachable_api_still_renders_everything() {
    let api = Arc::new(DownApi::default());
    let dash = headless(api.clone(), DashboardConfig::default());
    tokio::time::sleep(Duration::from_millis(5_500)).await;

    let view = dash.view();
    let telemetry = view.telemetry.as_ref().expect("telemetry fallback");
    assert_eq!(telemetry.source.as_deref(), Some(FALLBACK_TELEMETRY_SOURCE));
    assert_eq!(telemetry.region_count(), 2);

    assert_eq!(view.stream.len(), 6);
    assert!(view.stream.iter().all(|s| s.value == FALLBACK_FLUX));
    assert_eq!(view.flux_display().as_deref(), Some("B1.3"));

    match &view.metrics {
        MetricsView::Degraded { metrics, .. } => assert_eq!(metrics.features_used, 23),
        other => panic!("expected degraded metrics, got {other:?}"),
    }

    let record = dash.predict().await.expect("prediction");
    assert!(record.fallback);
    assert_eq!(record.probability, 0.5);
    assert_eq!(record.flare_class, FlareClass::M);

    dash.teardown();
    let calls = api.calls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(api.calls.load(Ordering::SeqCst), calls);
}

#[tokio::test(start_paused = true)]
async fn metrics_without_cache_are_unavailable() {
    let config = DashboardConfig {
        metrics_fallback: false,
        ..Default::default()
    };
    let dash = headless(Arc::new(DownApi::default()), config);
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(dash.view().metrics.is_unavailable());
    dash.teardown();
}

#[tokio::test(start_paused = true)]
async fn empty_snapshot_is_valid_state() {
    let dash = headless(Arc::new(QuietApi), DashboardConfig::default());
    tokio::time::sleep(Duration::from_millis(10)).await;

    let view = dash.view();
    let telemetry = view.telemetry.expect("snapshot");
    assert!(telemetry.live_events.is_empty());
    assert_eq!(telemetry.region_count(), 0);
    assert!(matches!(view.metrics, MetricsView::Ready { .. }));
    dash.teardown();
}

#[tokio::test(start_paused = true)]
async fn healthy_api_end_to_end() {
    let dash = headless(Arc::new(QuietApi), DashboardConfig::default());
    tokio::time::sleep(Duration::from_millis(2_500)).await;

    let view = dash.view();
    assert_eq!(view.stream.len(), 3);
    assert_eq!(view.flux_display().as_deref(), Some("B5.0"));
    assert_eq!(format_flux(0.000005), "B5.0");

    let record = dash.predict().await.expect("prediction");
    assert!(!record.fallback);
    assert_eq!(record.flare_class, FlareClass::X);
    assert_eq!(dash.view().latest_prediction(), Some(&record));
    dash.teardown();
}

#[tokio::test(start_paused = true)]
async fn snapshot_is_replaced_on_its_own_cadence() {
    let api = Arc::new(DownApi::default());
    let config = DashboardConfig {
        stream_interval: Duration::from_secs(3600),
        ..Default::default()
    };
    let dash = headless(api.clone(), config);
    // t = 0: one snapshot, one flux, one metrics call.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(api.calls.load(Ordering::SeqCst), 3);
    // t = 30: second snapshot.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(api.calls.load(Ordering::SeqCst), 4);
    dash.teardown();
}

/// Healthy except for the flux feed, which sends preformatted labels.
struct LabelFluxApi {
    label: &'static str,
}

#[async_trait]
impl ForecastApi for LabelFluxApi {
    async fn telemetry_snapshot(&self) -> ApiResult<TelemetrySnapshot> {
        QuietApi.telemetry_snapshot().await
    }

    async fn flux_reading(&self) -> ApiResult<FluxReading> {
        Ok(FluxReading {
            flux: FluxValue::Label(self.label.into()),
            energy_band: "0.1-0.8nm".into(),
            timestamp: "2024-03-01T12:00:00Z".into(),
            source: "GOES-18".into(),
        })
    }

    async fn predict(&self, features: &[f64]) -> ApiResult<PredictionResponse> {
        QuietApi.predict(features).await
    }

    async fn model_metrics(&self) -> ApiResult<ModelMetrics> {
        QuietApi.model_metrics().await
    }
}

#[tokio::test(start_paused = true)]
async fn label_flux_matches_numeric_fallback_scale() {
    let dash = headless(
        Arc::new(LabelFluxApi { label: "B1.3" }),
        DashboardConfig::default(),
    );
    tokio::time::sleep(Duration::from_millis(1_500)).await;

    let view = dash.view();
    assert_eq!(view.stream.len(), 2);
    for sample in &view.stream {
        assert!((sample.value - FALLBACK_FLUX).abs() < 1e-15);
    }
    assert_eq!(view.flux_display().as_deref(), Some("B1.3"));
    dash.teardown();
}

#[tokio::test(start_paused = true)]
async fn unparseable_flux_label_falls_back() {
    let dash = headless(
        Arc::new(LabelFluxApi { label: "N/A" }),
        DashboardConfig::default(),
    );
    tokio::time::sleep(Duration::from_millis(2_500)).await;

    let view = dash.view();
    assert_eq!(view.stream.len(), 3);
    assert!(view.stream.iter().all(|s| s.value == FALLBACK_FLUX));
    assert_eq!(view.flux_display().as_deref(), Some("B1.3"));
    dash.teardown();
}
