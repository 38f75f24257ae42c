//! Wires the components into one running dashboard.
//!
//! ```text
//!   ForecastApi ──► PollingScheduler (30 s) ──► TelemetrySnapshot (replace)
//!               ──► PollingScheduler (1 s)  ──► RingBuffer<Sample> (append)
//!               ──► predict() on demand     ──► RingBuffer<PredictionRecord>
//!               ──► load_metrics() once     ──► MetricsView
//!   RandomSource ──► AlertEngine (15 s)     ──► AlertStatus
//!   clock        ──► AnimationLoop          ──► SurfaceFrame
//! ```
//!
//! Each piece of state sits behind its own mutex and has exactly one writer.
//! Readers take a [`DashboardView`] which copies everything out in one call.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::alert::{AlertEngine, AlertStatus};
use crate::animation::{ActiveRegion, AnimationLoop, SurfaceFrame, default_regions};
use crate::api::{FluxReading, ForecastApi, TelemetrySnapshot, parse_timestamp};
use crate::buffer::{RingBuffer, Sample};
use crate::config::DashboardConfig;
use crate::error::ApiResult;
use crate::fallback::FallbackGenerator;
use crate::metrics::{MetricsView, load_metrics};
use crate::prediction::{
    PredictionHistory, PredictionRecord, history_samples, predict_once, random_features,
};
use crate::random::{RandomSource, SharedRandom};
use crate::scheduler::{PollSource, PollingScheduler, Shutdown};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

// ---------------------------------------------------------------------------
// Poll sources
// ---------------------------------------------------------------------------

struct SnapshotPoll {
    api: Arc<dyn ForecastApi>,
    fallback: Arc<FallbackGenerator>,
}

#[async_trait]
impl PollSource for SnapshotPoll {
    type Output = TelemetrySnapshot;

    fn name(&self) -> &'static str {
        "telemetry"
    }

    async fn fetch(&self) -> ApiResult<TelemetrySnapshot> {
        self.api.telemetry_snapshot().await
    }

    fn fallback(&self) -> TelemetrySnapshot {
        self.fallback.telemetry_snapshot(Utc::now())
    }
}

struct FluxPoll {
    api: Arc<dyn ForecastApi>,
    fallback: Arc<FallbackGenerator>,
}

#[async_trait]
impl PollSource for FluxPoll {
    type Output = FluxReading;

    fn name(&self) -> &'static str {
        "flux"
    }

    /// Readings are validated here too, so every [`ForecastApi`] feeds the
    /// stream a parseable flux.
    async fn fetch(&self) -> ApiResult<FluxReading> {
        self.api.flux_reading().await?.validate()
    }

    fn fallback(&self) -> FluxReading {
        self.fallback.flux_reading(Utc::now())
    }
}

/// Flux stream history plus the reading that produced the newest sample.
#[derive(Debug)]
struct StreamState {
    samples: RingBuffer<Sample>,
    latest: Option<FluxReading>,
}

impl StreamState {
    fn push(&mut self, reading: FluxReading) {
        if let Some(watts) = reading.flux.watts() {
            let at = parse_timestamp(&reading.timestamp).unwrap_or_else(Utc::now);
            self.samples.append(Sample::new(watts, at));
        }
        self.latest = Some(reading);
    }
}

// ---------------------------------------------------------------------------
// DashboardView
// ---------------------------------------------------------------------------

/// Everything the presentation layer needs, captured at one point in time.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    /// `None` until the first snapshot poll completes.
    pub telemetry: Option<TelemetrySnapshot>,
    /// Flux samples, oldest first.
    pub stream: Vec<Sample>,
    pub latest_flux: Option<FluxReading>,
    /// Prediction history, oldest first.
    pub predictions: Vec<PredictionRecord>,
    pub alert: AlertStatus,
    pub metrics: MetricsView,
    #[serde(skip)]
    pub surface: Option<SurfaceFrame>,
    pub predicting: bool,
}

impl DashboardView {
    /// Display string of the newest flux reading, e.g. `"B1.3"`.
    pub fn flux_display(&self) -> Option<String> {
        self.latest_flux.as_ref().map(FluxReading::display)
    }

    pub fn latest_prediction(&self) -> Option<&PredictionRecord> {
        self.predictions.last()
    }
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

/// Resets the single-flight flag even if the predict future is dropped.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A running dashboard. Dropping it tears everything down.
pub struct Dashboard {
    api: Arc<dyn ForecastApi>,
    fallback: Arc<FallbackGenerator>,
    rng: SharedRandom,
    shutdown: Shutdown,

    telemetry: Arc<Mutex<Option<TelemetrySnapshot>>>,
    stream: Arc<Mutex<StreamState>>,
    predictions: Mutex<PredictionHistory>,
    metrics: Arc<Mutex<MetricsView>>,
    predicting: AtomicBool,
    flux_updates: watch::Receiver<u64>,

    snapshot_poll: PollingScheduler,
    flux_poll: PollingScheduler,
    alert: AlertEngine,
    animation: Option<AnimationLoop>,
    metrics_task: JoinHandle<()>,
}

impl Dashboard {
    /// Start every component, including the surface animation.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        config: DashboardConfig,
        api: Arc<dyn ForecastApi>,
        rng: Box<dyn RandomSource>,
    ) -> Self {
        Self::start_with(config, api, rng, Some(default_regions()))
    }

    /// Start every component; the animation loop only runs when `regions` is
    /// given.
    pub fn start_with(
        config: DashboardConfig,
        api: Arc<dyn ForecastApi>,
        rng: Box<dyn RandomSource>,
        regions: Option<Vec<ActiveRegion>>,
    ) -> Self {
        info!("dashboard: starting against {}", config.api_base);
        let rng = SharedRandom::new(rng);
        let fallback = Arc::new(FallbackGenerator::new(Box::new(rng.clone())));
        let shutdown = Shutdown::new();

        let telemetry = Arc::new(Mutex::new(None));
        let snapshot_poll = {
            let telemetry = Arc::clone(&telemetry);
            PollingScheduler::spawn(
                SnapshotPoll {
                    api: Arc::clone(&api),
                    fallback: Arc::clone(&fallback),
                },
                config.snapshot_interval,
                move |snapshot| *lock(&telemetry) = Some(snapshot),
            )
        };

        let stream = Arc::new(Mutex::new(StreamState {
            samples: RingBuffer::new(config.history_capacity),
            latest: None,
        }));
        let (updates_tx, flux_updates) = watch::channel(0u64);
        let flux_poll = {
            let stream = Arc::clone(&stream);
            PollingScheduler::spawn(
                FluxPoll {
                    api: Arc::clone(&api),
                    fallback: Arc::clone(&fallback),
                },
                config.stream_interval,
                move |reading| {
                    lock(&stream).push(reading);
                    updates_tx.send_modify(|n| *n += 1);
                },
            )
        };

        let alert = AlertEngine::spawn(&config, Box::new(rng.clone()));
        let animation = regions.map(|r| AnimationLoop::spawn(r, config.frame_interval));

        let metrics = Arc::new(Mutex::new(MetricsView::Loading));
        let metrics_task = {
            let api = Arc::clone(&api);
            let metrics = Arc::clone(&metrics);
            let token = shutdown.clone();
            let allow_fallback = config.metrics_fallback;
            tokio::spawn(async move {
                let view = tokio::select! {
                    biased;
                    _ = token.cancelled() => return,
                    view = load_metrics(api.as_ref(), allow_fallback) => view,
                };
                if !token.is_triggered() {
                    *lock(&metrics) = view;
                }
            })
        };

        Self {
            predictions: Mutex::new(PredictionHistory::new(config.history_capacity)),
            api,
            fallback,
            rng,
            shutdown,
            telemetry,
            stream,
            metrics,
            predicting: AtomicBool::new(false),
            flux_updates,
            snapshot_poll,
            flux_poll,
            alert,
            animation,
            metrics_task,
        }
    }

    /// Copy out the current presentation state.
    pub fn view(&self) -> DashboardView {
        let telemetry = lock(&self.telemetry).clone();
        let (stream, latest_flux) = {
            let s = lock(&self.stream);
            (s.samples.snapshot(), s.latest.clone())
        };
        DashboardView {
            telemetry,
            stream,
            latest_flux,
            predictions: lock(&self.predictions).snapshot(),
            alert: self.alert.status(),
            metrics: lock(&self.metrics).clone(),
            surface: self.animation.as_ref().map(AnimationLoop::frame),
            predicting: self.predicting.load(Ordering::Acquire),
        }
    }

    /// Probabilities of the last `k` predictions, oldest first.
    pub fn prediction_samples(&self, k: usize) -> Vec<Sample> {
        history_samples(&lock(&self.predictions), k)
    }

    /// Run the one-shot prediction action and record the result.
    ///
    /// Returns `None` without doing anything if a prediction is already in
    /// flight or the dashboard has been torn down.
    pub async fn predict(&self) -> Option<PredictionRecord> {
        if self.shutdown.is_triggered()
            || self
                .predicting
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
        {
            return None;
        }
        let _guard = InFlight(&self.predicting);

        let features = {
            let mut rng = self.rng.clone();
            random_features(&mut rng)
        };
        let record = predict_once(self.api.as_ref(), &self.fallback, &features).await;
        if self.shutdown.is_triggered() {
            return None;
        }
        debug!(
            "predict: {} ({}){}",
            record.percent(),
            record.flare_class,
            if record.fallback { " [local]" } else { "" }
        );
        lock(&self.predictions).append(record.clone());
        Some(record)
    }

    /// Bumped once per flux stream update.
    pub fn flux_updates(&self) -> watch::Receiver<u64> {
        self.flux_updates.clone()
    }

    pub fn alert_updates(&self) -> watch::Receiver<AlertStatus> {
        self.alert.subscribe()
    }

    /// Stop every component. Idempotent.
    pub fn teardown(&self) {
        if !self.shutdown.is_triggered() {
            info!("dashboard: teardown");
        }
        self.shutdown.trigger();
        self.snapshot_poll.teardown();
        self.flux_poll.teardown();
        self.alert.teardown();
        if let Some(animation) = &self.animation {
            animation.stop();
        }
    }

    pub fn is_torn_down(&self) -> bool {
        self.shutdown.is_triggered()
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.teardown();
        self.metrics_task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{FluxValue, ModelMetrics, PredictionResponse};
    use crate::classify::{Confidence, FlareClass};
    use crate::error::ApiError;
    use crate::random::Scripted;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    /// Answers every flux poll with an increasing reading; fails the rest.
    #[derive(Default)]
    struct CountingApi {
        flux_calls: AtomicUsize,
        predict_delay: Duration,
    }

    #[async_trait]
    impl ForecastApi for CountingApi {
        async fn telemetry_snapshot(&self) -> ApiResult<TelemetrySnapshot> {
            Err(ApiError::Status(503))
        }

        async fn flux_reading(&self) -> ApiResult<FluxReading> {
            let n = self.flux_calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(FluxReading {
                flux: FluxValue::Watts(n as f64 * 1e-6),
                energy_band: "0.1-0.8nm".into(),
                timestamp: "2024-03-01T12:00:00Z".into(),
                source: "test".into(),
            })
        }

        async fn predict(&self, _features: &[f64]) -> ApiResult<PredictionResponse> {
            tokio::time::sleep(self.predict_delay).await;
            Ok(PredictionResponse {
                prediction: 0.75,
                confidence: Confidence::High,
                flare_class: "X-Class".into(),
                timestamp: "2024-03-01T12:00:00Z".into(),
                model_used: "test".into(),
            })
        }

        async fn model_metrics(&self) -> ApiResult<ModelMetrics> {
            Err(ApiError::Timeout(Duration::from_secs(10)))
        }
    }

    fn start(api: CountingApi) -> Dashboard {
        Dashboard::start_with(
            DashboardConfig::default(),
            Arc::new(api),
            Box::new(Scripted::constant(0.5)),
            None,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn stream_buffer_caps_at_capacity() {
        let dash = start(CountingApi::default());
        tokio::time::sleep(Duration::from_millis(24_500)).await;

        let view = dash.view();
        assert_eq!(view.stream.len(), 20);
        // 25 polls so far (t = 0..=24); the buffer keeps polls 6..=25.
        assert!((view.stream[0].value - 6e-6).abs() < 1e-15);
        assert!((view.stream[19].value - 25e-6).abs() < 1e-15);
        assert_eq!(view.flux_display().as_deref(), Some("C25.0"));
        assert_eq!(*dash.flux_updates().borrow(), 25);
        dash.teardown();
    }

    #[tokio::test(start_paused = true)]
    async fn failed_snapshot_and_metrics_fall_back() {
        let dash = start(CountingApi::default());
        tokio::time::sleep(Duration::from_millis(100)).await;

        let view = dash.view();
        let telemetry = view.telemetry.expect("fallback snapshot");
        assert_eq!(telemetry.live_events.len(), 2);
        assert!(matches!(view.metrics, MetricsView::Degraded { .. }));
        dash.teardown();
    }

    #[tokio::test(start_paused = true)]
    async fn predict_records_and_is_single_flight() {
        let dash = Arc::new(start(CountingApi {
            predict_delay: Duration::from_secs(2),
            ..Default::default()
        }));

        let first = {
            let dash = Arc::clone(&dash);
            tokio::spawn(async move { dash.predict().await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(dash.view().predicting);
        assert!(dash.predict().await.is_none());

        let record = first.await.unwrap().expect("first prediction");
        assert_eq!(record.flare_class, FlareClass::X);
        assert!(!dash.view().predicting);
        assert_eq!(dash.view().predictions.len(), 1);

        assert!(dash.predict().await.is_some());
        assert_eq!(dash.view().predictions.len(), 2);
        dash.teardown();
    }

    #[tokio::test(start_paused = true)]
    async fn chart_samples_are_the_newest_predictions() {
        let dash = start(CountingApi::default());
        assert!(dash.prediction_samples(10).is_empty());
        for _ in 0..12 {
            assert!(dash.predict().await.is_some());
        }
        assert_eq!(dash.view().predictions.len(), 12);

        let samples = dash.prediction_samples(10);
        assert_eq!(samples.len(), 10);
        assert!(samples.iter().all(|s| s.value == 0.75));
        assert_eq!(dash.prediction_samples(3).len(), 3);
        dash.teardown();
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_is_idempotent_and_freezes_state() {
        let dash = start(CountingApi::default());
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        dash.teardown();
        dash.teardown();
        assert!(dash.is_torn_down());
        let before = dash.view().stream.len();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(dash.view().stream.len(), before);
        assert!(dash.predict().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn animation_runs_when_regions_given() {
        let dash = Dashboard::start(
            DashboardConfig::default(),
            Arc::new(CountingApi::default()),
            Box::new(Scripted::constant(0.5)),
        );
        tokio::time::sleep(Duration::from_millis(200)).await;
        let frame = dash.view().surface.expect("surface frame");
        assert_eq!(frame.regions.len(), 4);
        assert!(frame.t > 0.0);
        dash.teardown();
    }
}
