//! Forecasting API wire shapes and the [`ForecastApi`] seam.
//!
//! The API is an opaque oracle. These types document what it returns; the
//! legacy snake_case names emitted by older backends are accepted as aliases.
//! Every response is checked with `validate()` after decoding so that
//! out-of-range values surface as [`ApiError::Schema`].

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::{Confidence, FLUX_SUFFIX_SCALE, FluxClass, format_flux};
use crate::error::{ApiError, ApiResult};

/// Endpoint paths, relative to the API base URL.
pub mod paths {
    pub const TELEMETRY_SNAPSHOT: &str = "/telemetry-snapshot";
    pub const FLUX_READING: &str = "/flux-reading";
    pub const PREDICT: &str = "/predict";
    pub const MODEL_METRICS: &str = "/model-metrics";
}

/// Parse the timestamp formats seen in the wild: RFC 3339, naive ISO-8601
/// (assumed UTC) and `YYYY-MM-DD HH:MM:SS`.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    let normalized = raw.replacen(' ', "T", 1);
    let normalized = normalized.trim_end_matches('Z');
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(normalized, fmt).ok())
        .map(|naive| naive.and_utc())
}

// ---------------------------------------------------------------------------
// GET /telemetry-snapshot
// ---------------------------------------------------------------------------

/// A flare event reported by the telemetry feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// GOES class label, e.g. `"M1.2"`.
    pub class_type: String,
    pub begin_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_region: Option<String>,
}

impl Event {
    /// Letter band parsed from `class_type`.
    pub fn flux_class(&self) -> Option<FluxClass> {
        self.class_type.chars().next().and_then(FluxClass::from_letter)
    }
}

/// Point-in-time telemetry, replaced wholesale on every poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySnapshot {
    #[serde(alias = "live_flares")]
    pub live_events: Vec<Event>,
    pub timestamp: String,
    pub status: String,
    #[serde(
        default,
        alias = "active_regions",
        skip_serializing_if = "Option::is_none"
    )]
    pub active_region_count: Option<u32>,
    #[serde(default, alias = "data_source", skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, alias = "flare_count", skip_serializing_if = "Option::is_none")]
    pub event_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TelemetrySnapshot {
    pub fn validate(self) -> ApiResult<Self> {
        if self.status.is_empty() {
            return Err(ApiError::Schema("telemetry status is empty".into()));
        }
        Ok(self)
    }

    /// Reported region count, or the number of distinct regions among the events.
    pub fn region_count(&self) -> usize {
        match self.active_region_count {
            Some(n) => n as usize,
            None => {
                let mut regions: Vec<&str> = self
                    .live_events
                    .iter()
                    .filter_map(|e| e.active_region.as_deref())
                    .collect();
                regions.sort_unstable();
                regions.dedup();
                regions.len()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// GET /flux-reading
// ---------------------------------------------------------------------------

/// Flux as either a number in W/m² or a preformatted class label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FluxValue {
    Watts(f64),
    Label(String),
}

impl FluxValue {
    /// Numeric flux in W/m². Labels invert [`format_flux`]: the intensity
    /// after the letter is W/m² scaled by [`FLUX_SUFFIX_SCALE`].
    pub fn watts(&self) -> Option<f64> {
        match self {
            Self::Watts(w) => Some(*w),
            Self::Label(label) => {
                let (class, intensity) = parse_label(label)?;
                FluxClass::from_letter(class)?;
                Some(intensity / FLUX_SUFFIX_SCALE)
            }
        }
    }
}

fn parse_label(label: &str) -> Option<(char, f64)> {
    let mut chars = label.trim().chars();
    let letter = chars.next()?;
    let intensity = chars.as_str().parse().ok()?;
    Some((letter, intensity))
}

/// One X-ray flux reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FluxReading {
    pub flux: FluxValue,
    #[serde(alias = "energy")]
    pub energy_band: String,
    #[serde(alias = "time_tag")]
    pub timestamp: String,
    pub source: String,
}

impl FluxReading {
    pub fn validate(self) -> ApiResult<Self> {
        let problem = match &self.flux {
            FluxValue::Watts(w) if !w.is_finite() || *w < 0.0 => {
                Some(format!("flux out of range: {w}"))
            }
            FluxValue::Watts(_) => None,
            FluxValue::Label(l) => match self.flux.watts() {
                None => Some(format!("unparseable flux label: {l:?}")),
                Some(w) if !w.is_finite() || w < 0.0 => {
                    Some(format!("flux label out of range: {l:?}"))
                }
                Some(w) => {
                    let letter = l.trim().chars().next().and_then(FluxClass::from_letter);
                    (letter != Some(FluxClass::from_flux(w)))
                        .then(|| format!("flux label {l:?} disagrees with {}", format_flux(w)))
                }
            },
        };
        match problem {
            Some(msg) => Err(ApiError::Schema(msg)),
            None => Ok(self),
        }
    }

    /// Display form, e.g. `B1.3`. Unparseable labels pass through unchanged.
    pub fn display(&self) -> String {
        match (&self.flux, self.flux.watts()) {
            (_, Some(w)) => format_flux(w),
            (FluxValue::Label(l), None) => l.trim().to_string(),
            (FluxValue::Watts(w), None) => format_flux(*w),
        }
    }

    pub fn class(&self) -> FluxClass {
        self.flux
            .watts()
            .map(FluxClass::from_flux)
            .unwrap_or(FluxClass::B)
    }
}

// ---------------------------------------------------------------------------
// POST /predict
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictRequest {
    pub features: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResponse {
    /// Probability of a significant flare, in `[0, 1]`.
    pub prediction: f64,
    pub confidence: Confidence,
    #[serde(alias = "flare_class")]
    pub flare_class: String,
    pub timestamp: String,
    #[serde(alias = "model_used")]
    pub model_used: String,
}

impl PredictionResponse {
    pub fn validate(self) -> ApiResult<Self> {
        if !(0.0..=1.0).contains(&self.prediction) {
            return Err(ApiError::Schema(format!(
                "prediction {} outside [0, 1]",
                self.prediction
            )));
        }
        Ok(self)
    }
}

// ---------------------------------------------------------------------------
// GET /model-metrics
// ---------------------------------------------------------------------------

/// Performance of the trained model behind `/predict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    #[serde(alias = "f1_score")]
    pub f1: f64,
    #[serde(alias = "auc_roc")]
    pub auc_roc: f64,
    #[serde(alias = "training_date")]
    pub training_date: String,
    #[serde(alias = "features_used")]
    pub features_used: u32,
    #[serde(alias = "model_type")]
    pub model_type: String,
    #[serde(
        default,
        alias = "significant_flares",
        skip_serializing_if = "Option::is_none"
    )]
    pub significant_event_count: Option<u32>,
}

impl ModelMetrics {
    pub fn validate(self) -> ApiResult<Self> {
        let scores = [
            ("accuracy", self.accuracy),
            ("precision", self.precision),
            ("recall", self.recall),
            ("f1", self.f1),
            ("aucRoc", self.auc_roc),
        ];
        for (name, v) in scores {
            if !(0.0..=1.0).contains(&v) {
                return Err(ApiError::Schema(format!("{name} {v} outside [0, 1]")));
            }
        }
        Ok(self)
    }
}

// ---------------------------------------------------------------------------
// Seam
// ---------------------------------------------------------------------------

/// The external prediction/telemetry service.
///
/// Implementations enforce their own transport timeout; callers never wait
/// unboundedly.
#[async_trait]
pub trait ForecastApi: Send + Sync {
    async fn telemetry_snapshot(&self) -> ApiResult<TelemetrySnapshot>;

    async fn flux_reading(&self) -> ApiResult<FluxReading>;

    async fn predict(&self, features: &[f64]) -> ApiResult<PredictionResponse>;

    async fn model_metrics(&self) -> ApiResult<ModelMetrics>;
}
