//! The one-shot "make a prediction" action.
//!
//! A prediction never fails from the caller's point of view: a failed request
//! is logged at debug level and replaced by a locally drawn response of the
//! same shape. The resulting [`PredictionRecord`] always carries a class
//! computed locally from its probability.

use chrono::{DateTime, Utc};
use log::debug;
use serde::Serialize;

use crate::api::{ForecastApi, PredictionResponse, parse_timestamp};
use crate::buffer::{RingBuffer, Sample};
use crate::classify::{Confidence, FlareClass};
use crate::fallback::FallbackGenerator;
use crate::random::RandomSource;

/// HMI SHARP magnetic field parameters, in the order the model expects.
pub const FEATURE_NAMES: [&str; 23] = [
    "R_VALUE", "QUALITY", "MEANGBZ", "TOTUSJH", "USFLUX", "TOTPOT", "MEANPOT", "AREA_ACR",
    "LON_MIN", "LON_MAX", "LAT_MIN", "LAT_MAX", "MEANGAM", "MEANGBT", "MEANGBH", "MEANJZD",
    "TOTUSJZ", "MEANALP", "MEANJZH", "ABSNJZH", "SAVNCPP", "MEANSHR", "SHRGT45",
];

/// Range feature values are drawn from.
pub const FEATURE_RANGE: (f64, f64) = (-50.0, 50.0);

/// A feature vector drawn uniformly from [`FEATURE_RANGE`].
pub fn random_features(rng: &mut dyn RandomSource) -> Vec<f64> {
    let (lo, hi) = FEATURE_RANGE;
    FEATURE_NAMES.iter().map(|_| rng.uniform_in(lo, hi)).collect()
}

/// One prediction as shown in the history chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionRecord {
    pub timestamp: DateTime<Utc>,
    pub probability: f64,
    /// Derived locally from `probability`.
    pub flare_class: FlareClass,
    /// Class label as the API reported it.
    pub reported_class: String,
    pub confidence: Confidence,
    pub model_used: String,
    /// Whether the response was generated locally.
    pub fallback: bool,
}

impl PredictionRecord {
    pub fn from_response(response: PredictionResponse, fallback: bool) -> Self {
        let timestamp = parse_timestamp(&response.timestamp).unwrap_or_else(Utc::now);
        Self {
            timestamp,
            probability: response.prediction,
            flare_class: FlareClass::from_probability(response.prediction),
            reported_class: response.flare_class,
            confidence: response.confidence,
            model_used: response.model_used,
            fallback,
        }
    }

    /// Probability as a chart sample.
    pub fn sample(&self) -> Sample {
        Sample::new(self.probability, self.timestamp)
    }

    /// Probability as a whole percentage, e.g. `"75%"`.
    pub fn percent(&self) -> String {
        format!("{:.0}%", self.probability * 100.0)
    }
}

/// Ask `api` for a prediction on `features`, substituting a local draw on
/// any failure.
pub async fn predict_once(
    api: &dyn ForecastApi,
    fallback: &FallbackGenerator,
    features: &[f64],
) -> PredictionRecord {
    match api.predict(features).await {
        Ok(response) => PredictionRecord::from_response(response, false),
        Err(e) => {
            debug!("predict: {e}; using local draw");
            PredictionRecord::from_response(fallback.prediction(Utc::now()), true)
        }
    }
}

/// Bounded prediction history, oldest first.
pub type PredictionHistory = RingBuffer<PredictionRecord>;

/// Probability samples of the last `k` records, for charting.
pub fn history_samples(history: &PredictionHistory, k: usize) -> Vec<Sample> {
    history
        .recent(k)
        .iter()
        .map(PredictionRecord::sample)
        .collect()
}
