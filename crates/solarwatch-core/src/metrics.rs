//! Initial model-metrics load.
//!
//! This is the only place an API failure can become visible to the user: if
//! the live fetch fails and no last-known-good metrics are available, the
//! view ends in [`MetricsView::Unavailable`].

use log::warn;
use serde::Serialize;

use crate::api::{ForecastApi, ModelMetrics};
use crate::error::ApiError;
use crate::fallback::last_known_metrics;

/// Note shown next to stand-in metrics.
pub const DEGRADED_NOTE: &str = "Failed to load performance metrics";

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum MetricsView {
    #[default]
    Loading,
    Ready { metrics: ModelMetrics },
    /// Live load failed; last-known-good values shown instead.
    Degraded { metrics: ModelMetrics, note: String },
    Unavailable { message: String },
}

impl MetricsView {
    /// Resolve a finished fetch into a view.
    pub fn resolve(result: Result<ModelMetrics, ApiError>, cached: Option<ModelMetrics>) -> Self {
        match (result, cached) {
            (Ok(metrics), _) => Self::Ready { metrics },
            (Err(e), Some(metrics)) => {
                warn!("metrics: {e}; showing last-known-good values");
                Self::Degraded {
                    metrics,
                    note: DEGRADED_NOTE.to_string(),
                }
            }
            (Err(e), None) => {
                warn!("metrics: {e}; nothing cached");
                Self::Unavailable {
                    message: format!("{DEGRADED_NOTE}: {e}"),
                }
            }
        }
    }

    /// Metrics to display, if any.
    pub fn metrics(&self) -> Option<&ModelMetrics> {
        match self {
            Self::Ready { metrics } | Self::Degraded { metrics, .. } => Some(metrics),
            Self::Loading | Self::Unavailable { .. } => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// Fetch metrics once. `allow_fallback` controls whether last-known-good
/// values may stand in for a failed fetch.
pub async fn load_metrics(api: &dyn ForecastApi, allow_fallback: bool) -> MetricsView {
    let cached = allow_fallback.then(last_known_metrics);
    MetricsView::resolve(api.model_metrics().await, cached)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live() -> ModelMetrics {
        ModelMetrics {
            accuracy: 0.88,
            ..last_known_metrics()
        }
    }

    #[test]
    fn success_is_ready() {
        let view = MetricsView::resolve(Ok(live()), Some(last_known_metrics()));
        assert_eq!(view.metrics().map(|m| m.accuracy), Some(0.88));
        assert!(matches!(view, MetricsView::Ready { .. }));
    }

    #[test]
    fn failure_with_cache_is_degraded() {
        let view = MetricsView::resolve(Err(ApiError::Status(500)), Some(last_known_metrics()));
        match view {
            MetricsView::Degraded { metrics, note } => {
                assert_eq!(metrics.accuracy, 0.914);
                assert_eq!(note, DEGRADED_NOTE);
            }
            other => panic!("expected degraded, got {other:?}"),
        }
    }

    #[test]
    fn failure_without_cache_is_terminal() {
        let view = MetricsView::resolve(Err(ApiError::Schema("missing accuracy".into())), None);
        assert!(view.is_unavailable());
        assert!(view.metrics().is_none());
    }

    #[test]
    fn default_is_loading() {
        assert!(MetricsView::default().is_loading());
    }

    #[test]
    fn serializes_with_status_tag() {
        let json = serde_json::to_value(MetricsView::Unavailable {
            message: "down".into(),
        })
        .unwrap();
        assert_eq!(json["status"], "unavailable");
        assert_eq!(json["message"], "down");
    }
}
