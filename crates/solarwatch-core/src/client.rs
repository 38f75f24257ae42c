//! reqwest-backed [`ForecastApi`].

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::api::{
    FluxReading, ForecastApi, ModelMetrics, PredictRequest, PredictionResponse,
    TelemetrySnapshot, paths,
};
use crate::config::DashboardConfig;
use crate::error::{ApiError, ApiResult};

/// HTTP client for the forecasting API.
///
/// ```rust,ignore
/// use solarwatch_core::{ForecastApi, HttpForecastClient};
///
/// let client = HttpForecastClient::new("http://127.0.0.1:8000", Duration::from_secs(10))?;
/// let reading = client.flux_reading().await?;
/// println!("{}", reading.display());
/// ```
pub struct HttpForecastClient {
    base: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpForecastClient {
    pub fn new(base: &str, timeout: Duration) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base: base.trim_end_matches('/').to_string(),
            timeout,
            client,
        })
    }

    pub fn from_config(config: &DashboardConfig) -> ApiResult<Self> {
        Self::new(&config.api_base, config.request_timeout)
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    fn map_send_error(&self, e: reqwest::Error) -> ApiError {
        if e.is_timeout() {
            ApiError::Timeout(self.timeout)
        } else if e.is_connect() {
            ApiError::Transport(format!("cannot connect to {}: {e}", self.base))
        } else {
            ApiError::from(e)
        }
    }

    async fn decode<T: DeserializeOwned>(&self, response: reqwest::Response) -> ApiResult<T> {
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }
        let body = response.bytes().await.map_err(|e| self.map_send_error(e))?;
        serde_json::from_slice(&body).map_err(|e| ApiError::Schema(e.to_string()))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        self.decode(response).await
    }
}

#[async_trait]
impl ForecastApi for HttpForecastClient {
    async fn telemetry_snapshot(&self) -> ApiResult<TelemetrySnapshot> {
        self.get::<TelemetrySnapshot>(paths::TELEMETRY_SNAPSHOT)
            .await?
            .validate()
    }

    async fn flux_reading(&self) -> ApiResult<FluxReading> {
        self.get::<FluxReading>(paths::FLUX_READING).await?.validate()
    }

    async fn predict(&self, features: &[f64]) -> ApiResult<PredictionResponse> {
        let request = PredictRequest {
            features: features.to_vec(),
        };
        let response = self
            .client
            .post(self.url(paths::PREDICT))
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        self.decode::<PredictionResponse>(response).await?.validate()
    }

    async fn model_metrics(&self) -> ApiResult<ModelMetrics> {
        self.get::<ModelMetrics>(paths::MODEL_METRICS).await?.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn trims_trailing_slash() {
        let c = HttpForecastClient::new("http://localhost:8000/", Duration::from_secs(1)).unwrap();
        assert_eq!(c.base(), "http://localhost:8000");
        assert_eq!(c.url(paths::PREDICT), "http://localhost:8000/predict");
    }

    #[tokio::test]
    async fn unreachable_host_is_transport_error() {
        // Port 9 (discard) on loopback is closed on any sane test machine.
        let c = HttpForecastClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let err = c.flux_reading().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }
}
