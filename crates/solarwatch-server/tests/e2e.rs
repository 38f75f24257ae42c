//! End-to-end tests: reference server on an ephemeral port, driven by the
//! reqwest client from solarwatch-core.

use std::time::Duration;

use axum::{
    Json, Router,
    routing::{get, post},
};
use serde_json::json;
use solarwatch_core::api::paths;
use solarwatch_core::fallback::FALLBACK_TELEMETRY_SOURCE;
use solarwatch_core::{
    ApiError, ErrorKind, FlareClass, FluxClass, ForecastApi, HttpForecastClient, MetricsView,
    PredictionRecord, load_metrics,
};

async fn spawn_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(solarwatch_server::serve(listener, Some(42)));
    format!("http://{addr}")
}

/// Serve a hand-built router that misbehaves in a specific way.
async fn spawn_router(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await });
    format!("http://{addr}")
}

fn client(base: &str) -> HttpForecastClient {
    HttpForecastClient::new(base, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn serves_all_four_endpoints() {
    let base = spawn_server().await;
    let api = client(&base);

    let snapshot = api.telemetry_snapshot().await.unwrap();
    assert_eq!(snapshot.status, "success");
    assert_eq!(snapshot.source.as_deref(), Some(FALLBACK_TELEMETRY_SOURCE));
    assert_eq!(snapshot.live_events.len(), 2);

    let reading = api.flux_reading().await.unwrap();
    assert_eq!(reading.class(), FluxClass::B);
    assert!(reading.display().starts_with('B'));

    let response = api.predict(&[1.0; 23]).await.unwrap();
    assert!((0.0..=1.0).contains(&response.prediction));
    let record = PredictionRecord::from_response(response, false);
    assert_eq!(record.flare_class, FlareClass::from_probability(record.probability));
    assert_eq!(record.reported_class, record.flare_class.label());

    let metrics = api.model_metrics().await.unwrap();
    assert_eq!(metrics.features_used, 23);
    assert!(matches!(
        load_metrics(&api, false).await,
        MetricsView::Ready { .. }
    ));
}

#[tokio::test]
async fn empty_features_are_rejected() {
    let base = spawn_server().await;
    let err = client(&base).predict(&[]).await.unwrap_err();
    assert_eq!(err, ApiError::Status(422));
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let base = spawn_server().await;
    let response = reqwest::Client::new()
        .post(format!("{base}/predict"))
        .header("content-type", "application/json")
        .body(r#"{"features": "nope"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 422);
}

#[tokio::test]
async fn health_and_index_respond() {
    let base = spawn_server().await;
    let http = reqwest::Client::new();

    let health: serde_json::Value = http
        .get(format!("{base}/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "operational");
    assert_eq!(health["components"]["model"], "demo_mode");

    let index: serde_json::Value = http
        .get(format!("{base}/"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(index["endpoints"]["/flux-reading"].is_string());
}

#[tokio::test]
async fn unknown_path_is_status_error() {
    let base = spawn_server().await;
    let http = reqwest::Client::new();
    let response = http.get(format!("{base}/solar-now")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn undecodable_bodies_are_schema_errors() {
    let router = Router::new()
        .route(paths::FLUX_READING, get(|| async { "not json" }))
        .route(
            paths::TELEMETRY_SNAPSHOT,
            get(|| async { Json(json!({"status": 5})) }),
        );
    let api = client(&spawn_router(router).await);

    let err = api.flux_reading().await.unwrap_err();
    assert!(matches!(err, ApiError::Schema(_)), "{err:?}");
    assert_eq!(err.kind(), ErrorKind::Schema);

    let err = api.telemetry_snapshot().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Schema);
}

#[tokio::test]
async fn invalid_values_are_schema_errors() {
    let router = Router::new()
        .route(
            paths::PREDICT,
            post(|| async {
                Json(json!({
                    "prediction": 1.4,
                    "confidence": "high",
                    "flareClass": "X-Class",
                    "timestamp": "2024-03-01T12:00:00Z",
                    "modelUsed": "rf"
                }))
            }),
        )
        .route(
            paths::FLUX_READING,
            get(|| async {
                Json(json!({
                    "flux": "N/A",
                    "energyBand": "0.1-0.8nm",
                    "timestamp": "2024-03-01T12:00:00Z",
                    "source": "GOES"
                }))
            }),
        );
    let api = client(&spawn_router(router).await);

    let err = api.predict(&[1.0; 23]).await.unwrap_err();
    assert!(matches!(err, ApiError::Schema(_)), "{err:?}");

    let err = api.flux_reading().await.unwrap_err();
    assert!(matches!(err, ApiError::Schema(_)), "{err:?}");
}

#[tokio::test]
async fn slow_response_is_a_timeout() {
    let router = Router::new().route(
        paths::MODEL_METRICS,
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "too late"
        }),
    );
    let base = spawn_router(router).await;
    let timeout = Duration::from_millis(200);
    let api = HttpForecastClient::new(&base, timeout).unwrap();

    let err = api.model_metrics().await.unwrap_err();
    assert_eq!(err, ApiError::Timeout(timeout));
    assert_eq!(err.kind(), ErrorKind::Transport);
}
