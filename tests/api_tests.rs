//! HTTP control surface tests
//!
//! Drives the router directly with tower's `oneshot`, backed by the counting
//! sink double so no audio hardware is needed.

mod helpers;

use axum::body::Body;
use axum::Router;
use chromatone::api::{create_router, AppContext};
use chromatone::events::EventBus;
use chromatone::playback::session::PlaybackSession;
use helpers::SinkProbe;
use http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

fn test_app() -> (Router, SinkProbe) {
    let probe = SinkProbe::new();
    let events = EventBus::default();
    let session = PlaybackSession::with_sink_factory(events.clone(), probe.factory());
    let app = create_router(AppContext { session, events });
    (app, probe)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    // Rejection bodies are plain text, not JSON
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn post(app: &Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    // Rejection bodies are plain text, not JSON
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

#[tokio::test]
async fn health_reports_module_and_version() {
    let (app, _probe) = test_app();
    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "chromatone");
}

#[tokio::test]
async fn status_starts_with_defaults() {
    let (app, _probe) = test_app();
    let (status, body) = get(&app, "/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "white");
    assert_eq!(body["playing"], false);
    assert_eq!(body["timer_minutes"], serde_json::Value::Null);
    assert!((body["volume"].as_f64().unwrap() - 0.7).abs() < 1e-6);
}

#[tokio::test]
async fn play_and_stop_round_trip() {
    let (app, probe) = test_app();

    let (status, body) = post(&app, "/playback/play", serde_json::json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["playing"], true);
    probe.wait_for_writes(1);

    let (status, body) = post(&app, "/playback/stop", serde_json::json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["playing"], false);
}

#[tokio::test]
async fn toggle_starts_then_stops() {
    let (app, _probe) = test_app();

    let (_, body) = post(&app, "/playback/toggle", serde_json::json!({})).await;
    assert_eq!(body["playing"], true);
    let (_, body) = post(&app, "/playback/toggle", serde_json::json!({})).await;
    assert_eq!(body["playing"], false);
}

#[tokio::test]
async fn set_noise_changes_kind() {
    let (app, _probe) = test_app();

    let (status, body) = post(&app, "/playback/noise", serde_json::json!({"kind": "pink"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "pink");

    let (_, body) = get(&app, "/playback/noise").await;
    assert_eq!(body["kind"], "pink");
    assert_eq!(body["display_name"], "Pink Noise");
}

#[tokio::test]
async fn noise_carousel_steps_and_wraps() {
    let (app, _probe) = test_app();

    let (status, body) = post(&app, "/playback/noise/next", serde_json::json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "pink");

    let (_, body) = post(&app, "/playback/noise/prev", serde_json::json!({})).await;
    assert_eq!(body["kind"], "white");

    // Stepping back from the first kind wraps to the last
    let (_, body) = post(&app, "/playback/noise/prev", serde_json::json!({})).await;
    assert_eq!(body["kind"], "violet");
    let (_, body) = post(&app, "/playback/noise/next", serde_json::json!({})).await;
    assert_eq!(body["kind"], "white");
}

#[tokio::test]
async fn unknown_noise_kind_is_rejected() {
    let (app, _probe) = test_app();
    let (status, _) = post(&app, "/playback/noise", serde_json::json!({"kind": "mauve"})).await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn volume_uses_percent_scale_and_clamps() {
    let (app, _probe) = test_app();

    let (status, body) = post(&app, "/audio/volume", serde_json::json!({"volume": 50})).await;
    assert_eq!(status, StatusCode::OK);
    assert!((body["volume"].as_f64().unwrap() - 0.5).abs() < 1e-6);

    // Above 100 clamps instead of failing, however large the value
    for out_of_range in [250u32, 100_000] {
        let (status, body) =
            post(&app, "/audio/volume", serde_json::json!({"volume": out_of_range})).await;
        assert_eq!(status, StatusCode::OK);
        assert!((body["volume"].as_f64().unwrap() - 1.0).abs() < 1e-6);
    }

    let (_, body) = get(&app, "/audio/volume").await;
    assert_eq!(body["volume"], 100);
}

#[tokio::test]
async fn timer_set_and_clear() {
    let (app, _probe) = test_app();

    let (status, body) = post(&app, "/playback/timer", serde_json::json!({"minutes": 10})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timer_minutes"], 10);
    assert_eq!(body["remaining_seconds"], 600);

    // Out-of-range minutes clamp to 480
    let (_, body) = post(&app, "/playback/timer", serde_json::json!({"minutes": 600})).await;
    assert_eq!(body["timer_minutes"], 480);
    assert_eq!(body["remaining_seconds"], 28_800);

    let (_, body) = post(&app, "/playback/timer", serde_json::json!({"minutes": null})).await;
    assert_eq!(body["timer_minutes"], serde_json::Value::Null);
    assert_eq!(body["remaining_seconds"], serde_json::Value::Null);

    let (_, body) = get(&app, "/playback/timer").await;
    assert_eq!(body["minutes"], serde_json::Value::Null);
}

#[tokio::test]
async fn device_failure_maps_to_service_unavailable() {
    let events = EventBus::default();
    let session =
        PlaybackSession::with_sink_factory(events.clone(), helpers::unavailable_factory());
    let app = create_router(AppContext { session, events });

    let (status, body) = post(&app, "/playback/play", serde_json::json!({})).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("device busy"));
}
