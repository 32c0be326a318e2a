//! HTTP request handlers
//!
//! REST endpoints for playback control. Volume uses the user-facing 0-100
//! scale on the wire and is converted to 0.0-1.0 internally.

use crate::api::server::AppContext;
use crate::audio::generator::NoiseKind;
use crate::audio::sink::CpalSink;
use crate::error::Error;
use crate::playback::session::SessionStatus;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Deserialize)]
pub struct NoiseRequest {
    kind: NoiseKind,
}

#[derive(Debug, Serialize)]
pub struct NoiseResponse {
    kind: NoiseKind,
    display_name: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct VolumeRequest {
    /// 0-100 user-facing scale; values above 100 clamp
    volume: u32,
}

#[derive(Debug, Serialize)]
pub struct VolumeResponse {
    volume: u8,
}

#[derive(Debug, Deserialize)]
pub struct TimerRequest {
    /// Whole minutes, 0-480; null clears the timer
    minutes: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct TimerResponse {
    minutes: Option<u32>,
    remaining_seconds: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct DeviceListResponse {
    devices: Vec<String>,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "chromatone".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn get_status(State(ctx): State<AppContext>) -> Json<SessionStatus> {
    Json(ctx.session.status())
}

pub async fn play(State(ctx): State<AppContext>) -> Result<Json<SessionStatus>, Error> {
    ctx.session.play()?;
    Ok(Json(ctx.session.status()))
}

pub async fn stop(State(ctx): State<AppContext>) -> Json<SessionStatus> {
    ctx.session.stop();
    Json(ctx.session.status())
}

pub async fn toggle(State(ctx): State<AppContext>) -> Result<Json<SessionStatus>, Error> {
    ctx.session.toggle()?;
    Ok(Json(ctx.session.status()))
}

pub async fn get_noise(State(ctx): State<AppContext>) -> Json<NoiseResponse> {
    let kind = ctx.session.status().kind;
    Json(NoiseResponse {
        kind,
        display_name: kind.display_name(),
    })
}

pub async fn set_noise(
    State(ctx): State<AppContext>,
    Json(req): Json<NoiseRequest>,
) -> Result<Json<SessionStatus>, Error> {
    ctx.session.select_noise(req.kind)?;
    Ok(Json(ctx.session.status()))
}

pub async fn next_noise(State(ctx): State<AppContext>) -> Result<Json<SessionStatus>, Error> {
    ctx.session.next_noise()?;
    Ok(Json(ctx.session.status()))
}

pub async fn prev_noise(State(ctx): State<AppContext>) -> Result<Json<SessionStatus>, Error> {
    ctx.session.prev_noise()?;
    Ok(Json(ctx.session.status()))
}

pub async fn get_volume(State(ctx): State<AppContext>) -> Json<VolumeResponse> {
    let volume = (ctx.session.status().volume * 100.0).round() as u8;
    Json(VolumeResponse { volume })
}

pub async fn set_volume(
    State(ctx): State<AppContext>,
    Json(req): Json<VolumeRequest>,
) -> Result<Json<SessionStatus>, Error> {
    // Out-of-range input clamps rather than failing
    let volume = req.volume.min(100) as f32 / 100.0;
    ctx.session.set_volume(volume)?;
    Ok(Json(ctx.session.status()))
}

pub async fn get_timer(State(ctx): State<AppContext>) -> Json<TimerResponse> {
    let status = ctx.session.status();
    Json(TimerResponse {
        minutes: status.timer_minutes,
        remaining_seconds: status.remaining_seconds,
    })
}

pub async fn set_timer(
    State(ctx): State<AppContext>,
    Json(req): Json<TimerRequest>,
) -> Json<SessionStatus> {
    ctx.session.set_timer(req.minutes);
    Json(ctx.session.status())
}

pub async fn list_audio_devices(
    State(_ctx): State<AppContext>,
) -> Result<Json<DeviceListResponse>, Error> {
    let devices = CpalSink::list_devices()?;
    Ok(Json(DeviceListResponse { devices }))
}

pub async fn event_stream(
    State(ctx): State<AppContext>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    Sse::new(ctx.events.subscribe_stream()).keep_alive(KeepAlive::default())
}
