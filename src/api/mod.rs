//! HTTP control surface

pub mod handlers;
pub mod server;

pub use server::{create_router, AppContext};

use crate::error::Error;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::AudioDevice(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Config(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
