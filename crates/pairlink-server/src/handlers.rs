//! HTTP handlers. Thin adapters over [`SessionService`](crate::SessionService).

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use pairlink_core::{normalize_recipient, SessionError};
use tracing::{error, warn};

use crate::server::AppState;
use crate::wire::{
    parse_optional_body, ConnectRequest, HealthResponse, SendRequest, SendResponse,
    StatusResponse, SuccessResponse,
};

/// GET /api/status
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(state.service.get_status().into())
}

/// POST /api/simulate_connect
///
/// The body is optional; without a `phone` the configured default is used.
pub async fn simulate_connect(State(state): State<AppState>, body: Bytes) -> Response {
    let request = match parse_optional_body::<ConnectRequest>(&body) {
        Ok(request) => request.unwrap_or_default(),
        Err(e) => {
            warn!(error = %e, "rejecting simulate_connect body");
            return (
                StatusCode::BAD_REQUEST,
                Json(SuccessResponse::failure(format!("Invalid JSON body: {e}"))),
            )
                .into_response();
        }
    };

    let phone = request
        .phone
        .unwrap_or_else(|| state.default_phone.to_string());
    if phone.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(SuccessResponse::failure("Phone number must not be empty")),
        )
            .into_response();
    }

    state.service.simulate_pair(&phone);
    Json(SuccessResponse::ok()).into_response()
}

/// POST /api/simulate_disconnect
pub async fn simulate_disconnect(State(state): State<AppState>) -> Json<SuccessResponse> {
    state.service.disconnect();
    Json(SuccessResponse::ok())
}

/// POST /send
///
/// Success only means the message was accepted; the send itself happens
/// later and its outcome is never reported here.
pub async fn send(State(state): State<AppState>, body: Bytes) -> Response {
    let request = match parse_optional_body::<SendRequest>(&body) {
        Ok(Some(request)) => request,
        Ok(None) => return send_error(StatusCode::BAD_REQUEST, "No data provided"),
        Err(e) => {
            warn!(error = %e, "rejecting send body");
            return send_error(StatusCode::BAD_REQUEST, format!("Invalid JSON body: {e}"));
        }
    };

    let phone = request
        .phone
        .filter(|p| !normalize_recipient(p).is_empty());
    let message = request.message.filter(|m| !m.is_empty());
    let (Some(phone), Some(message)) = (phone, message) else {
        return send_error(
            StatusCode::BAD_REQUEST,
            "Phone number and message are required",
        );
    };

    match state.service.dispatch(&phone, &message) {
        Ok(_) => Json(SendResponse::success("Message sent successfully")).into_response(),
        Err(SessionError::NotConnected) => send_error(
            StatusCode::FORBIDDEN,
            "Not connected. Please scan the QR code at /status",
        ),
        Err(SessionError::EmptyRecipient) => send_error(
            StatusCode::BAD_REQUEST,
            "Phone number and message are required",
        ),
        Err(e @ SessionError::RuntimeUnavailable) => {
            error!(error = %e, "send could not be scheduled");
            send_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        connected: state.service.is_connected(),
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

fn send_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(SendResponse::error(message))).into_response()
}
