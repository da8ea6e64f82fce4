//! JSON bodies of the HTTP adapter.

use serde::{Deserialize, Serialize};

use crate::service::StatusView;

/// `GET /api/status`. `qr_code` and `qr_code_image` are null while connected;
/// `error` is omitted when no dispatch has failed.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub connected: bool,
    pub qr_code: Option<String>,
    pub qr_code_image: Option<String>,
    /// Epoch seconds, fractional.
    pub connection_time: Option<f64>,
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<StatusView> for StatusResponse {
    fn from(view: StatusView) -> Self {
        let status = view.status;
        Self {
            connected: status.connected,
            qr_code: status.pairing_token,
            qr_code_image: view.qr_code_image,
            connection_time: status
                .connected_at
                .map(|t| t.timestamp_micros() as f64 / 1_000_000.0),
            phone_number: status.identity,
            error: status.last_error,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ConnectRequest {
    pub phone: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SendRequest {
    pub phone: Option<String>,
    pub message: Option<String>,
}

/// Body of the simulate endpoints.
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Body of `POST /send`.
#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub status: &'static str,
    pub message: String,
}

impl SendResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success",
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub connected: bool,
    pub uptime_secs: u64,
}

/// Parse a JSON body that may be absent. Blank bodies yield `None`.
pub fn parse_optional_body<T: serde::de::DeserializeOwned>(
    body: &[u8],
) -> Result<Option<T>, serde_json::Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice::<Option<T>>(body)
}
