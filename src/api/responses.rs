use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::path::Path;

/// Error body sent to clients: `{error}` for request failures, `{message}`
/// for authentication failures, both for upstream failures.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip)]
    pub status: StatusCode,

    /// Value for a `WWW-Authenticate` header, if any.
    #[serde(skip)]
    pub challenge: Option<&'static str>,
}

impl ErrorResponse {
    fn with_error(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            message: None,
            status,
            challenge: None,
        }
    }

    /// 400 with `{error}`.
    pub fn validation_error(error: impl Into<String>) -> Self {
        Self::with_error(StatusCode::BAD_REQUEST, error)
    }

    /// 404 with `{error}`.
    pub fn not_found(error: impl Into<String>) -> Self {
        Self::with_error(StatusCode::NOT_FOUND, error)
    }

    /// 401 with `{message}`.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            error: None,
            message: Some(message.into()),
            status: StatusCode::UNAUTHORIZED,
            challenge: None,
        }
    }

    /// 500 with `{error}` and, when known, the underlying cause as `message`.
    pub fn internal_error(error: impl Into<String>, message: Option<String>) -> Self {
        Self {
            message,
            ..Self::with_error(StatusCode::INTERNAL_SERVER_ERROR, error)
        }
    }

    /// Ask the client for credentials.
    pub fn with_challenge(mut self, challenge: &'static str) -> Self {
        self.challenge = Some(challenge);
        self
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status = self.status;
        match self.challenge {
            Some(challenge) => {
                (status, [(header::WWW_AUTHENTICATE, challenge)], Json(self)).into_response()
            }
            None => (status, Json(self)).into_response(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfGeneratedResponse {
    pub message: &'static str,
    pub pdf_path: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfPathResponse {
    pub pdf_path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// The bare filename of a generated report, as clients pass it back to
/// `/download_pdf/:filename`.
pub fn pdf_basename(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
