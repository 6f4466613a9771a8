//! The error taxonomy every component in this crate normalizes to, and its
//! translation into the Protocol-A `{type:"error", error:{type,message}}` wire shape.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// The eight-member error taxonomy every component's failures collapse into.
#[derive(thiserror::Error, Debug)]
pub enum OpenCcError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("not supported: {0}")]
    NotSupported(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("upstream API error: {0}")]
    Api(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("provider initialization failed: {0}")]
    ProviderInit(String),

    #[error("stream error: {0}")]
    Stream(String),
}

impl OpenCcError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            OpenCcError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            OpenCcError::Authentication(_) => StatusCode::UNAUTHORIZED,
            OpenCcError::RateLimit(_) => StatusCode::TOO_MANY_REQUESTS,
            OpenCcError::NotSupported(_) => StatusCode::BAD_REQUEST,
            OpenCcError::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            OpenCcError::Api(_) | OpenCcError::Internal(_) | OpenCcError::ProviderInit(_) | OpenCcError::Stream(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            OpenCcError::InvalidRequest(_) => "invalid_request_error",
            OpenCcError::Authentication(_) => "authentication_error",
            OpenCcError::RateLimit(_) => "rate_limit_error",
            OpenCcError::NotSupported(_) => "not_supported_error",
            OpenCcError::Timeout(_) => "timeout_error",
            OpenCcError::Api(_) => "api_error",
            OpenCcError::Internal(_) => "internal_error",
            OpenCcError::ProviderInit(_) => "provider_init_error",
            OpenCcError::Stream(_) => "stream_error",
        }
    }

    /// The `{type:"error", error:{type,message}}` body, identical across unary and
    /// streaming responses.
    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload {
            payload_type: "error",
            error: ErrorDetails {
                error_type: self.error_type(),
                message: self.to_string(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    #[serde(rename = "type")]
    pub payload_type: &'static str,
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetails {
    #[serde(rename = "type")]
    pub error_type: &'static str,
    pub message: String,
}

impl IntoResponse for OpenCcError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let payload = self.to_payload();
        (status, Json(payload)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_request_maps_to_400() {
        let err = OpenCcError::InvalidRequest("messages must not be empty".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_type(), "invalid_request_error");
    }

    #[test]
    fn internal_and_provider_init_and_stream_map_to_500() {
        assert_eq!(
            OpenCcError::Internal("boom".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            OpenCcError::ProviderInit("boom".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            OpenCcError::Stream("boom".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn payload_shape_is_bit_identical_regardless_of_variant() {
        let err = OpenCcError::RateLimit("slow down".to_string());
        let payload = err.to_payload();
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["error"]["type"], "rate_limit_error");
        assert_eq!(json["error"]["message"], "rate limit exceeded: slow down");
    }
}
