//! API error type and `PipeconfError` → HTTP status mapping.

use crate::error::PipeconfError;
use crate::pipeline::FailureKind;
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use serde_json::Value;

/// Rejection rendered as `{"message", "message_key", "data"?}`.
#[derive(Debug)]
pub struct ApiError {
    /// HTTP status code.
    pub status: StatusCode,
    /// Localized message key.
    pub message_key: String,
    /// Rendered message.
    pub message: String,
    /// Optional echo of the submitted entity.
    pub data: Option<Value>,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        message_key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            message_key: message_key.into(),
            message: message.into(),
            data: None,
        }
    }

    /// Attach the entity the client sent.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Convert to HTTP response.
    pub fn into_response(self) -> Response<Full<Bytes>> {
        let mut body = serde_json::json!({
            "message": self.message,
            "message_key": self.message_key,
        });
        if let Some(data) = self.data {
            body["data"] = data;
        }

        let mut response = Response::new(Full::new(Bytes::from(body.to_string())));
        *response.status_mut() = self.status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }
}

fn gateway_status(kind: FailureKind) -> StatusCode {
    match kind {
        FailureKind::NotFound => StatusCode::NOT_FOUND,
        FailureKind::Conflict => StatusCode::CONFLICT,
        FailureKind::Invalid => StatusCode::UNPROCESSABLE_ENTITY,
        FailureKind::Unauthorized => StatusCode::UNAUTHORIZED,
        FailureKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<PipeconfError> for ApiError {
    fn from(err: PipeconfError) -> Self {
        let status = match &err {
            PipeconfError::PipelineNotFound(_) => StatusCode::NOT_FOUND,

            PipeconfError::PipelineExists(_)
            | PipeconfError::GroupRequired
            | PipeconfError::InvalidPipeline(_) => StatusCode::UNPROCESSABLE_ENTITY,

            PipeconfError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            PipeconfError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            PipeconfError::RenameNotAllowed { .. } => StatusCode::NOT_ACCEPTABLE,
            PipeconfError::StalePipelineConfig(_) => StatusCode::PRECONDITION_FAILED,
            PipeconfError::Gateway { kind, .. } => gateway_status(*kind),

            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %err, "Request failed");
        }

        Self::new(status, err.message_key(), err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}: {}", self.status.as_u16(), self.message_key, self.message)
    }
}

impl std::error::Error for ApiError {}
