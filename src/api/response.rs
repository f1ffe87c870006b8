//! JSON response builders for the API.

use crate::api::error::ApiError;
use crate::cache::Fingerprint;
use crate::messages;
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, ALLOW, CONTENT_TYPE, ETAG};
use hyper::{Response, StatusCode};
use serde::Serialize;

/// Build a JSON response with status code.
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = match serde_json::to_vec(body) {
        Ok(json) => json,
        Err(e) => {
            return ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                messages::INTERNAL_SERVER_ERROR,
                format!("Serialization error: {}", e),
            )
            .into_response()
        }
    };

    let mut response = Response::new(Full::new(Bytes::from(json)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// Quoted entity tag header value.
pub fn etag_value(fingerprint: &Fingerprint) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!("\"{}\"", fingerprint)).ok()
}

fn with_etag(
    mut response: Response<Full<Bytes>>,
    fingerprint: &Fingerprint,
) -> Response<Full<Bytes>> {
    if let Some(value) = etag_value(fingerprint) {
        response.headers_mut().insert(ETAG, value);
    }
    response
}

/// Build a 200 OK JSON response carrying the current validator.
pub fn ok_with_etag<T: Serialize>(body: &T, fingerprint: &Fingerprint) -> Response<Full<Bytes>> {
    with_etag(json_response(StatusCode::OK, body), fingerprint)
}

/// Build a 304 Not Modified response with an empty body.
pub fn not_modified(fingerprint: &Fingerprint) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::NOT_MODIFIED;
    with_etag(response, fingerprint)
}

/// Build a 404 Not Found response for an unknown route.
pub fn not_found() -> Response<Full<Bytes>> {
    ApiError::new(
        StatusCode::NOT_FOUND,
        messages::RESOURCE_NOT_FOUND,
        "The resource you requested was not found.",
    )
    .into_response()
}

/// Build a 405 Method Not Allowed response.
pub fn method_not_allowed(allowed: &[&str]) -> Response<Full<Bytes>> {
    let allow = allowed.join(", ");
    let mut response = ApiError::new(
        StatusCode::METHOD_NOT_ALLOWED,
        "METHOD_NOT_ALLOWED",
        format!("Method not allowed. Allowed: {}", allow),
    )
    .into_response();

    if let Ok(value) = HeaderValue::from_str(&allow) {
        response.headers_mut().insert(ALLOW, value);
    }
    response
}
