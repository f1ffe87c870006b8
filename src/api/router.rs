//! Request routing for the API.
//!
//! Bodies are collected up front (bounded by `max_body_bytes`) so handlers
//! work on `Request<Bytes>`; the CLI uses [`dispatch`] directly.

use super::error::ApiError;
use super::handlers;
use super::request;
use super::response;
use super::state::AppState;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::sync::Arc;

/// Collection path for pipeline configs.
pub const PIPELINES_PATH: &str = "/api/admin/pipelines";

/// Route an incoming connection request.
pub async fn route(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();

    let body = match request::read_body(body, state.settings.max_body_bytes).await {
        Ok(body) => body,
        Err(e) => return Ok(ApiError::from(e).into_response()),
    };

    Ok(dispatch(Request::from_parts(parts, body), state).await)
}

/// Route a request whose body has already been read.
pub async fn dispatch(req: Request<Bytes>, state: Arc<AppState>) -> Response<Full<Bytes>> {
    let path = req.uri().path().to_string();
    let method = req.method().clone();

    tracing::debug!(method = %method, path = %path, "Routing request");

    let Some(rest) = path.strip_prefix(PIPELINES_PATH) else {
        return response::not_found();
    };

    match rest {
        "" | "/" => match method {
            Method::POST => handlers::pipelines::create(req, state).await,
            _ => response::method_not_allowed(&["POST"]),
        },
        sub => {
            // /api/admin/pipelines/{name}
            let name = match sub.strip_prefix('/') {
                Some(name) if !name.is_empty() && !name.contains('/') => name,
                _ => return response::not_found(),
            };

            match method {
                Method::GET => handlers::pipelines::show(req, state, name).await,
                Method::PUT => handlers::pipelines::update(req, state, name).await,
                _ => response::method_not_allowed(&["GET", "PUT"]),
            }
        }
    }
}
