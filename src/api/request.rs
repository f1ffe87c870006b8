//! Request parsing helpers.

use crate::error::{PipeconfError, PipeconfResult};
use crate::pipeline::{PipelineConfig, Requester};
use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::header::{HOST, IF_MATCH, IF_NONE_MATCH};
use hyper::HeaderMap;
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Header naming the acting user.
pub const USER_HEADER: &str = "x-pipeconf-user";

/// Body of `POST /api/admin/pipelines`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePayload {
    #[serde(default)]
    pub group: Option<String>,
    pub pipeline: PipelineConfig,
}

/// Body of `PUT /api/admin/pipelines/{name}`.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePayload {
    pub pipeline: PipelineConfig,
}

fn header_str<'a>(
    headers: &'a HeaderMap,
    name: impl hyper::header::AsHeaderName,
) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim)
}

/// Acting user, `anonymous` when the header is missing or blank.
pub fn requester(headers: &HeaderMap) -> Requester {
    match header_str(headers, USER_HEADER) {
        Some(name) if !name.is_empty() => Requester::new(name),
        _ => Requester::anonymous(),
    }
}

/// Host used to build links.
pub fn host(headers: &HeaderMap) -> String {
    header_str(headers, HOST)
        .filter(|h| !h.is_empty())
        .unwrap_or("localhost")
        .to_string()
}

/// Validator from `If-None-Match`, with quotes and any weak prefix removed.
pub fn if_none_match(headers: &HeaderMap) -> Option<String> {
    let raw = header_str(headers, IF_NONE_MATCH)?;
    let raw = raw.strip_prefix("W/").unwrap_or(raw);
    let tag = raw
        .strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
        .unwrap_or(raw);
    Some(tag.to_string())
}

/// Precondition token from `If-Match`.
///
/// Only a single quoted value is accepted; anything else yields `None`.
pub fn if_match(headers: &HeaderMap) -> Option<String> {
    let raw = header_str(headers, IF_MATCH)?;
    let token = raw.strip_prefix('"')?.strip_suffix('"')?;
    if token.is_empty() || token.contains('"') {
        return None;
    }
    Some(token.to_string())
}

/// Collect a request body, rejecting anything over `limit` bytes.
pub async fn read_body<B>(body: B, limit: usize) -> PipeconfResult<Bytes>
where
    B: Body,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            Err(PipeconfError::BodyTooLarge { limit })
        }
        Err(e) => Err(PipeconfError::MalformedBody(e.to_string())),
    }
}

/// Deserialize a JSON body.
pub fn parse_json<T: DeserializeOwned>(body: &[u8]) -> PipeconfResult<T> {
    serde_json::from_slice(body).map_err(|e| PipeconfError::MalformedBody(e.to_string()))
}
