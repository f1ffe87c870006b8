//! Pipeline config handlers.
//!
//! | Request | Success | Rejections |
//! |---------|---------|------------|
//! | `GET /api/admin/pipelines/{name}` | 200 + `ETag`, or 304 | 404 |
//! | `POST /api/admin/pipelines` | 200 + `ETag` | 422 exists, 422 no group |
//! | `PUT /api/admin/pipelines/{name}` | 200 + new `ETag` | 406 rename, 412 stale, 404 |
//!
//! Update checks the payload name before the precondition, so a rename is
//! reported as such whatever `If-Match` says.

use crate::api::error::ApiError;
use crate::api::representer;
use crate::api::request::{self, CreatePayload, UpdatePayload};
use crate::api::response;
use crate::api::state::AppState;
use crate::audit;
use crate::cache::Fingerprint;
use crate::error::{PipeconfError, PipeconfResult};
use crate::guard::ReadOutcome;
use crate::pipeline::{PipelineConfig, Requester};
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Request, Response};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// GET /api/admin/pipelines/{name}
pub async fn show(
    req: Request<Bytes>,
    state: Arc<AppState>,
    name: &str,
) -> Response<Full<Bytes>> {
    let presented = request::if_none_match(req.headers());

    match state.guard.read_with_caching(name, presented.as_deref()).await {
        Ok(ReadOutcome::NotModified { fingerprint }) => response::not_modified(&fingerprint),
        Ok(ReadOutcome::Fresh {
            pipeline,
            fingerprint,
        }) => {
            let body = representer::render(&pipeline, &request::host(req.headers()));
            response::ok_with_etag(&body, &fingerprint)
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// POST /api/admin/pipelines
pub async fn create(req: Request<Bytes>, state: Arc<AppState>) -> Response<Full<Bytes>> {
    let requester = request::requester(req.headers());
    let host = request::host(req.headers());

    let payload: CreatePayload = match request::parse_json(req.body()) {
        Ok(payload) => payload,
        Err(e) => return ApiError::from(e).into_response(),
    };
    let group = payload.group.unwrap_or_default();

    let (pipeline, fingerprint) =
        match create_pipeline(&state, &requester, &group, &payload.pipeline).await {
            Ok(created) => created,
            Err(e) => return rejected(e, &payload.pipeline),
        };

    let response = response::ok_with_etag(&representer::render(&pipeline, &host), &fingerprint);

    if state.settings.pause_on_create {
        pause_new_pipeline(&state, &requester, &pipeline.name).await;
    }

    state
        .audit
        .log(
            audit::PIPELINE_CREATED,
            &requester,
            &pipeline.name,
            json!({ "group": group, "etag": fingerprint.as_str() }),
        )
        .await;

    response
}

/// PUT /api/admin/pipelines/{name}
pub async fn update(
    req: Request<Bytes>,
    state: Arc<AppState>,
    name: &str,
) -> Response<Full<Bytes>> {
    let requester = request::requester(req.headers());
    let host = request::host(req.headers());
    let token = request::if_match(req.headers());

    let payload: UpdatePayload = match request::parse_json(req.body()) {
        Ok(payload) => payload,
        Err(e) => return ApiError::from(e).into_response(),
    };

    match update_pipeline(&state, &requester, name, token.as_deref(), &payload.pipeline).await {
        Ok((pipeline, fingerprint)) => {
            state
                .audit
                .log(
                    audit::PIPELINE_UPDATED,
                    &requester,
                    &pipeline.name,
                    json!({ "etag": fingerprint.as_str() }),
                )
                .await;
            response::ok_with_etag(&representer::render(&pipeline, &host), &fingerprint)
        }
        Err(e) => rejected(e, &payload.pipeline),
    }
}

/// Create `pipeline` in `group` and return it with its fresh validator.
pub async fn create_pipeline(
    state: &AppState,
    requester: &Requester,
    group: &str,
    pipeline: &PipelineConfig,
) -> PipeconfResult<(PipelineConfig, Fingerprint)> {
    let gateway = state.gateway();
    let _lock = state.guard.lock(&pipeline.name).await;

    if gateway.load(&pipeline.name).await?.is_some() {
        return Err(PipeconfError::PipelineExists(pipeline.name.clone()));
    }
    if group.trim().is_empty() {
        return Err(PipeconfError::GroupRequired);
    }
    pipeline.validate()?;

    gateway.create(requester, pipeline, group).await.into_result()?;
    info!(user = %requester, group = group, "Created pipeline {}", pipeline.name);

    state.guard.on_successful_write(&pipeline.name, None);
    fresh(state, &pipeline.name).await
}

/// Replace pipeline `name` with `pipeline` if `token` proves the caller saw
/// the current version.
///
/// The name stays locked from the token check until the new version has
/// been read back, so two writers holding the same token cannot both win.
pub async fn update_pipeline(
    state: &AppState,
    requester: &Requester,
    name: &str,
    token: Option<&str>,
    pipeline: &PipelineConfig,
) -> PipeconfResult<(PipelineConfig, Fingerprint)> {
    if !pipeline.is_named(name) {
        return Err(PipeconfError::RenameNotAllowed {
            path: name.to_string(),
            payload: pipeline.name.clone(),
        });
    }

    let _lock = state.guard.lock(name).await;
    state.guard.validate_before_write(name, token).await?;
    pipeline.validate()?;

    // Unlocked cache-hit readers see the entry vanish and retry under the lock
    state.guard.invalidate(name);
    state
        .gateway()
        .update(requester, pipeline)
        .await
        .into_result()?;
    info!(user = %requester, "Updated pipeline {}", name);

    state.guard.on_successful_write(name, None);
    fresh(state, name).await
}

/// Read back a pipeline written under its name lock
async fn fresh(state: &AppState, name: &str) -> PipeconfResult<(PipelineConfig, Fingerprint)> {
    match state.guard.read_locked(name, None).await? {
        ReadOutcome::Fresh {
            pipeline,
            fingerprint,
        } => Ok((pipeline, fingerprint)),
        ReadOutcome::NotModified { .. } => Err(PipeconfError::Internal(format!(
            "conditional read of {} without a validator",
            name
        ))),
    }
}

/// Pause a pipeline that was just persisted; failure only warns.
async fn pause_new_pipeline(state: &AppState, requester: &Requester, name: &str) {
    let cause = &state.settings.pause_cause;
    match state.pause.pause(name, cause, requester).await {
        Ok(()) => {
            state
                .audit
                .log(audit::PIPELINE_PAUSED, requester, name, json!({ "cause": cause }))
                .await;
        }
        Err(e) => warn!("Created pipeline {} but could not pause it: {}", name, e),
    }
}

fn rejected(err: PipeconfError, submitted: &PipelineConfig) -> Response<Full<Bytes>> {
    let data = serde_json::to_value(submitted).unwrap_or(Value::Null);
    ApiError::from(err).with_data(data).into_response()
}
