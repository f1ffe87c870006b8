//! Create command - add a pipeline to a group

use super::local;
use crate::api::{request::USER_HEADER, PIPELINES_PATH};
use crate::cli::args::CreateArgs;
use crate::config::Config;
use crate::error::PipeconfResult;
use crate::ui::{self, UiContext};
use bytes::Bytes;
use hyper::header::{CONTENT_TYPE, HOST};
use hyper::Request;
use serde_json::json;

/// Execute the create command
pub async fn execute(args: CreateArgs, config: &Config) -> PipeconfResult<()> {
    let ctx = UiContext::detect();
    let pipeline = local::read_definition(&args.file).await?;
    let target = local::open_target(config, &ctx).await?;

    let body = json!({ "group": args.group, "pipeline": pipeline });
    let builder = Request::post(PIPELINES_PATH)
        .header(HOST, local::host(config))
        .header(CONTENT_TYPE, "application/json")
        .header(USER_HEADER, local::requester_name(args.user));

    let reply = local::send(&target, local::build(builder, Bytes::from(body.to_string()))?)
        .await?
        .into_success()?;

    ui::step_ok(&ctx, "Pipeline created");
    if config.pipelines.pause_on_create {
        ui::remark(&ctx, &format!("Paused: {}", config.pipelines.pause_cause));
    }
    local::print_reply(&ctx, &reply, args.format)
}
