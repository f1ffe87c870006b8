//! Update command - replace a pipeline definition
//!
//! The ETag from the last read is turned into an `If-Match` precondition the
//! same way any compatible client does it.

use super::local;
use crate::api::{request::USER_HEADER, PIPELINES_PATH};
use crate::cache::FingerprintComputer;
use crate::cli::args::UpdateArgs;
use crate::config::Config;
use crate::error::PipeconfResult;
use crate::ui::{self, UiContext};
use bytes::Bytes;
use hyper::header::{CONTENT_TYPE, HOST, IF_MATCH};
use hyper::Request;
use serde_json::json;

/// `If-Match` value for an update based on a read that returned `etag`
pub fn if_match_for(computer: &FingerprintComputer, etag: &str) -> String {
    format!("\"{}\"", computer.precondition_token(local::unquote(etag)))
}

/// Execute the update command
pub async fn execute(args: UpdateArgs, config: &Config) -> PipeconfResult<()> {
    let ctx = UiContext::detect();
    let pipeline = local::read_definition(&args.file).await?;
    let target = local::open_target(config, &ctx).await?;

    let computer = FingerprintComputer::new(config.etag.algorithm);
    let body = json!({ "pipeline": pipeline });
    let builder = Request::put(format!("{}/{}", PIPELINES_PATH, args.name))
        .header(HOST, local::host(config))
        .header(CONTENT_TYPE, "application/json")
        .header(IF_MATCH, if_match_for(&computer, &args.etag))
        .header(USER_HEADER, local::requester_name(args.user));

    let reply = local::send(&target, local::build(builder, Bytes::from(body.to_string()))?)
        .await?
        .into_success()?;

    ui::step_ok(&ctx, "Pipeline updated");
    local::print_reply(&ctx, &reply, args.format)
}
