//! Show command - read a pipeline and its ETag

use super::local;
use crate::api::PIPELINES_PATH;
use crate::cli::args::ShowArgs;
use crate::config::Config;
use crate::error::PipeconfResult;
use crate::ui::UiContext;
use bytes::Bytes;
use hyper::header::{HOST, IF_NONE_MATCH};
use hyper::Request;

/// Execute the show command
pub async fn execute(args: ShowArgs, config: &Config) -> PipeconfResult<()> {
    let ctx = UiContext::detect();
    let target = local::open_target(config, &ctx).await?;

    let mut builder = Request::get(format!("{}/{}", PIPELINES_PATH, args.name))
        .header(HOST, local::host(config));
    if let Some(etag) = &args.etag {
        builder = builder.header(IF_NONE_MATCH, format!("\"{}\"", local::unquote(etag)));
    }

    let reply = local::send(&target, local::build(builder, Bytes::new())?)
        .await?
        .into_success()?;
    local::print_reply(&ctx, &reply, args.format)
}
