//! Pipeline JSON representation with hypermedia links.

use crate::api::router::PIPELINES_PATH;
use crate::pipeline::PipelineConfig;
use serde_json::{json, Value};

/// Documentation for the pipeline config resource
pub const DOC_URL: &str = "https://api.gocd.org/#pipeline-config";

/// Render `pipeline` for a client that reached us at `host`.
///
/// Links are added after fingerprinting and never affect the validator.
pub fn render(pipeline: &PipelineConfig, host: &str) -> Value {
    let mut body = match serde_json::to_value(pipeline) {
        Ok(Value::Object(map)) => Value::Object(map),
        _ => json!({ "name": pipeline.name }),
    };

    body["_links"] = links(&pipeline.name, host);
    body
}

fn links(name: &str, host: &str) -> Value {
    let base = format!("http://{}{}", host, PIPELINES_PATH);
    json!({
        "self": { "href": format!("{}/{}", base, name) },
        "doc": { "href": DOC_URL },
        "find": { "href": format!("{}/:pipeline_name", base) },
    })
}
