//! Terminal output for the CLI
//!
//! Uses `cliclack` log lines in an interactive terminal and falls back to
//! plain bracketed status lines in CI or when output is piped.

mod context;
mod output;

pub use context::UiContext;
pub use output::{
    key_value, key_value_status, remark, step_error_detail, step_info, step_ok, step_ok_detail,
    step_warn, step_warn_hint,
};
