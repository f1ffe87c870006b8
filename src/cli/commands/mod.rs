//! CLI command implementations

pub mod config;
pub mod create;
pub mod local;
pub mod serve;
pub mod show;
pub mod update;

pub use config::execute as config;
pub use create::execute as create;
pub use serve::execute as serve;
pub use show::execute as show;
pub use update::execute as update;
