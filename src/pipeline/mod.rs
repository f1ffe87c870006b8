//! Pipeline definitions and the stores that hold them

pub mod config;
pub mod file_store;
pub mod gateway;
pub mod memory;
pub mod pause;
pub mod record;
#[cfg(test)]
pub(crate) mod testing;

pub use config::{name_key, names_match, validate_name, PipelineConfig};
pub use file_store::FilePipelineStore;
pub use gateway::{FailureKind, OperationResult, PipelineGateway, Requester};
pub use memory::MemoryPipelineStore;
pub use pause::{PauseInfo, PauseService, UNDER_CONSTRUCTION};
pub use record::PipelineRecord;
