//! Drives the pipeline end to end: preloads the warehouse caches, reads
//! either an archive object or a staging-table window, transforms each
//! record, buffers projections, and flushes them in batches.

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod result;

pub use config::EtlConfig;
pub use error::OrchestratorError;
pub use orchestrator::Orchestrator;
pub use result::ProcessingOutcome;
