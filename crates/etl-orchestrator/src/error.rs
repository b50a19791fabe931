use thiserror::Error;

use etl_adapters::SourceError;
use etl_persistence::WarehouseError;

/// Failures that abort a run outright — as opposed to a transformation
/// error, which is expected data and surfaces through
/// [`crate::result::ProcessingOutcome::Interrupted`] instead of `Err`.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    #[error(transparent)]
    Source(#[from] SourceError),
}
