//! Facade over the workspace: re-exports the pieces a host binary needs to
//! wire together one ETL run, so `etl-runner` (and any other host) can
//! depend on this single crate instead of naming every sub-crate.

pub use etl_adapters::{
    self as adapters, AmplitudeClient, AmplitudeConfig, AmplitudeCredentials, AmplitudeSource, ObjectStore,
    S3ObjectStore, SourceError,
};
pub use etl_core::{self as core, load_catalog, transform_single_record, ChangeDecision, ChangeDetector, CoreError};
pub use etl_domain::{
    self as domain, ChangeableUserProperties, DomainError, MappingCatalog, PermanentUserProperties, RawRecord,
    SourceTag, StagingRow,
};
pub use etl_orchestrator::{self as orchestrator, EtlConfig, Orchestrator, OrchestratorError, ProcessingOutcome};
pub use etl_persistence::{
    self as persistence, build_pool, DbConfig, WarehouseError, WarehouseRepository,
};
