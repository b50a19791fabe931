use thiserror::Error;

/// Failures from the warehouse repository. Distinct from [`etl_core::CoreError`]
/// and [`etl_adapters::SourceError`] — this crate owns everything that talks
/// to Postgres.
#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Raised internally when a table has no declared column count; the
    /// batch-sizing path catches this, logs a warning, and falls back to a
    /// conservative column count rather than propagating it.
    #[error("column count unknown for table '{table}'")]
    ColumnCountUnknown { table: String },

    #[error("identifier '{identifier}' is not in the allowed set for this query")]
    InvalidIdentifier { identifier: String },

    #[error("operator '{operator}' is not a whitelisted comparison operator")]
    InvalidOperator { operator: String },
}
