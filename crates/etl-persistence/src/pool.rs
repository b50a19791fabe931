use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::bootstrap::ensure_schema;
use crate::config::DbConfig;
use crate::error::WarehouseError;

/// Builds the pool described by `config` and runs schema bootstrap once
/// against it. Every connection handed out runs in autocommit — the pool
/// never opens an implicit transaction, so statement-level atomicity is
/// the ceiling (§4.4).
pub async fn build_pool(config: &DbConfig) -> Result<PgPool, WarehouseError> {
    let pool = PgPoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await?;
    ensure_schema(&pool).await?;
    Ok(pool)
}
