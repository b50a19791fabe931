//! Connection and batching configuration, read from the environment.
//! Mirrors the teacher's `DbConfig::from_env` pattern: a lazily-loaded
//! `.env` guard plus an immutable struct built once per process.

use std::env;

use dotenvy::dotenv;
use once_cell::sync::Lazy;

static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv();
});

/// Forces `.env` loading; harmless to call more than once or from a
/// process with no `.env` file present.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Database connection and batch-insert sizing, per §6/§4.7 of the spec.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub min_connections: u32,
    pub max_connections: u32,
    /// Upper bound on statement placeholder count (wire-protocol ceiling).
    pub max_params_per_query: usize,
    /// Explicit row cap per multi-row insert, independent of the
    /// placeholder ceiling.
    pub max_rows_per_insert: usize,
    /// Multiplier in (0, 1] applied to the theoretical row cap derived
    /// from `max_params_per_query`.
    pub safety_factor: f64,
}

impl DbConfig {
    pub fn from_env() -> Self {
        init_dotenv();
        Self {
            url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            min_connections: env_parsed("DATABASE_MIN_CONNECTIONS", 2),
            max_connections: env_parsed("DATABASE_MAX_CONNECTIONS", 16),
            max_params_per_query: env_parsed("DB_MAX_PARAMS_PER_QUERY", 65_535),
            max_rows_per_insert: env_parsed("DB_MAX_ROWS_PER_INSERT", 1_000),
            safety_factor: env_parsed("DB_SAFETY_FACTOR", 0.9),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_only_url_is_set() {
        // Not exercised against real env vars to avoid cross-test
        // interference; verifies the parsing helper's fallback directly.
        assert_eq!(env_parsed::<usize>("ETL_PERSISTENCE_TEST_UNSET_VAR", 65_535), 65_535);
        assert_eq!(env_parsed::<f64>("ETL_PERSISTENCE_TEST_UNSET_VAR", 0.9), 0.9);
    }
}
