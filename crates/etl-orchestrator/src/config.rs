//! Pipeline sizing, read from the environment.

use std::env;

/// Flush-trigger sizing for the orchestrator's in-memory buffers, read
/// from `ETL_BATCH_SIZE`.
#[derive(Debug, Clone, Copy)]
pub struct EtlConfig {
    pub batch_size: usize,
}

impl EtlConfig {
    pub fn from_env() -> Self {
        let batch_size = env::var("ETL_BATCH_SIZE").ok().and_then(|v| v.parse().ok()).unwrap_or(500);
        Self { batch_size }
    }
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self { batch_size: 500 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_batch_size_is_five_hundred() {
        assert_eq!(EtlConfig::default().batch_size, 500);
    }
}
