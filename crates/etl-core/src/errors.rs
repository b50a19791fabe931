use thiserror::Error;

/// Catalog- and config-level failures. Per-record extraction problems are
/// never represented here; they are reported as [`crate::transformer::TransformError`]
/// entries attached to a transformed record, not as a Rust `Err`.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("failed to parse mapping catalog: {0}")]
    CatalogParse(#[from] serde_yaml::Error),

    #[error("catalog entry '{target}' has no sources")]
    EmptySources { target: String },

    #[error(
        "catalog entry '{target}' has ambiguous boolean vocabulary: '{value}' appears in more than one of true_values/false_values/null_values"
    )]
    AmbiguousBooleanVocabulary { target: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sources_format() {
        let err = CoreError::EmptySources { target: "gender".into() };
        assert_eq!(err.to_string(), "catalog entry 'gender' has no sources");
    }

    #[test]
    fn ambiguous_boolean_format() {
        let err = CoreError::AmbiguousBooleanVocabulary {
            target: "push_permission".into(),
            value: "unknown".into(),
        };
        assert_eq!(
            err.to_string(),
            "catalog entry 'push_permission' has ambiguous boolean vocabulary: 'unknown' appears in more than one of true_values/false_values/null_values"
        );
    }
}
