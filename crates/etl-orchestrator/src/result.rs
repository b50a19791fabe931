use serde::Serialize;

/// The structured outcome of one `process_archive`/`process_staging` run,
/// serialized verbatim as the host's response body. `Interrupted` is not a
/// Rust error: it is an expected, resumable stopping point, carried back as
/// data rather than propagated via `?` — mirroring the original project's
/// matching exception class, which callers caught and turned into a
/// normal (200-status) response rather than a failure.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ProcessingOutcome {
    Completed {
        processed: usize,
        errors: usize,
        last_successful_line: Option<i64>,
    },
    Interrupted {
        processed: usize,
        errors: usize,
        error_message: String,
        last_successful_line: Option<i64>,
        failed_line: Option<i64>,
        file_key: Option<String>,
    },
}

impl ProcessingOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ProcessingOutcome::Completed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_serializes_with_a_lowercase_status_tag() {
        let outcome =
            ProcessingOutcome::Completed { processed: 3, errors: 0, last_successful_line: Some(2) };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["processed"], 3);
        assert_eq!(json["last_successful_line"], 2);
    }

    #[test]
    fn interrupted_carries_the_failure_context() {
        let outcome = ProcessingOutcome::Interrupted {
            processed: 1,
            errors: 1,
            error_message: "'CompletelyNewKey' = x (Unknown key)".to_string(),
            last_successful_line: Some(0),
            failed_line: Some(1),
            file_key: Some("2024/05/01".to_string()),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "interrupted");
        assert_eq!(json["error_message"], "'CompletelyNewKey' = x (Unknown key)");
        assert_eq!(json["failed_line"], 1);
    }
}
