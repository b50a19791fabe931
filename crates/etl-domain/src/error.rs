use thiserror::Error;

/// Errors raised while assembling a validated projection from already
/// extracted field values. These are distinct from `TransformationError`:
/// a `DomainError` means the extracted values cannot form a well-typed
/// `PermanentUserProperties` / `ChangeableUserProperties` at all (e.g. a
/// required field is structurally missing after extraction), whereas a
/// `TransformationError` is recorded per-field and the record may still
/// assemble around it.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_format() {
        let err = DomainError::MissingField("ehr_id");
        assert_eq!(err.to_string(), "missing required field: ehr_id");
    }

    #[test]
    fn invalid_format() {
        let err = DomainError::Invalid { field: "event_time", reason: "not ISO-8601".into() };
        assert_eq!(err.to_string(), "invalid value for event_time: not ISO-8601");
    }
}
