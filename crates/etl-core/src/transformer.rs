use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use etl_domain::mapping::{FieldMapping, FieldType};
use etl_domain::{ChangeableUserProperties, MappingCatalog, PermanentUserProperties, RawRecord, SourceTag};
use serde_json::{Map, Value};
use uuid::Uuid;

/// One extraction problem surfaced for a single record. Distinct from a
/// Rust `Err`: a record can carry zero, one, or many of these and still
/// produce a transformed projection around the rest.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformError {
    pub key: String,
    pub value: Option<String>,
    pub reason: String,
}

impl TransformError {
    fn new(key: impl Into<String>, value: Option<String>, reason: impl Into<String>) -> Self {
        Self { key: key.into(), value, reason: reason.into() }
    }
}

/// Result of transforming one raw record: up to two typed projections plus
/// whatever extraction problems were observed along the way.
#[derive(Debug, Default)]
pub struct TransformOutput {
    pub permanent: Option<PermanentUserProperties>,
    pub changeable: Option<ChangeableUserProperties>,
    pub errors: Vec<TransformError>,
}

fn value_to_display(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn is_present(value: &Value) -> bool {
    !matches!(value, Value::Null) && value.as_str() != Some("N/A")
}

fn value_to_loose_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Extracts and coerces one mapped field's value out of the nested
/// property bag (falling back to the outer record for sources the catalog
/// never declared), applying the mapping's declared type, transform,
/// value map, regex extraction, and boolean vocabulary.
fn extract_value(
    field: &FieldMapping,
    user_props: &Map<String, Value>,
    raw: &RawRecord,
    known_keys: &HashSet<String>,
    errors: &mut Vec<TransformError>,
) -> Value {
    let mut found: Option<Value> = None;
    for source in &field.sources {
        let candidate = if known_keys.contains(source) {
            user_props.get(source).cloned()
        } else {
            raw.get(source).cloned()
        };
        if let Some(v) = candidate {
            if is_present(&v) {
                found = Some(v);
                break;
            }
        }
    }

    let Some(value) = found else {
        return Value::Null;
    };

    match field.field_type {
        FieldType::String => {
            let mut s = match value_to_loose_string(&value) {
                Some(s) => s,
                None => return Value::Null,
            };
            if field.transform.as_deref() == Some("lowercase_first") {
                s = s.to_lowercase();
            }
            if let Some(mapped) = field.value_map.get(&s) {
                s = mapped.clone();
            }
            Value::String(s)
        }
        FieldType::Integer => {
            let mut s = match value_to_loose_string(&value) {
                Some(s) => s,
                None => value.to_string(),
            };
            if let Some(pattern) = &field.extract_regex {
                if let Ok(re) = regex::Regex::new(pattern) {
                    if let Some(m) = re.find(&s) {
                        s = m.as_str().to_string();
                    }
                }
            }
            match s.parse::<i64>() {
                Ok(n) => Value::from(n),
                Err(_) => {
                    errors.push(TransformError::new(
                        field.target.clone(),
                        value_to_display(&value),
                        "Invalid integer",
                    ));
                    Value::Null
                }
            }
        }
        FieldType::Boolean => {
            let s = value_to_loose_string(&value).unwrap_or_default();
            if field.true_values.contains(&s) {
                Value::Bool(true)
            } else if field.false_values.contains(&s) {
                Value::Bool(false)
            } else if field.null_values.contains(&s) {
                Value::Null
            } else {
                errors.push(TransformError::new(
                    field.target.clone(),
                    value_to_display(&value),
                    "Invalid boolean",
                ));
                Value::Null
            }
        }
    }
}

fn take_string(map: &HashMap<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(value_to_loose_string)
}

fn take_i32(map: &HashMap<String, Value>, key: &str) -> Option<i32> {
    map.get(key).and_then(value_to_i64).and_then(|n| i32::try_from(n).ok())
}

fn take_bool(map: &HashMap<String, Value>, key: &str) -> Option<bool> {
    match map.get(key) {
        Some(Value::Bool(b)) => Some(*b),
        _ => None,
    }
}

/// Extracts a typed projection plus any per-field errors out of one raw
/// record. `source` picks which top-level key holds the nested
/// user-property bag; every other piece of shared context (uuid,
/// event_time, language, session_id, start_version) is read straight off
/// the outer record, matching both source shapes.
pub fn transform_single_record(raw: &RawRecord, source: SourceTag, catalog: &MappingCatalog) -> TransformOutput {
    let mut errors = Vec::new();

    let uuid = match raw.get("uuid") {
        Some(Value::String(s)) => match Uuid::parse_str(s) {
            Ok(u) => u,
            Err(_) => {
                errors.push(TransformError::new("uuid", Some(s.clone()), "Invalid UUID format"));
                return TransformOutput { permanent: None, changeable: None, errors };
            }
        },
        other => {
            errors.push(TransformError::new(
                "uuid",
                other.and_then(value_to_display),
                "Expected str or UUID",
            ));
            return TransformOutput { permanent: None, changeable: None, errors };
        }
    };

    let event_time = match raw.get("event_time") {
        None | Some(Value::Null) => {
            errors.push(TransformError::new("event_time", None, "Missing event_time"));
            return TransformOutput { permanent: None, changeable: None, errors };
        }
        Some(Value::String(s)) => match DateTime::parse_from_rfc3339(s) {
            Ok(dt) => dt.with_timezone(&Utc),
            Err(_) => {
                errors.push(TransformError::new("event_time", Some(s.clone()), "Invalid ISO datetime"));
                return TransformOutput { permanent: None, changeable: None, errors };
            }
        },
        Some(other) => {
            errors.push(TransformError::new("event_time", value_to_display(other), "Unsupported type"));
            return TransformOutput { permanent: None, changeable: None, errors };
        }
    };

    let language = raw.get("language").and_then(value_to_loose_string);
    let session_id = raw.get("session_id").and_then(value_to_i64);
    let start_version = raw.get("start_version").and_then(value_to_loose_string);

    let user_props = raw.nested_bag(source);
    let known_keys = catalog.known_keys();

    let unknown: Vec<&String> = user_props.keys().filter(|k| !known_keys.contains(*k)).collect();
    if !unknown.is_empty() {
        for key in unknown {
            errors.push(TransformError::new(
                key.clone(),
                user_props.get(key).and_then(value_to_display),
                "Unknown key",
            ));
        }
        return TransformOutput { permanent: None, changeable: None, errors };
    }

    let ehr_id: Option<i64> = match user_props.get("EHR_ID") {
        None => None,
        Some(v) if matches!(v, Value::Null) => None,
        Some(Value::String(s)) if s == "N/A" || s == "no ehr" || s == "no_ehr" => None,
        Some(v) => match value_to_i64(v) {
            Some(n) => Some(n),
            None => {
                errors.push(TransformError::new("EHR_ID", value_to_display(v), "Invalid integer"));
                None
            }
        },
    };

    let mut permanent_data: HashMap<String, Value> = HashMap::new();
    for field in &catalog.permanent {
        let value = extract_value(field, &user_props, raw, known_keys, &mut errors);
        permanent_data.insert(field.target.clone(), value);
    }

    let mut changeable_data: HashMap<String, Value> = HashMap::new();
    for field in &catalog.changeable {
        let value = extract_value(field, &user_props, raw, known_keys, &mut errors);
        changeable_data.insert(field.target.clone(), value);
    }

    let permanent = ehr_id.map(|id| PermanentUserProperties {
        ehr_id: id,
        first_login_at: Some(event_time),
        gender: take_string(&permanent_data, "gender"),
        cohort_day: take_i32(&permanent_data, "cohort_day"),
        cohort_week: take_i32(&permanent_data, "cohort_week"),
        cohort_month: take_i32(&permanent_data, "cohort_month"),
        registered_via_app: take_bool(&permanent_data, "registered_via_app"),
        start_version: take_string(&permanent_data, "start_version"),
        source: take_string(&permanent_data, "source"),
    });

    let changeable = Some(ChangeableUserProperties {
        ehr_id,
        uuid,
        event_time,
        language,
        age: take_i32(&changeable_data, "age"),
        app_city: take_string(&changeable_data, "app_city"),
        push_permission: take_bool(&changeable_data, "push_permission"),
        location_permission: take_bool(&changeable_data, "location_permission"),
        authorization_status: take_bool(&changeable_data, "authorization_status"),
        telemed_files_sent: take_i32(&changeable_data, "telemed_files_sent"),
        appointments_cancelled: take_i32(&changeable_data, "appointments_cancelled"),
        telemed_files_received: take_i32(&changeable_data, "telemed_files_received"),
        telemed_messages_received: take_i32(&changeable_data, "telemed_messages_received"),
        telemed_messages_sent: take_i32(&changeable_data, "telemed_messages_sent"),
        telemed_consultations_resumed: take_i32(&changeable_data, "telemed_consultations_resumed"),
        appointments_booked: take_i32(&changeable_data, "appointments_booked"),
        session_id,
        start_version,
        ehr_count: take_i32(&changeable_data, "ehr_count"),
        google_pay_available: take_bool(&changeable_data, "google_pay_available"),
    });

    TransformOutput { permanent, changeable, errors }
}

#[cfg(test)]
mod tests {
    use super::*;
    use etl_core_test_support::catalog_with;

    mod etl_core_test_support {
        use etl_domain::mapping::{FieldMapping, FieldType};
        use etl_domain::MappingCatalog;
        use std::collections::HashMap;

        pub fn catalog_with(permanent: Vec<FieldMapping>, changeable: Vec<FieldMapping>) -> MappingCatalog {
            MappingCatalog::new(permanent, changeable)
        }

        #[allow(dead_code)]
        pub fn mapping(target: &str, sources: &[&str], ty: FieldType) -> FieldMapping {
            FieldMapping {
                target: target.to_string(),
                sources: sources.iter().map(|s| s.to_string()).collect(),
                field_type: ty,
                transform: None,
                value_map: HashMap::new(),
                extract_regex: None,
                true_values: vec![],
                false_values: vec![],
                null_values: vec![],
            }
        }
    }

    fn mapping(target: &str, sources: &[&str], ty: FieldType) -> FieldMapping {
        etl_core_test_support::mapping(target, sources, ty)
    }

    #[test]
    fn rejects_malformed_uuid() {
        let raw = RawRecord::from_json_line(r#"{"uuid":"not-a-uuid","event_time":"2024-01-01T00:00:00Z"}"#).unwrap();
        let catalog = catalog_with(vec![], vec![]);
        let out = transform_single_record(&raw, SourceTag::Archive, &catalog);
        assert!(out.permanent.is_none());
        assert!(out.changeable.is_none());
        assert_eq!(out.errors[0].key, "uuid");
    }

    #[test]
    fn unknown_key_short_circuits_with_no_projections() {
        let raw = RawRecord::from_json_line(
            r#"{"uuid":"11111111-1111-1111-1111-111111111111","event_time":"2024-01-01T00:00:00Z","user_properties":{"MYSTERY":"x"}}"#,
        )
        .unwrap();
        let catalog = catalog_with(vec![], vec![]);
        let out = transform_single_record(&raw, SourceTag::Archive, &catalog);
        assert!(out.permanent.is_none());
        assert!(out.changeable.is_none());
        assert_eq!(out.errors[0].reason, "Unknown key");
    }

    #[test]
    fn builds_permanent_only_when_ehr_id_present() {
        let raw = RawRecord::from_json_line(
            r#"{"uuid":"11111111-1111-1111-1111-111111111111","event_time":"2024-01-01T00:00:00Z","user_properties":{"EHR_ID":"42","GENDER":"F"}}"#,
        )
        .unwrap();
        let catalog = catalog_with(vec![mapping("gender", &["GENDER"], FieldType::String)], vec![]);
        let out = transform_single_record(&raw, SourceTag::Archive, &catalog);
        let permanent = out.permanent.expect("permanent should be built");
        assert_eq!(permanent.ehr_id, 42);
        assert_eq!(permanent.gender.as_deref(), Some("f"));
    }

    #[test]
    fn sentinel_ehr_id_values_become_none_without_error() {
        let raw = RawRecord::from_json_line(
            r#"{"uuid":"11111111-1111-1111-1111-111111111111","event_time":"2024-01-01T00:00:00Z","user_properties":{"EHR_ID":"no ehr"}}"#,
        )
        .unwrap();
        let catalog = catalog_with(vec![], vec![]);
        let out = transform_single_record(&raw, SourceTag::Archive, &catalog);
        assert!(out.permanent.is_none());
        assert!(out.changeable.unwrap().ehr_id.is_none());
        assert!(out.errors.is_empty());
    }

    #[test]
    fn boolean_vocabulary_mismatch_is_recorded_and_nulled() {
        let raw = RawRecord::from_json_line(
            r#"{"uuid":"11111111-1111-1111-1111-111111111111","event_time":"2024-01-01T00:00:00Z","user_properties":{"PUSH":"maybe"}}"#,
        )
        .unwrap();
        let mut field = mapping("push_permission", &["PUSH"], FieldType::Boolean);
        field.true_values = vec!["yes".into()];
        field.false_values = vec!["no".into()];
        let catalog = catalog_with(vec![], vec![field]);
        let out = transform_single_record(&raw, SourceTag::Archive, &catalog);
        assert_eq!(out.changeable.unwrap().push_permission, None);
        assert_eq!(out.errors[0].reason, "Invalid boolean");
    }
}
