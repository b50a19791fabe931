//! End-to-end exercise of the transformation engine and change detector
//! through the root facade, with no database and no network involved —
//! the same scenarios §8 of the spec calls out, driven against the public
//! API a host binary would actually import.

use dwh_user_properties_etl::core::load_catalog;
use dwh_user_properties_etl::{transform_single_record, ChangeDecision, ChangeDetector, RawRecord, SourceTag};

const CATALOG_YAML: &str = r#"
permanent:
  - target: gender
    sources: ["Gender"]
    type: string
    value_map:
      Male: "m"
      Female: "f"
changeable:
  - target: age
    sources: ["AGE"]
    type: integer
  - target: push_permission
    sources: ["PUSH_PERMISSION"]
    type: boolean
    true_values: ["true", "1"]
    false_values: ["false", "0"]
    null_values: ["N/A"]
"#;

#[test]
fn s1_happy_archive_line_produces_both_projections() {
    let catalog = load_catalog(CATALOG_YAML).unwrap();
    let raw = RawRecord::from_json_line(
        r#"{"uuid":"11111111-1111-1111-1111-111111111111","event_time":"2024-05-01T10:00:00Z","user_properties":{"EHR_ID":"42","Gender":"Male"},"language":"ru","session_id":7}"#,
    )
    .unwrap();

    let out = transform_single_record(&raw, SourceTag::Archive, &catalog);
    assert!(out.errors.is_empty());

    let permanent = out.permanent.expect("ehr_id resolved, permanent must be built");
    assert_eq!(permanent.ehr_id, 42);
    assert_eq!(permanent.gender.as_deref(), Some("m"));

    let changeable = out.changeable.expect("changeable is always built");
    assert_eq!(changeable.ehr_id, Some(42));
    assert_eq!(changeable.language.as_deref(), Some("ru"));
    assert_eq!(changeable.session_id, Some(7));
}

#[test]
fn s2_unknown_key_rejects_the_record_with_no_projections() {
    let catalog = load_catalog(CATALOG_YAML).unwrap();
    let raw = RawRecord::from_json_line(
        r#"{"uuid":"11111111-1111-1111-1111-111111111111","event_time":"2024-05-01T10:00:00Z","user_properties":{"CompletelyNewKey":"x"}}"#,
    )
    .unwrap();

    let out = transform_single_record(&raw, SourceTag::Archive, &catalog);
    assert!(out.permanent.is_none());
    assert!(out.changeable.is_none());
    assert_eq!(out.errors.len(), 1);
    assert_eq!(out.errors[0].key, "CompletelyNewKey");
    assert_eq!(out.errors[0].value.as_deref(), Some("x"));
    assert_eq!(out.errors[0].reason, "Unknown key");

    // The host-visible message §7/S2 pins: "'CompletelyNewKey' = x (Unknown key)".
    let message = format!(
        "'{}' = {} ({})",
        out.errors[0].key,
        out.errors[0].value.as_deref().unwrap_or(""),
        out.errors[0].reason
    );
    assert_eq!(message, "'CompletelyNewKey' = x (Unknown key)");
}

#[test]
fn s3_sentinel_ehr_id_routes_into_the_null_partition() {
    let catalog = load_catalog(CATALOG_YAML).unwrap();
    let raw = RawRecord::from_json_line(
        r#"{"uuid":"11111111-1111-1111-1111-111111111111","event_time":"2024-05-01T10:00:00Z","user_properties":{"EHR_ID":"N/A"}}"#,
    )
    .unwrap();

    let out = transform_single_record(&raw, SourceTag::Archive, &catalog);
    assert!(out.permanent.is_none());
    let changeable = out.changeable.unwrap();
    assert_eq!(changeable.ehr_id, None);

    let mut detector = ChangeDetector::new();
    assert_eq!(detector.evaluate(changeable), ChangeDecision::FirstSighting);
}

#[test]
fn s5_change_detector_skips_a_second_flush_that_only_differs_in_ignored_fields() {
    let catalog = load_catalog(CATALOG_YAML).unwrap();
    let mut detector = ChangeDetector::new();

    let first = RawRecord::from_json_line(
        r#"{"uuid":"11111111-1111-1111-1111-111111111111","event_time":"2024-05-01T10:00:00Z","session_id":1,"user_properties":{"EHR_ID":"42","AGE":30}}"#,
    )
    .unwrap();
    let first_out = transform_single_record(&first, SourceTag::Archive, &catalog);
    assert_eq!(detector.evaluate(first_out.changeable.unwrap()), ChangeDecision::FirstSighting);

    // Same ehr_id, same age, only uuid/event_time/session_id differ.
    let second = RawRecord::from_json_line(
        r#"{"uuid":"22222222-2222-2222-2222-222222222222","event_time":"2024-05-02T10:00:00Z","session_id":99,"user_properties":{"EHR_ID":"42","AGE":30}}"#,
    )
    .unwrap();
    let second_out = transform_single_record(&second, SourceTag::Archive, &catalog);
    assert_eq!(detector.evaluate(second_out.changeable.unwrap()), ChangeDecision::Unchanged);

    // A later sighting with a real change is written.
    let third = RawRecord::from_json_line(
        r#"{"uuid":"33333333-3333-3333-3333-333333333333","event_time":"2024-05-03T10:00:00Z","session_id":1,"user_properties":{"EHR_ID":"42","AGE":31}}"#,
    )
    .unwrap();
    let third_out = transform_single_record(&third, SourceTag::Archive, &catalog);
    assert_eq!(detector.evaluate(third_out.changeable.unwrap()), ChangeDecision::Changed);
}

#[test]
fn transformer_is_deterministic_across_repeated_calls() {
    let catalog = load_catalog(CATALOG_YAML).unwrap();
    let raw = RawRecord::from_json_line(
        r#"{"uuid":"11111111-1111-1111-1111-111111111111","event_time":"2024-05-01T10:00:00Z","user_properties":{"EHR_ID":"42","Gender":"Male","AGE":30}}"#,
    )
    .unwrap();

    let first = transform_single_record(&raw, SourceTag::Archive, &catalog);
    let second = transform_single_record(&raw, SourceTag::Archive, &catalog);

    assert_eq!(first.permanent, second.permanent);
    assert_eq!(first.changeable, second.changeable);
    assert_eq!(first.errors, second.errors);
}
