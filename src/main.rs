//! Demo entry point: runs the transformation engine and change detector
//! in-memory, end to end, against a couple of hand-written records — no
//! database or network required. Production runs go through `etl-cli`,
//! which wires the same pieces to a real warehouse pool and source.

use dwh_user_properties_etl::core::load_catalog;
use dwh_user_properties_etl::{transform_single_record, ChangeDecision, ChangeDetector, RawRecord, SourceTag};

const DEMO_CATALOG: &str = r#"
permanent:
  - target: gender
    sources: ["GENDER"]
    type: string
  - target: registered_via_app
    sources: ["REGISTERED_VIA_APP"]
    type: boolean
    true_values: ["true", "1"]
    false_values: ["false", "0"]
    null_values: ["N/A"]
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

fn main() {
    env_logger::init();

    let catalog = load_catalog(DEMO_CATALOG).expect("demo catalog is well-formed");
    let mut detector = ChangeDetector::new();

    let first = RawRecord::from_json_line(
        r#"{"uuid":"11111111-1111-1111-1111-111111111111","event_time":"2024-05-01T10:00:00Z","language":"en","session_id":1,"start_version":"1.0.0","user_properties":{"EHR_ID":"42","GENDER":"f","REGISTERED_VIA_APP":"true","AGE":30,"PUSH_PERMISSION":"true"}}"#,
    )
    .expect("demo line is valid JSON");

    let second = RawRecord::from_json_line(
        r#"{"uuid":"22222222-2222-2222-2222-222222222222","event_time":"2024-05-02T10:00:00Z","language":"en","session_id":2,"start_version":"1.0.0","user_properties":{"EHR_ID":"42","GENDER":"f","REGISTERED_VIA_APP":"true","AGE":31,"PUSH_PERMISSION":"true"}}"#,
    )
    .expect("demo line is valid JSON");

    for (label, raw) in [("first sighting", &first), ("later sighting", &second)] {
        let output = transform_single_record(raw, SourceTag::Archive, &catalog);
        if !output.errors.is_empty() {
            println!("{label}: transformation errors: {:?}", output.errors);
            continue;
        }

        if let Some(permanent) = &output.permanent {
            println!("{label}: permanent projection for ehr_id={}", permanent.ehr_id);
        }

        if let Some(changeable) = output.changeable {
            let decision = detector.evaluate(changeable);
            match decision {
                ChangeDecision::FirstSighting => println!("{label}: first sighting, row written"),
                ChangeDecision::Changed => println!("{label}: state changed, row written"),
                ChangeDecision::Unchanged => println!("{label}: unchanged, skipped"),
                ChangeDecision::StaleEvent => println!("{label}: stale event, skipped"),
            }
        }
    }
}
