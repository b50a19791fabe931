use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

/// One row of the `tmp_user_properties` staging table, as read back before
/// transformation. `user_properties_json` is the nested bag the transformer
/// extracts fields from; `language`, `session_id`, and `start_version` are
/// the same top-level passthrough fields an archive line carries, just
/// stored as their own staging columns instead of embedded in a JSON blob.
/// `migrated` tracks whether this row has already been folded into the
/// warehouse tables.
#[derive(Debug, Clone)]
pub struct StagingRow {
    pub uuid: Uuid,
    pub event_time: DateTime<Utc>,
    pub user_properties_json: Value,
    pub language: Option<String>,
    pub session_id: Option<i64>,
    pub start_version: Option<String>,
    pub migrated: bool,
}

impl StagingRow {
    pub const TABLE: &'static str = "tmp_user_properties";

    pub const COLUMNS: &'static [&'static str] = &[
        "uuid",
        "user_properties_json",
        "language",
        "session_id",
        "start_version",
        "event_time",
        "migrated",
    ];

    /// Reconstructs the record shape the transformer expects (the same
    /// top-level keys an archive line carries, with `user_properties_json`
    /// standing in for `user_properties`) so one transformer can drive both
    /// sources.
    pub fn to_raw_json(&self) -> Value {
        serde_json::json!({
            "uuid": self.uuid.to_string(),
            "event_time": self.event_time.to_rfc3339(),
            "language": self.language,
            "session_id": self.session_id,
            "start_version": self.start_version,
            "user_properties_json": self.user_properties_json,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw_record::{RawRecord, SourceTag};
    use chrono::TimeZone;

    #[test]
    fn to_raw_json_round_trips_through_raw_record() {
        let row = StagingRow {
            uuid: Uuid::new_v4(),
            event_time: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
            user_properties_json: serde_json::json!({"EHR_ID": "42"}),
            language: Some("ru".into()),
            session_id: Some(7),
            start_version: None,
            migrated: false,
        };

        let raw = RawRecord::from_value(row.to_raw_json());
        assert_eq!(raw.get("uuid").and_then(Value::as_str), Some(row.uuid.to_string()).as_deref());
        assert_eq!(raw.get("language").and_then(Value::as_str), Some("ru"));
        let bag = raw.nested_bag(SourceTag::Staging);
        assert_eq!(bag.get("EHR_ID").and_then(Value::as_str), Some("42"));
    }
}
