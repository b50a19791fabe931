use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Mutable user properties: append-only, one row per observed event. The
/// "current" value for an `ehr_id` is whichever row has the latest
/// `event_time` among rows sharing that `ehr_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeableUserProperties {
    pub ehr_id: Option<i64>,
    pub uuid: Uuid,
    pub event_time: DateTime<Utc>,
    pub language: Option<String>,
    pub age: Option<i32>,
    pub app_city: Option<String>,
    pub push_permission: Option<bool>,
    pub location_permission: Option<bool>,
    pub authorization_status: Option<bool>,
    pub telemed_files_sent: Option<i32>,
    pub appointments_cancelled: Option<i32>,
    pub telemed_files_received: Option<i32>,
    pub telemed_messages_received: Option<i32>,
    pub telemed_messages_sent: Option<i32>,
    pub telemed_consultations_resumed: Option<i32>,
    pub appointments_booked: Option<i32>,
    pub session_id: Option<i64>,
    pub start_version: Option<String>,
    pub ehr_count: Option<i32>,
    pub google_pay_available: Option<bool>,
}

impl ChangeableUserProperties {
    pub const COLUMNS: &'static [&'static str] = &[
        "ehr_id",
        "uuid",
        "event_time",
        "language",
        "age",
        "app_city",
        "push_permission",
        "location_permission",
        "authorization_status",
        "telemed_files_sent",
        "appointments_cancelled",
        "telemed_files_received",
        "telemed_messages_received",
        "telemed_messages_sent",
        "telemed_consultations_resumed",
        "appointments_booked",
        "session_id",
        "start_version",
        "ehr_count",
        "google_pay_available",
    ];

    pub const TABLE: &'static str = "changeable_user_properties";

    /// Fields the change detector ignores: identity/bookkeeping columns
    /// that vary on every sighting regardless of whether anything the user
    /// cares about actually changed.
    pub const IGNORED_FOR_CHANGE_DETECTION: &'static [&'static str] =
        &["uuid", "event_time", "session_id"];

    /// All fields compared by the change detector, i.e. `COLUMNS` minus
    /// [`Self::IGNORED_FOR_CHANGE_DETECTION`] (and `ehr_id`, the partition key).
    pub fn comparable_fields(&self) -> ComparableFields<'_> {
        ComparableFields(self)
    }
}

/// Borrowed view over the subset of [`ChangeableUserProperties`] fields the
/// change detector compares between the cached latest row and a candidate.
pub struct ComparableFields<'a>(&'a ChangeableUserProperties);

impl<'a> PartialEq for ComparableFields<'a> {
    fn eq(&self, other: &Self) -> bool {
        let (a, b) = (self.0, other.0);
        a.language == b.language
            && a.age == b.age
            && a.app_city == b.app_city
            && a.push_permission == b.push_permission
            && a.location_permission == b.location_permission
            && a.authorization_status == b.authorization_status
            && a.telemed_files_sent == b.telemed_files_sent
            && a.appointments_cancelled == b.appointments_cancelled
            && a.telemed_files_received == b.telemed_files_received
            && a.telemed_messages_received == b.telemed_messages_received
            && a.telemed_messages_sent == b.telemed_messages_sent
            && a.telemed_consultations_resumed == b.telemed_consultations_resumed
            && a.appointments_booked == b.appointments_booked
            && a.start_version == b.start_version
            && a.ehr_count == b.ehr_count
            && a.google_pay_available == b.google_pay_available
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(uuid: Uuid, event_time: DateTime<Utc>, age: Option<i32>) -> ChangeableUserProperties {
        ChangeableUserProperties {
            ehr_id: Some(1),
            uuid,
            event_time,
            language: Some("en".into()),
            age,
            app_city: None,
            push_permission: None,
            location_permission: None,
            authorization_status: None,
            telemed_files_sent: None,
            appointments_cancelled: None,
            telemed_files_received: None,
            telemed_messages_received: None,
            telemed_messages_sent: None,
            telemed_consultations_resumed: None,
            appointments_booked: None,
            session_id: Some(42),
            start_version: None,
            ehr_count: None,
            google_pay_available: None,
        }
    }

    #[test]
    fn identical_except_ignored_fields_compares_equal() {
        let t1 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let a = sample(Uuid::new_v4(), t1, Some(30));
        let mut b = sample(Uuid::new_v4(), t2, Some(30));
        b.session_id = Some(99);
        assert!(a.comparable_fields() == b.comparable_fields());
    }

    #[test]
    fn differing_comparable_field_compares_unequal() {
        let t1 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let a = sample(Uuid::new_v4(), t1, Some(30));
        let b = sample(Uuid::new_v4(), t1, Some(31));
        assert!(a.comparable_fields() != b.comparable_fields());
    }
}
