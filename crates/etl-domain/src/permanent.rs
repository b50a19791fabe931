use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Static user properties: at most one row per `ehr_id`, written once and
/// left alone on every later sighting of the same user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermanentUserProperties {
    pub ehr_id: i64,
    pub first_login_at: Option<DateTime<Utc>>,
    pub gender: Option<String>,
    pub cohort_day: Option<i32>,
    pub cohort_week: Option<i32>,
    pub cohort_month: Option<i32>,
    pub registered_via_app: Option<bool>,
    pub start_version: Option<String>,
    pub source: Option<String>,
}

impl PermanentUserProperties {
    /// Column names in the order `WarehouseRepository` binds them, also the
    /// whitelist against which dynamic column lists are validated.
    pub const COLUMNS: &'static [&'static str] = &[
        "ehr_id",
        "first_login_at",
        "gender",
        "cohort_day",
        "cohort_week",
        "cohort_month",
        "registered_via_app",
        "start_version",
        "source",
    ];

    pub const TABLE: &'static str = "permanent_user_properties";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_match_struct_field_count() {
        assert_eq!(PermanentUserProperties::COLUMNS.len(), 9);
    }
}
