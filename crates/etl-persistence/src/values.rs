use chrono::{DateTime, Utc};
use sqlx::postgres::{PgArguments, Postgres};
use sqlx::query::Query;
use uuid::Uuid;

use etl_domain::{ChangeableUserProperties, PermanentUserProperties};

/// One bound parameter for a dynamic insert or select, typed precisely
/// enough that binding it never leaves Postgres guessing a parameter's
/// type — unlike a single `Option<String>` stand-in for every column,
/// which would misbind on non-text columns whenever the value is null.
#[derive(Debug, Clone)]
pub enum ColumnValue {
    Text(Option<String>),
    I32(Option<i32>),
    I64(Option<i64>),
    Bool(Option<bool>),
    Timestamptz(Option<DateTime<Utc>>),
    Uuid(Uuid),
}

/// Folds one [`ColumnValue`] onto an in-progress parameterized query.
pub(crate) fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: ColumnValue,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        ColumnValue::Text(v) => query.bind(v),
        ColumnValue::I32(v) => query.bind(v),
        ColumnValue::I64(v) => query.bind(v),
        ColumnValue::Bool(v) => query.bind(v),
        ColumnValue::Timestamptz(v) => query.bind(v),
        ColumnValue::Uuid(v) => query.bind(v),
    }
}

/// Row values for `permanent_user_properties`, in [`PermanentUserProperties::COLUMNS`] order.
pub fn permanent_row_values(p: &PermanentUserProperties) -> Vec<ColumnValue> {
    vec![
        ColumnValue::I64(Some(p.ehr_id)),
        ColumnValue::Timestamptz(p.first_login_at),
        ColumnValue::Text(p.gender.clone()),
        ColumnValue::I32(p.cohort_day),
        ColumnValue::I32(p.cohort_week),
        ColumnValue::I32(p.cohort_month),
        ColumnValue::Bool(p.registered_via_app),
        ColumnValue::Text(p.start_version.clone()),
        ColumnValue::Text(p.source.clone()),
    ]
}

/// Row values for `changeable_user_properties`, in [`ChangeableUserProperties::COLUMNS`] order.
pub fn changeable_row_values(c: &ChangeableUserProperties) -> Vec<ColumnValue> {
    vec![
        ColumnValue::I64(c.ehr_id),
        ColumnValue::Uuid(c.uuid),
        ColumnValue::Timestamptz(Some(c.event_time)),
        ColumnValue::Text(c.language.clone()),
        ColumnValue::I32(c.age),
        ColumnValue::Text(c.app_city.clone()),
        ColumnValue::Bool(c.push_permission),
        ColumnValue::Bool(c.location_permission),
        ColumnValue::Bool(c.authorization_status),
        ColumnValue::I32(c.telemed_files_sent),
        ColumnValue::I32(c.appointments_cancelled),
        ColumnValue::I32(c.telemed_files_received),
        ColumnValue::I32(c.telemed_messages_received),
        ColumnValue::I32(c.telemed_messages_sent),
        ColumnValue::I32(c.telemed_consultations_resumed),
        ColumnValue::I32(c.appointments_booked),
        ColumnValue::I64(c.session_id),
        ColumnValue::Text(c.start_version.clone()),
        ColumnValue::I32(c.ehr_count),
        ColumnValue::Bool(c.google_pay_available),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permanent_row_values_matches_column_count() {
        let p = PermanentUserProperties {
            ehr_id: 1,
            first_login_at: None,
            gender: None,
            cohort_day: None,
            cohort_week: None,
            cohort_month: None,
            registered_via_app: None,
            start_version: None,
            source: None,
        };
        assert_eq!(permanent_row_values(&p).len(), PermanentUserProperties::COLUMNS.len());
    }

    #[test]
    fn changeable_row_values_matches_column_count() {
        let c = ChangeableUserProperties {
            ehr_id: None,
            uuid: Uuid::new_v4(),
            event_time: Utc::now(),
            language: None,
            age: None,
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
            session_id: None,
            start_version: None,
            ehr_count: None,
            google_pay_available: None,
        };
        assert_eq!(changeable_row_values(&c).len(), ChangeableUserProperties::COLUMNS.len());
    }
}
