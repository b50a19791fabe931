use sqlx::PgPool;

use crate::error::WarehouseError;

/// Idempotent schema setup run once when a pool is constructed. Mirrors the
/// teacher's defensive "ensure core schema" pattern: this crate does not
/// assume a migration runner has already provisioned the database, but it
/// is not a general migration system either — no down-migrations, no
/// versioning table, just `CREATE TABLE IF NOT EXISTS`.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), WarehouseError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS permanent_user_properties (
            ehr_id BIGINT PRIMARY KEY,
            first_login_at TIMESTAMPTZ,
            gender TEXT,
            cohort_day INTEGER,
            cohort_week INTEGER,
            cohort_month INTEGER,
            registered_via_app BOOLEAN,
            start_version TEXT,
            source TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS changeable_user_properties (
            uuid UUID PRIMARY KEY,
            ehr_id BIGINT,
            event_time TIMESTAMPTZ NOT NULL,
            language TEXT,
            age INTEGER,
            app_city TEXT,
            push_permission BOOLEAN,
            location_permission BOOLEAN,
            authorization_status BOOLEAN,
            telemed_files_sent INTEGER,
            appointments_cancelled INTEGER,
            telemed_files_received INTEGER,
            telemed_messages_received INTEGER,
            telemed_messages_sent INTEGER,
            telemed_consultations_resumed INTEGER,
            appointments_booked INTEGER,
            session_id BIGINT,
            start_version TEXT,
            ehr_count INTEGER,
            google_pay_available BOOLEAN
        )
        "#,
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS changeable_user_properties_ehr_id_event_time_idx ON changeable_user_properties (ehr_id, event_time DESC)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tmp_user_properties (
            uuid UUID PRIMARY KEY,
            user_properties_json JSONB,
            language TEXT,
            session_id BIGINT,
            start_version TEXT,
            event_time TIMESTAMPTZ NOT NULL,
            migrated BOOLEAN NOT NULL DEFAULT FALSE
        )
        "#,
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS tmp_user_properties_migrated_event_time_idx ON tmp_user_properties (migrated, event_time)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
