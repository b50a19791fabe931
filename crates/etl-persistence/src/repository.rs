use std::collections::{HashMap, HashSet};

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use etl_domain::{ChangeableUserProperties, PermanentUserProperties, StagingRow};

use crate::config::DbConfig;
use crate::error::WarehouseError;
use crate::schema::{self, KNOWN_TABLES};
use crate::values::{bind_value, changeable_row_values, permanent_row_values, ColumnValue};

/// The row-count / placeholder-count ceilings `insert_batch` sizes chunks
/// against (§4.4, §6).
#[derive(Debug, Clone, Copy)]
pub struct BatchLimits {
    pub max_params_per_query: usize,
    pub max_rows_per_insert: usize,
    pub safety_factor: f64,
}

impl From<&DbConfig> for BatchLimits {
    fn from(config: &DbConfig) -> Self {
        Self {
            max_params_per_query: config.max_params_per_query,
            max_rows_per_insert: config.max_rows_per_insert,
            safety_factor: config.safety_factor,
        }
    }
}

/// `ON CONFLICT` behavior for an insert. Only `DO NOTHING` is needed by
/// this system (permanent-user-property dedup); it is still modeled as an
/// enum so a future conflict action doesn't require reshaping every call
/// site.
#[derive(Debug, Clone, Copy)]
pub enum ConflictAction {
    DoNothing,
}

#[derive(Debug, Clone)]
pub struct OnConflict {
    pub conflict_target: Vec<&'static str>,
    pub action: ConflictAction,
}

/// Which Rust type a `RETURNING` column decodes into.
#[derive(Debug, Clone, Copy)]
pub enum ReturningKind {
    I64,
    Uuid,
}

#[derive(Debug, Clone)]
pub enum ReturnedValue {
    I64(i64),
    Uuid(Uuid),
}

/// Computes the maximum row count per insert statement for a table with
/// `columns` columns, per §4.4's `theoretical`/`safe`/`rows_per_batch`
/// formula. Always at least 1, so a single pathologically wide row still
/// gets its own statement instead of never being inserted.
pub fn rows_per_batch(limits: &BatchLimits, columns: usize) -> usize {
    let theoretical = limits.max_params_per_query / columns.max(1);
    let safe = (theoretical as f64 * limits.safety_factor).floor() as usize;
    safe.min(limits.max_rows_per_insert).max(1)
}

fn build_insert_sql(
    table: &str,
    columns: &[&str],
    n_rows: usize,
    on_conflict: Option<&OnConflict>,
    returning: Option<&str>,
) -> String {
    let col_list = columns.iter().map(|c| format!("\"{c}\"")).collect::<Vec<_>>().join(", ");
    let mut placeholder_idx = 1usize;
    let mut value_groups = Vec::with_capacity(n_rows);
    for _ in 0..n_rows {
        let placeholders: Vec<String> = (0..columns.len())
            .map(|_| {
                let p = format!("${placeholder_idx}");
                placeholder_idx += 1;
                p
            })
            .collect();
        value_groups.push(format!("({})", placeholders.join(", ")));
    }

    let mut sql = format!("INSERT INTO \"{table}\" ({col_list}) VALUES {}", value_groups.join(", "));

    if let Some(oc) = on_conflict {
        let target = oc.conflict_target.iter().map(|c| format!("\"{c}\"")).collect::<Vec<_>>().join(", ");
        match oc.action {
            ConflictAction::DoNothing => sql.push_str(&format!(" ON CONFLICT ({target}) DO NOTHING")),
        }
    }

    if let Some(col) = returning {
        sql.push_str(&format!(" RETURNING \"{col}\""));
    }

    sql
}

fn extract_returned(row: &PgRow, column: &str, kind: ReturningKind) -> Result<ReturnedValue, WarehouseError> {
    Ok(match kind {
        ReturningKind::I64 => ReturnedValue::I64(row.try_get(column)?),
        ReturningKind::Uuid => ReturnedValue::Uuid(row.try_get(column)?),
    })
}

fn changeable_from_row(row: &PgRow) -> Result<ChangeableUserProperties, WarehouseError> {
    Ok(ChangeableUserProperties {
        ehr_id: row.try_get("ehr_id")?,
        uuid: row.try_get("uuid")?,
        event_time: row.try_get("event_time")?,
        language: row.try_get("language")?,
        age: row.try_get("age")?,
        app_city: row.try_get("app_city")?,
        push_permission: row.try_get("push_permission")?,
        location_permission: row.try_get("location_permission")?,
        authorization_status: row.try_get("authorization_status")?,
        telemed_files_sent: row.try_get("telemed_files_sent")?,
        appointments_cancelled: row.try_get("appointments_cancelled")?,
        telemed_files_received: row.try_get("telemed_files_received")?,
        telemed_messages_received: row.try_get("telemed_messages_received")?,
        telemed_messages_sent: row.try_get("telemed_messages_sent")?,
        telemed_consultations_resumed: row.try_get("telemed_consultations_resumed")?,
        appointments_booked: row.try_get("appointments_booked")?,
        session_id: row.try_get("session_id")?,
        start_version: row.try_get("start_version")?,
        ehr_count: row.try_get("ehr_count")?,
        google_pay_available: row.try_get("google_pay_available")?,
    })
}

fn staging_from_row(row: &PgRow) -> Result<StagingRow, WarehouseError> {
    Ok(StagingRow {
        uuid: row.try_get("uuid")?,
        event_time: row.try_get("event_time")?,
        user_properties_json: row.try_get("user_properties_json")?,
        language: row.try_get("language")?,
        session_id: row.try_get("session_id")?,
        start_version: row.try_get("start_version")?,
        migrated: row.try_get("migrated")?,
    })
}

/// The pooled, process-wide handle onto the warehouse. Every operation
/// borrows a connection from `pool` for the span of one statement and
/// returns it on every exit path — no connection is ever held across an
/// `await` on the network (§5).
#[derive(Clone)]
pub struct WarehouseRepository {
    pool: PgPool,
    limits: BatchLimits,
}

impl WarehouseRepository {
    pub fn new(pool: PgPool, limits: BatchLimits) -> Self {
        Self { pool, limits }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs one statement, returning whatever rows it produced (empty for
    /// statements that don't produce any).
    pub async fn execute(&self, sql: &str, params: Vec<ColumnValue>) -> Result<Vec<PgRow>, WarehouseError> {
        let mut query = sqlx::query(sql);
        for p in params {
            query = bind_value(query, p);
        }
        Ok(query.fetch_all(&self.pool).await?)
    }

    /// Single-row insert with an optional conflict clause. The generic
    /// primitive `insert_batch` is built for the multi-row case; this is
    /// the one-row convenience wrapper described alongside it in §4.4.
    pub async fn insert_one(
        &self,
        table: &str,
        columns: &[&str],
        values: Vec<ColumnValue>,
        on_conflict: Option<&OnConflict>,
    ) -> Result<(), WarehouseError> {
        let sql = build_insert_sql(table, columns, 1, on_conflict, None);
        let mut query = sqlx::query(&sql);
        for v in values {
            query = bind_value(query, v);
        }
        query.execute(&self.pool).await?;
        Ok(())
    }

    /// Dynamically chunked multi-row insert. Splits `rows` into statements
    /// of at most `rows_per_batch(limits, columns.len())` rows each,
    /// issuing one `INSERT ... VALUES (...),(...) ...` per chunk and
    /// concatenating whatever `returning` produced.
    pub async fn insert_batch(
        &self,
        table: &str,
        columns: &[&str],
        rows: Vec<Vec<ColumnValue>>,
        on_conflict: Option<&OnConflict>,
        returning: Option<(&str, ReturningKind)>,
    ) -> Result<(Vec<ReturnedValue>, usize), WarehouseError> {
        if rows.is_empty() {
            return Ok((Vec::new(), 0));
        }

        let per_batch = rows_per_batch(&self.limits, schema::column_count_for_batching(table));
        let mut returned = Vec::new();
        let mut batches = 0usize;

        for chunk in rows.chunks(per_batch) {
            let sql = build_insert_sql(table, columns, chunk.len(), on_conflict, returning.map(|(c, _)| c));
            let mut query = sqlx::query(&sql);
            for row in chunk {
                for value in row.iter().cloned() {
                    query = bind_value(query, value);
                }
            }

            batches += 1;
            if let Some((col, kind)) = returning {
                let fetched = query.fetch_all(&self.pool).await?;
                for row in &fetched {
                    returned.push(extract_returned(row, col, kind)?);
                }
            } else {
                query.execute(&self.pool).await?;
            }
        }

        Ok((returned, batches))
    }

    /// Flushes a batch of [`PermanentUserProperties`] with `ON CONFLICT
    /// (ehr_id) DO NOTHING`, returning the `ehr_id`s Postgres actually
    /// inserted (conflicting rows are silently absent from the result).
    pub async fn insert_permanent_batch(
        &self,
        rows: &[PermanentUserProperties],
    ) -> Result<(Vec<i64>, usize), WarehouseError> {
        let values: Vec<Vec<ColumnValue>> = rows.iter().map(permanent_row_values).collect();
        let on_conflict = OnConflict { conflict_target: vec!["ehr_id"], action: ConflictAction::DoNothing };
        let (returned, batches) = self
            .insert_batch(
                PermanentUserProperties::TABLE,
                PermanentUserProperties::COLUMNS,
                values,
                Some(&on_conflict),
                Some(("ehr_id", ReturningKind::I64)),
            )
            .await?;
        let ids = returned
            .into_iter()
            .map(|v| match v {
                ReturnedValue::I64(n) => n,
                ReturnedValue::Uuid(_) => unreachable!("permanent insert only returns ehr_id"),
            })
            .collect();
        Ok((ids, batches))
    }

    /// Flushes a batch of [`ChangeableUserProperties`], returning the
    /// `uuid`s inserted and the number of chunks issued.
    pub async fn insert_changeable_batch(
        &self,
        rows: &[ChangeableUserProperties],
    ) -> Result<(Vec<Uuid>, usize), WarehouseError> {
        let values: Vec<Vec<ColumnValue>> = rows.iter().map(changeable_row_values).collect();
        let (returned, batches) = self
            .insert_batch(
                ChangeableUserProperties::TABLE,
                ChangeableUserProperties::COLUMNS,
                values,
                None,
                Some(("uuid", ReturningKind::Uuid)),
            )
            .await?;
        let ids = returned
            .into_iter()
            .map(|v| match v {
                ReturnedValue::Uuid(u) => u,
                ReturnedValue::I64(_) => unreachable!("changeable insert only returns uuid"),
            })
            .collect();
        Ok((ids, batches))
    }

    /// Single-row append. Silently drops records with `ehr_id = null` —
    /// unlike the batched flush path, which inserts them into the shared
    /// null partition — matching the convenience op's narrower contract
    /// in §4.4.
    pub async fn insert_changeable(&self, record: &ChangeableUserProperties) -> Result<(), WarehouseError> {
        if record.ehr_id.is_none() {
            log::debug!("dropping single changeable insert with ehr_id=null (uuid={})", record.uuid);
            return Ok(());
        }
        self.insert_one(
            ChangeableUserProperties::TABLE,
            ChangeableUserProperties::COLUMNS,
            changeable_row_values(record),
            None,
        )
        .await
    }

    pub async fn get_all_permanent_ehr_ids(&self) -> Result<HashSet<i64>, WarehouseError> {
        let rows = sqlx::query(&format!("SELECT ehr_id FROM \"{}\"", PermanentUserProperties::TABLE))
            .fetch_all(&self.pool)
            .await?;
        let mut set = HashSet::with_capacity(rows.len());
        for row in rows {
            set.insert(row.try_get::<i64, _>("ehr_id")?);
        }
        Ok(set)
    }

    /// Latest [`ChangeableUserProperties`] row per requested `ehr_id`
    /// (`ROW_NUMBER() OVER (PARTITION BY ehr_id ORDER BY event_time DESC)`),
    /// plus the shared null partition's latest row under key `None` if the
    /// caller asked for it.
    pub async fn get_latest_changeable_for_ehrs(
        &self,
        ehr_ids: &[Option<i64>],
    ) -> Result<HashMap<Option<i64>, ChangeableUserProperties>, WarehouseError> {
        let mut result = HashMap::new();
        let non_null: Vec<i64> = ehr_ids.iter().filter_map(|x| *x).collect();
        let include_null = ehr_ids.iter().any(|x| x.is_none());
        let cols = ChangeableUserProperties::COLUMNS.join(", ");

        if !non_null.is_empty() {
            let sql = format!(
                r#"SELECT {cols} FROM (
                    SELECT {cols}, ROW_NUMBER() OVER (PARTITION BY ehr_id ORDER BY event_time DESC) AS rn
                    FROM "{table}" WHERE ehr_id = ANY($1)
                ) ranked WHERE rn = 1"#,
                table = ChangeableUserProperties::TABLE,
            );
            let rows = sqlx::query(&sql).bind(&non_null).fetch_all(&self.pool).await?;
            for row in &rows {
                let record = changeable_from_row(row)?;
                result.insert(record.ehr_id, record);
            }
        }

        if include_null {
            let sql = format!(
                r#"SELECT {cols} FROM "{table}" WHERE ehr_id IS NULL ORDER BY event_time DESC LIMIT 1"#,
                table = ChangeableUserProperties::TABLE,
            );
            if let Some(row) = sqlx::query(&sql).fetch_optional(&self.pool).await? {
                let record = changeable_from_row(&row)?;
                result.insert(None, record);
            }
        }

        Ok(result)
    }

    /// Marks `uuids` migrated (or not) in one statement.
    pub async fn update_migrated_batch(&self, uuids: &[Uuid], migrated: bool) -> Result<(), WarehouseError> {
        if uuids.is_empty() {
            return Ok(());
        }
        sqlx::query(&format!("UPDATE \"{}\" SET migrated = $1 WHERE uuid = ANY($2)", StagingRow::TABLE))
            .bind(migrated)
            .bind(uuids)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Staging rows awaiting migration in one `[start, end)` window,
    /// ordered by `event_time` ascending — the shape the orchestrator's
    /// staging walk consumes one calendar day at a time.
    pub async fn select_staging_window(
        &self,
        start: chrono::DateTime<chrono::Utc>,
        end: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<StagingRow>, WarehouseError> {
        let rows = self
            .select(
                StagingRow::TABLE,
                StagingRow::COLUMNS,
                &[("migrated", ColumnValue::Bool(Some(false)))],
                &[
                    ("event_time", ">=", ColumnValue::Timestamptz(Some(start))),
                    ("event_time", "<", ColumnValue::Timestamptz(Some(end))),
                ],
                &["event_time"],
                None,
                None,
            )
            .await?;
        rows.iter().map(staging_from_row).collect()
    }

    /// Dynamic `SELECT` with equality `where_eq`, general `(column, op,
    /// value)` triples, signed `order_by` (leading `-` means DESC), and
    /// optional paging. Every table/column/operator fragment is checked
    /// against a whitelist before it reaches the SQL string — only
    /// parameter values ever pass through placeholders.
    pub async fn select(
        &self,
        table: &str,
        allowed_columns: &[&str],
        where_eq: &[(&str, ColumnValue)],
        where_conditions: &[(&str, &str, ColumnValue)],
        order_by: &[&str],
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<PgRow>, WarehouseError> {
        schema::validate_identifier(table, KNOWN_TABLES)?;

        let mut conditions = Vec::new();
        let mut binds = Vec::new();
        let mut idx = 1usize;

        for (col, value) in where_eq {
            schema::validate_identifier(col, allowed_columns)?;
            conditions.push(format!("\"{col}\" = ${idx}"));
            binds.push(value.clone());
            idx += 1;
        }
        for (col, op, value) in where_conditions {
            schema::validate_identifier(col, allowed_columns)?;
            let op = schema::validate_operator(op)?;
            conditions.push(format!("\"{col}\" {op} ${idx}"));
            binds.push(value.clone());
            idx += 1;
        }

        let mut sql = format!("SELECT * FROM \"{table}\"");
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        if !order_by.is_empty() {
            let mut parts = Vec::with_capacity(order_by.len());
            for spec in order_by {
                let (col, direction) =
                    if let Some(stripped) = spec.strip_prefix('-') { (stripped, "DESC") } else { (*spec, "ASC") };
                schema::validate_identifier(col, allowed_columns)?;
                parts.push(format!("\"{col}\" {direction}"));
            }
            sql.push_str(" ORDER BY ");
            sql.push_str(&parts.join(", "));
        }

        if let Some(l) = limit {
            sql.push_str(&format!(" LIMIT {l}"));
        }
        if let Some(o) = offset {
            sql.push_str(&format!(" OFFSET {o}"));
        }

        let mut query = sqlx::query(&sql);
        for v in binds {
            query = bind_value(query, v);
        }
        Ok(query.fetch_all(&self.pool).await?)
    }
}
