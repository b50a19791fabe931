use etl_domain::{ChangeableUserProperties, PermanentUserProperties, StagingRow};

use crate::error::WarehouseError;

/// Tables this repository knows how to size batch inserts for and accept
/// as a `select`/`execute` target. Anything outside this list is rejected
/// by the identifier whitelist rather than interpolated into SQL.
pub const KNOWN_TABLES: &[&str] = &[PermanentUserProperties::TABLE, ChangeableUserProperties::TABLE, StagingRow::TABLE];

/// Comparison operators `select`'s `where_conditions` may use. Anything
/// else is rejected before it reaches SQL.
pub const ALLOWED_OPERATORS: &[&str] = &["=", "!=", "<>", "<", ">", "<=", ">="];

/// Fallback column count used when sizing a batch insert for a table this
/// crate has no declared schema for (§4.4).
pub const FALLBACK_COLUMN_COUNT: usize = 20;

fn declared_column_count(table: &str) -> Option<usize> {
    if table == PermanentUserProperties::TABLE {
        Some(PermanentUserProperties::COLUMNS.len())
    } else if table == ChangeableUserProperties::TABLE {
        Some(ChangeableUserProperties::COLUMNS.len())
    } else if table == StagingRow::TABLE {
        Some(StagingRow::COLUMNS.len())
    } else {
        None
    }
}

/// Column count used to size a batch insert. Falls back to
/// [`FALLBACK_COLUMN_COUNT`] with a warning for tables this crate has no
/// declared schema for, rather than failing the insert outright.
pub fn column_count_for_batching(table: &str) -> usize {
    match declared_column_count(table) {
        Some(n) => n,
        None => {
            log::warn!("no declared column count for table '{table}'; falling back to {FALLBACK_COLUMN_COUNT}");
            FALLBACK_COLUMN_COUNT
        }
    }
}

/// Strict lookup used where an unknown table should be a reportable error
/// rather than silently padded — exercised directly by tests exercising
/// [`WarehouseError::ColumnCountUnknown`].
pub fn column_count_strict(table: &str) -> Result<usize, WarehouseError> {
    declared_column_count(table).ok_or_else(|| WarehouseError::ColumnCountUnknown { table: table.to_string() })
}

pub fn validate_identifier(ident: &str, allowed: &[&str]) -> Result<(), WarehouseError> {
    if allowed.contains(&ident) {
        Ok(())
    } else {
        Err(WarehouseError::InvalidIdentifier { identifier: ident.to_string() })
    }
}

pub fn validate_operator(op: &str) -> Result<&str, WarehouseError> {
    if ALLOWED_OPERATORS.contains(&op) {
        Ok(op)
    } else {
        Err(WarehouseError::InvalidOperator { operator: op.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_tables_report_their_real_column_count() {
        assert_eq!(column_count_for_batching(PermanentUserProperties::TABLE), 9);
        assert_eq!(column_count_for_batching(ChangeableUserProperties::TABLE), 20);
        assert_eq!(column_count_for_batching(StagingRow::TABLE), 7);
    }

    #[test]
    fn unknown_table_falls_back_without_erroring() {
        assert_eq!(column_count_for_batching("some_other_table"), FALLBACK_COLUMN_COUNT);
        assert!(matches!(column_count_strict("some_other_table"), Err(WarehouseError::ColumnCountUnknown { .. })));
    }

    #[test]
    fn operator_whitelist_rejects_injection_attempts() {
        assert!(validate_operator("=; DROP TABLE users;--").is_err());
        assert!(validate_operator(">=").is_ok());
    }
}
