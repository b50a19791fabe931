use std::collections::HashSet;
use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use uuid::Uuid;

use etl_adapters::ObjectStore;
use etl_core::{transform_single_record, ChangeDecision, ChangeDetector, TransformError};
use etl_domain::{
    ChangeableUserProperties, MappingCatalog, PermanentUserProperties, RawRecord, SourceTag,
};
use etl_persistence::WarehouseRepository;

use crate::config::EtlConfig;
use crate::error::OrchestratorError;
use crate::result::ProcessingOutcome;

/// The first up to two transform errors formatted as `'<key>' = <value>
/// (<reason>)`, joined by `; `, with an `and <N> more errors` tag appended
/// when there were more than two.
fn format_error_message(errors: &[TransformError]) -> String {
    let mut parts: Vec<String> = errors
        .iter()
        .take(2)
        .map(|e| format!("'{}' = {} ({})", e.key, e.value.as_deref().unwrap_or(""), e.reason))
        .collect();
    if errors.len() > 2 {
        parts.push(format!("and {} more errors", errors.len() - 2));
    }
    parts.join("; ")
}

/// Drives one run of `process_source`: preloaded caches, buffered batches,
/// and the flush/interrupt machinery described in §4.5. One instance is
/// scoped to a single run — concurrent runs each own their own
/// `Orchestrator` and buffers, sharing only the warehouse pool underneath
/// `repository` and the catalog `Arc`.
pub struct Orchestrator {
    repository: WarehouseRepository,
    catalog: Arc<MappingCatalog>,
    batch_size: usize,
    existing_permanent: HashSet<i64>,
    change_detector: ChangeDetector,
    pending_permanent: Vec<PermanentUserProperties>,
    pending_changeable: Vec<ChangeableUserProperties>,
    batch_uuids: Vec<Uuid>,
    processed: usize,
}

impl Orchestrator {
    /// Preloads `existing_permanent` and `last_change` from the warehouse
    /// before any record is processed.
    pub async fn new(
        repository: WarehouseRepository,
        catalog: Arc<MappingCatalog>,
        config: EtlConfig,
    ) -> Result<Self, OrchestratorError> {
        let existing_permanent = repository.get_all_permanent_ehr_ids().await?;
        log::info!("preloaded {} existing permanent ehr_ids", existing_permanent.len());

        let mut change_detector = ChangeDetector::new();
        let mut keys: Vec<Option<i64>> = existing_permanent.iter().map(|id| Some(*id)).collect();
        keys.push(None);
        let latest = repository.get_latest_changeable_for_ehrs(&keys).await?;
        log::info!("preloaded {} last-changeable cache entries", latest.len());
        for (ehr_id, row) in latest {
            change_detector.preload(ehr_id, row);
        }

        Ok(Self {
            repository,
            catalog,
            batch_size: config.batch_size.max(1),
            existing_permanent,
            change_detector,
            pending_permanent: Vec::new(),
            pending_changeable: Vec::new(),
            batch_uuids: Vec::new(),
            processed: 0,
        })
    }

    fn should_flush(&self) -> bool {
        self.pending_permanent.len() >= self.batch_size || self.pending_changeable.len() >= self.batch_size
    }

    /// Transforms one raw record and buffers its projections. Returns the
    /// transform errors instead of buffering anything when the record is
    /// malformed — an empty buffer append on error, never a partial one.
    fn process_record(
        &mut self,
        raw: &RawRecord,
        source: SourceTag,
        staging_uuid: Option<Uuid>,
    ) -> Result<(), Vec<TransformError>> {
        let output = transform_single_record(raw, source, &self.catalog);
        if !output.errors.is_empty() {
            return Err(output.errors);
        }

        if let Some(permanent) = output.permanent {
            self.pending_permanent.push(permanent);
        }
        if let Some(changeable) = output.changeable {
            self.pending_changeable.push(changeable);
        }
        if let Some(uuid) = staging_uuid {
            self.batch_uuids.push(uuid);
        }
        Ok(())
    }

    /// Drains both pending buffers into one `insert_batch` call each,
    /// updating `existing_permanent` and the change detector's cache from
    /// what was actually accepted, then (if any staging uuids were
    /// buffered) marks them migrated. Safe to call on empty buffers.
    async fn flush(&mut self) -> Result<(), OrchestratorError> {
        if !self.pending_permanent.is_empty() {
            let existing_permanent = &self.existing_permanent;
            let candidates: Vec<PermanentUserProperties> = self
                .pending_permanent
                .drain(..)
                .filter(|p| !existing_permanent.contains(&p.ehr_id))
                .collect();
            if !candidates.is_empty() {
                let (ids, batches) = self.repository.insert_permanent_batch(&candidates).await?;
                log::info!("flushed {} permanent row(s) in {} batch(es)", ids.len(), batches);
                self.existing_permanent.extend(ids);
            }
        }

        if !self.pending_changeable.is_empty() {
            let mut to_insert = Vec::new();
            for candidate in self.pending_changeable.drain(..) {
                let decision = self.change_detector.evaluate(candidate.clone());
                // Only `Unchanged` suppresses the insert. `StaleEvent` still
                // differs from the cached row — history is append-only, so
                // it is written too; only the cache update was withheld.
                if !matches!(decision, ChangeDecision::Unchanged) {
                    to_insert.push(candidate);
                }
            }
            if !to_insert.is_empty() {
                let (uuids, batches) = self.repository.insert_changeable_batch(&to_insert).await?;
                log::info!("flushed {} changeable row(s) in {} batch(es)", uuids.len(), batches);
            }
        }

        if !self.batch_uuids.is_empty() {
            let uuids = std::mem::take(&mut self.batch_uuids);
            log::debug!("marking {} staging row(s) migrated", uuids.len());
            self.repository.update_migrated_batch(&uuids, true).await?;
        }

        Ok(())
    }

    /// Archive mode: reads a single object, splits it into lines, and
    /// processes from `start_after` onward. A line that fails to decode as
    /// JSON interrupts the run after a best-effort cleanup flush.
    pub async fn process_archive(
        &mut self,
        object_store: &dyn ObjectStore,
        bucket: &str,
        prefix: &str,
        start_after: i64,
    ) -> Result<ProcessingOutcome, OrchestratorError> {
        let bytes = object_store.get(bucket, prefix).await?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        let lines: Vec<&str> = text.lines().collect();
        let start_after = start_after.max(0);

        let mut last_successful_line = if start_after > 0 { Some(start_after - 1) } else { None };

        for (idx, line) in lines.iter().enumerate().skip(start_after as usize) {
            let idx = idx as i64;

            let raw = match RawRecord::from_json_line(line) {
                Ok(raw) => raw,
                Err(e) => {
                    log::warn!("line {idx} of {prefix} failed to decode: {e}");
                    self.flush().await?;
                    return Ok(ProcessingOutcome::Interrupted {
                        processed: self.processed,
                        errors: 1,
                        error_message: format!("line {idx} is not valid JSON: {e}"),
                        last_successful_line,
                        failed_line: Some(idx),
                        file_key: Some(prefix.to_string()),
                    });
                }
            };

            match self.process_record(&raw, SourceTag::Archive, None) {
                Ok(()) => {
                    self.processed += 1;
                    last_successful_line = Some(idx);
                    if self.should_flush() {
                        self.flush().await?;
                    }
                }
                Err(errors) => {
                    log::warn!("line {idx} of {prefix} failed transformation: {} error(s)", errors.len());
                    self.flush().await?;
                    return Ok(ProcessingOutcome::Interrupted {
                        processed: self.processed,
                        errors: errors.len(),
                        error_message: format_error_message(&errors),
                        last_successful_line,
                        failed_line: Some(idx),
                        file_key: Some(prefix.to_string()),
                    });
                }
            }
        }

        self.flush().await?;
        Ok(ProcessingOutcome::Completed { processed: self.processed, errors: 0, last_successful_line })
    }

    /// Staging mode: walks one-day windows of `tmp_user_properties`
    /// forward from `start_date`, terminating when a day selects zero
    /// pending rows. A transformation error flushes the clean buffers
    /// (including marking already-collected uuids migrated) before
    /// interrupting.
    pub async fn process_staging(&mut self, start_date: NaiveDate) -> Result<ProcessingOutcome, OrchestratorError> {
        let mut day = start_date;

        loop {
            let window_start = Utc.from_utc_datetime(&day.and_hms_opt(0, 0, 0).expect("midnight is always valid"));
            let window_end = window_start + chrono::Duration::days(1);

            let rows = self.repository.select_staging_window(window_start, window_end).await?;
            if rows.is_empty() {
                log::debug!("day {day} selected zero pending rows, stopping staging walk");
                break;
            }
            log::info!("day {day}: {} pending row(s)", rows.len());

            for row in rows {
                let raw = RawRecord::from_value(row.to_raw_json());
                match self.process_record(&raw, SourceTag::Staging, Some(row.uuid)) {
                    Ok(()) => {
                        self.processed += 1;
                        if self.should_flush() {
                            self.flush().await?;
                        }
                    }
                    Err(errors) => {
                        log::warn!("staging row {} failed transformation: {} error(s)", row.uuid, errors.len());
                        self.flush().await?;
                        return Ok(ProcessingOutcome::Interrupted {
                            processed: self.processed,
                            errors: errors.len(),
                            error_message: format_error_message(&errors),
                            last_successful_line: None,
                            failed_line: None,
                            file_key: None,
                        });
                    }
                }
            }

            day = day.succ_opt().expect("calendar date overflow");
        }

        self.flush().await?;
        Ok(ProcessingOutcome::Completed { processed: self.processed, errors: 0, last_successful_line: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error(key: &str, value: Option<&str>, reason: &str) -> TransformError {
        TransformError { key: key.to_string(), value: value.map(str::to_string), reason: reason.to_string() }
    }

    #[test]
    fn error_message_truncates_after_two_and_tags_the_overflow() {
        let errors = vec![error("a", Some("1"), "bad"), error("b", Some("2"), "bad"), error("c", Some("3"), "bad")];
        let message = format_error_message(&errors);
        assert_eq!(message, "'a' = 1 (bad); 'b' = 2 (bad); and 1 more errors");
    }

    #[test]
    fn error_message_handles_a_single_error_without_an_overflow_tag() {
        let errors = vec![error("CompletelyNewKey", Some("x"), "Unknown key")];
        assert_eq!(format_error_message(&errors), "'CompletelyNewKey' = x (Unknown key)");
    }

    #[test]
    fn error_message_handles_a_missing_value() {
        let errors = vec![error("event_time", None, "Missing event_time")];
        assert_eq!(format_error_message(&errors), "'event_time' =  (Missing event_time)");
    }
}
