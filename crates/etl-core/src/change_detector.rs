use std::collections::HashMap;

use etl_domain::ChangeableUserProperties;

/// Tracks, per `ehr_id`, the latest [`ChangeableUserProperties`] row seen so
/// far in this run and decides whether a new candidate is worth persisting.
/// Records with `ehr_id = null` share one pseudo-partition (keyed separately
/// from every real `ehr_id`), not a free pass around the comparison.
///
/// `changed(old, new)` is defined purely on whether any field the warehouse
/// cares about differs (everything but `uuid`, `event_time`, `session_id`);
/// `event_time` recency is a separate, orthogonal guard on the *cache*, not
/// on whether the row gets written. History is append-only, so a candidate
/// that differs from the cached row is always worth a row even when it
/// arrived out of order — it just must not replace the cache with stale
/// data (see [`ChangeDecision::StaleEvent`]).
#[derive(Debug, Default)]
pub struct ChangeDetector {
    last_seen: HashMap<i64, ChangeableUserProperties>,
    last_seen_null_partition: Option<ChangeableUserProperties>,
}

/// What the detector decided to do with a candidate record.
#[derive(Debug, PartialEq, Eq)]
pub enum ChangeDecision {
    /// No cached row yet for this `ehr_id`; always written.
    FirstSighting,
    /// Differs from the cached row and is not older than it; write and
    /// replace the cache.
    Changed,
    /// Differs from the cached row but is older than it (`event_time`
    /// arrived out of order); still written (history is append-only), but
    /// the cache keeps the newer row instead of being replaced.
    StaleEvent,
    /// Same as the cached row in every comparable field; dropped.
    Unchanged,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluates `candidate` against the cache and updates the cache when
    /// the candidate is accepted (`FirstSighting` or `Changed`). A `None`
    /// `ehr_id` is evaluated against the shared null partition rather than
    /// always succeeding.
    pub fn evaluate(&mut self, candidate: ChangeableUserProperties) -> ChangeDecision {
        match candidate.ehr_id {
            None => Self::evaluate_against(&mut self.last_seen_null_partition, candidate),
            Some(ehr_id) => {
                let mut slot = self.last_seen.remove(&ehr_id);
                let decision = Self::evaluate_against(&mut slot, candidate);
                if let Some(row) = slot {
                    self.last_seen.insert(ehr_id, row);
                }
                decision
            }
        }
    }

    /// Preloads the cache with a row already known to the warehouse (e.g.
    /// from `get_latest_changeable_for_ehrs`), as if it had just been
    /// accepted, without re-running the comparison against nothing.
    pub fn preload(&mut self, ehr_id: Option<i64>, row: ChangeableUserProperties) {
        match ehr_id {
            None => self.last_seen_null_partition = Some(row),
            Some(id) => {
                self.last_seen.insert(id, row);
            }
        }
    }

    fn evaluate_against(
        slot: &mut Option<ChangeableUserProperties>,
        candidate: ChangeableUserProperties,
    ) -> ChangeDecision {
        match slot.as_ref() {
            None => {
                *slot = Some(candidate);
                ChangeDecision::FirstSighting
            }
            Some(cached) => {
                if candidate.comparable_fields() == cached.comparable_fields() {
                    return ChangeDecision::Unchanged;
                }
                if candidate.event_time < cached.event_time {
                    return ChangeDecision::StaleEvent;
                }
                *slot = Some(candidate);
                ChangeDecision::Changed
            }
        }
    }
}
