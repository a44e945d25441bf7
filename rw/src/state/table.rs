//! Bounded, insertion-ordered job table
//!
//! Owns every run record. All access goes through the state manager actor,
//! which is the serialization point for concurrent mutation.

use std::collections::{HashMap, VecDeque};

use tracing::{debug, warn};

use crate::domain::RunRecord;

/// Insertion-ordered map of run id to record, bounded to `limit` entries.
///
/// When an insertion pushes the table over the bound, the oldest terminal
/// records (by start timestamp) are evicted. Records that are registered or
/// running are never evicted regardless of age.
#[derive(Debug)]
pub struct JobTable {
    records: HashMap<String, RunRecord>,
    order: VecDeque<String>,
    limit: usize,
}

impl JobTable {
    pub fn new(limit: usize) -> Self {
        Self {
            records: HashMap::new(),
            order: VecDeque::new(),
            limit,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Insert a record. The caller is expected to follow up with
    /// [`JobTable::enforce_limit`].
    pub fn insert(&mut self, record: RunRecord) {
        debug!(run_id = %record.id, "inserting run record");
        self.order.push_back(record.id.clone());
        self.records.insert(record.id.clone(), record);
    }

    pub fn get(&self, id: &str) -> Option<&RunRecord> {
        self.records.get(id)
    }

    /// All records in insertion order.
    pub fn all(&self) -> Vec<RunRecord> {
        self.order.iter().filter_map(|id| self.records.get(id)).cloned().collect()
    }

    /// Apply a mutation to one record, returning the updated copy.
    ///
    /// Readers only ever see whole records handed out by the actor, so a
    /// record update is atomic from their perspective.
    pub fn update<F>(&mut self, id: &str, f: F) -> Option<RunRecord>
    where
        F: FnOnce(&mut RunRecord),
    {
        let record = self.records.get_mut(id)?;
        f(record);
        Some(record.clone())
    }

    /// Evict the oldest terminal records until the table is back at its
    /// bound. Returns the evicted ids so their log files can be scheduled
    /// for deletion.
    pub fn enforce_limit(&mut self) -> Vec<String> {
        let mut evicted = Vec::new();
        while self.records.len() > self.limit {
            let oldest = self
                .records
                .values()
                .filter(|r| r.status.is_terminal())
                .min_by_key(|r| r.start_time_ns)
                .map(|r| r.id.clone());

            let Some(id) = oldest else {
                // Only registered/running records left over the bound; they
                // are retained regardless of age. The transient overflow
                // resolves once one of them finishes.
                warn!(size = self.records.len(), limit = self.limit, "no evictable records over bound");
                break;
            };

            debug!(run_id = %id, "evicting run record");
            self.records.remove(&id);
            self.order.retain(|o| o != &id);
            evicted.push(id);
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RunOrigin, RunStatus};

    fn record_at(ns: i64, status: RunStatus) -> RunRecord {
        let mut r = RunRecord::new(RunOrigin::OnDemand, None);
        r.start_time_ns = ns;
        r.status = status;
        r
    }

    #[test]
    fn test_insert_and_get() {
        let mut table = JobTable::new(20);
        let record = RunRecord::new(RunOrigin::OnDemand, None);
        let id = record.id.clone();

        table.insert(record);

        assert_eq!(table.len(), 1);
        assert_eq!(table.get(&id).unwrap().id, id);
        assert!(table.get("unknown").is_none());
    }

    #[test]
    fn test_all_preserves_insertion_order() {
        let mut table = JobTable::new(20);
        let mut ids = Vec::new();
        for i in 0..5 {
            let record = record_at(i, RunStatus::Complete);
            ids.push(record.id.clone());
            table.insert(record);
        }

        let all: Vec<String> = table.all().into_iter().map(|r| r.id).collect();
        assert_eq!(all, ids);
    }

    #[test]
    fn test_enforce_limit_evicts_oldest_terminal() {
        let mut table = JobTable::new(3);
        let mut ids = Vec::new();
        for i in 0..5 {
            let record = record_at(i, RunStatus::Complete);
            ids.push(record.id.clone());
            table.insert(record);
        }

        let evicted = table.enforce_limit();

        assert_eq!(table.len(), 3);
        // The two oldest by start time are gone, in oldest-first order
        assert_eq!(evicted, vec![ids[0].clone(), ids[1].clone()]);
        assert!(table.get(&ids[0]).is_none());
        assert!(table.get(&ids[1]).is_none());
        assert!(table.get(&ids[4]).is_some());
    }

    #[test]
    fn test_enforce_limit_never_evicts_active_records() {
        let mut table = JobTable::new(2);
        // Oldest records are the active ones
        let running = record_at(0, RunStatus::Running);
        let registered = record_at(1, RunStatus::Registered);
        let running_id = running.id.clone();
        let registered_id = registered.id.clone();
        table.insert(running);
        table.insert(registered);

        let terminal = record_at(2, RunStatus::Complete);
        let terminal_id = terminal.id.clone();
        table.insert(terminal);

        let evicted = table.enforce_limit();

        // The terminal record is evicted even though it is the newest
        assert_eq!(evicted, vec![terminal_id]);
        assert!(table.get(&running_id).is_some());
        assert!(table.get(&registered_id).is_some());
    }

    #[test]
    fn test_enforce_limit_tolerates_unevictable_overflow() {
        let mut table = JobTable::new(1);
        table.insert(record_at(0, RunStatus::Running));
        table.insert(record_at(1, RunStatus::Registered));

        let evicted = table.enforce_limit();

        assert!(evicted.is_empty());
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_update_returns_modified_copy() {
        let mut table = JobTable::new(20);
        let record = RunRecord::new(RunOrigin::OnDemand, None);
        let id = record.id.clone();
        table.insert(record);

        let updated = table
            .update(&id, |r| {
                r.status = RunStatus::Running;
            })
            .unwrap();

        assert_eq!(updated.status, RunStatus::Running);
        assert_eq!(table.get(&id).unwrap().status, RunStatus::Running);
        assert!(table.update("unknown", |_| {}).is_none());
    }
}
