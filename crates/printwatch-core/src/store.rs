// ── Shared status store ─────────────────────────────────────────────
//
// One mutex over a name-keyed map. Writers replace whole records;
// readers clone a snapshot out and release the lock before doing
// anything else with it. The lock is never held across I/O or await
// points, so one stuck monitor can never wedge the fleet view.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use crate::model::PrinterStatus;

/// Fleet-wide status map: display name to latest record.
///
/// `BTreeMap` keeps snapshots name-sorted for free, which is the order
/// every consumer wants anyway.
#[derive(Debug, Default)]
pub struct StatusStore {
    inner: Mutex<BTreeMap<String, PrinterStatus>>,
}

impl StatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the record under `name`.
    pub fn upsert(&self, name: impl Into<String>, status: PrinterStatus) {
        self.lock().insert(name.into(), status);
    }

    /// Remove the record under `name`; removing a missing name is fine.
    pub fn remove(&self, name: &str) {
        self.lock().remove(name);
    }

    /// Latest record for `name`, if any.
    pub fn get(&self, name: &str) -> Option<PrinterStatus> {
        self.lock().get(name).cloned()
    }

    /// Clone out every record, name-sorted.
    pub fn snapshot(&self) -> Vec<PrinterStatus> {
        self.lock().values().cloned().collect()
    }

    /// Number of records currently published.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A poisoned lock still holds a consistent map: every write is a
    // whole-record insert or remove, never a partial mutation.
    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, PrinterStatus>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
