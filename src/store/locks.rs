//! Per-file write locks.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

/// Hands out one mutex per file name so appends to the same file are
/// serialized while appends to different files proceed in parallel.
///
/// Entries are never removed: the map holds one lock per file name ever
/// appended to, so it is bounded by the files in the data directory.
#[derive(Debug, Default)]
pub struct FileLocks {
    slots: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl FileLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the lock for `file_name`, creating it on first use.
    pub fn slot(&self, file_name: &str) -> Arc<Mutex<()>> {
        let mut slots = self.slots.lock();
        slots
            .entry(file_name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
