//! Round-robin bird selection.

use std::sync::atomic::{AtomicI64, Ordering};

use crate::dataset::BirdRecord;

/// The loaded dataset paired with its selection cursor.
///
/// The cursor starts at -1 because it is always incremented before use, so
/// the first request lands on index 0. Each call to [`BirdRoster::next_bird`]
/// claims a unique monotone slot via an atomic increment-and-read; requests
/// rejected by fault injection never reach it, so they do not consume a
/// position in the cycle.
#[derive(Debug)]
pub struct BirdRoster {
    records: Vec<BirdRecord>,
    cursor: AtomicI64,
}

impl BirdRoster {
    /// Wraps a loaded dataset. The dataset must be non-empty; the loader
    /// guarantees this before a roster is ever built.
    pub fn new(records: Vec<BirdRecord>) -> Self {
        debug_assert!(!records.is_empty());
        Self {
            records,
            cursor: AtomicI64::new(-1),
        }
    }

    /// Atomically advances the cursor and returns the record it lands on.
    pub fn next_bird(&self) -> &BirdRecord {
        let seq = self.cursor.fetch_add(1, Ordering::SeqCst) + 1;
        let idx = seq.rem_euclid(self.records.len() as i64) as usize;
        &self.records[idx]
    }

    /// Number of records in the active dataset.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
