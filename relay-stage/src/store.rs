use crate::types::Record;
use chrono::{TimeDelta, Utc};
use parking_lot::RwLock;
use std::sync::Arc;

/// Append-only log of the records a stage has accepted, in acceptance order.
///
/// Cloning the store clones a handle to the same log. The backing vector is only
/// reachable through [`append`](ValueStore::append) and
/// [`snapshot`](ValueStore::snapshot), which take the write and read side of a
/// single lock respectively.
#[derive(Clone, Default)]
pub struct ValueStore {
    records: Arc<RwLock<Vec<Record>>>,
}

impl ValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts a value into the log and returns the stored record along with the
    /// length of the log right after it was added.
    ///
    /// The timestamp is taken inside the write lock so timestamps increase strictly
    /// with insertion order. If the clock has not advanced past the previous record
    /// the new one is placed one nanosecond after it.
    pub fn append(&self, service_name: &str, value: i64) -> (Record, usize) {
        let mut records = self.records.write();

        let now = Utc::now();
        let timestamp = match records.last() {
            Some(last) if now <= last.timestamp() => last.timestamp() + TimeDelta::nanoseconds(1),
            _ => now,
        };

        let record = Record::new(timestamp, service_name.to_string(), value);
        records.push(record.clone());
        (record, records.len())
    }

    /// Returns a copy of every record accepted so far.
    pub fn snapshot(&self) -> Vec<Record> {
        self.records.read().clone()
    }
}
