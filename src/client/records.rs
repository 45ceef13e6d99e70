//! In-memory record list
//!
//! The single UI-visible record set. Everything else (cache, store) is a
//! projection of this list. Order is significant: locally added records are
//! prepended, records announced by the store are appended.

use crate::shared::LogisticsRecord;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordList {
    records: Vec<LogisticsRecord>,
}

impl RecordList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<LogisticsRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn as_slice(&self) -> &[LogisticsRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogisticsRecord> {
        self.records.iter()
    }

    pub fn to_vec(&self) -> Vec<LogisticsRecord> {
        self.records.clone()
    }

    pub fn get(&self, id: &str) -> Option<&LogisticsRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    /// Exact, case-sensitive tracking number match
    pub fn contains_tracking_number(&self, tracking_number: &str) -> bool {
        self.records.iter().any(|r| r.tracking_number == tracking_number)
    }

    /// Insert at the head (newest first)
    pub fn prepend(&mut self, record: LogisticsRecord) {
        self.records.insert(0, record);
    }

    /// Append unless a record with the same id is already present
    ///
    /// Returns whether the record was added.
    pub fn append_if_absent(&mut self, record: LogisticsRecord) -> bool {
        if self.contains_id(&record.id) {
            return false;
        }
        self.records.push(record);
        true
    }

    /// Insert at `index`, clamped to the list length
    pub fn insert_at(&mut self, index: usize, record: LogisticsRecord) {
        let index = index.min(self.records.len());
        self.records.insert(index, record);
    }

    /// Replace the record with the same id in place, returning the old value
    pub fn replace(&mut self, record: LogisticsRecord) -> Option<LogisticsRecord> {
        let index = self.position(&record.id)?;
        Some(std::mem::replace(&mut self.records[index], record))
    }

    /// Mutate the record with `id` in place, returning a copy of its prior state
    pub fn update<F>(&mut self, id: &str, f: F) -> Option<LogisticsRecord>
    where
        F: FnOnce(&mut LogisticsRecord),
    {
        let record = self.records.iter_mut().find(|r| r.id == id)?;
        let previous = record.clone();
        f(record);
        Some(previous)
    }

    /// Remove the record with `id`, returning it and its former position
    pub fn remove(&mut self, id: &str) -> Option<(usize, LogisticsRecord)> {
        let index = self.position(id)?;
        Some((index, self.records.remove(index)))
    }

    /// Swap in an entirely new record set
    pub fn replace_all(&mut self, records: Vec<LogisticsRecord>) {
        self.records = records;
    }
}
