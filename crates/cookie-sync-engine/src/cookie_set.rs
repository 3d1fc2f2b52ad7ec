//! Ordered cookie set keyed by `(name, domain)`.

use cookie_storage::{CookieKey, CookieRecord};
use std::collections::HashMap;

/// Outcome of [`ReconciledCookieSet::upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    /// An existing cookie with a different value was superseded.
    Replaced,
    Unchanged,
}

/// The full cookie set handed to the live store in one batch.
///
/// At most one record per `(name, domain)`. Iteration follows first
/// insertion; replacing a record keeps its position.
#[derive(Debug, Clone, Default)]
pub struct ReconciledCookieSet {
    records: Vec<CookieRecord>,
    index: HashMap<CookieKey, usize>,
}

impl ReconciledCookieSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a persisted snapshot. Later duplicates supersede earlier ones.
    pub fn from_snapshot(snapshot: &[CookieRecord]) -> Self {
        let mut set = Self::new();
        for record in snapshot {
            set.upsert(record.clone());
        }
        set
    }

    pub fn get(&self, name: &str, domain: &str) -> Option<&CookieRecord> {
        self.index
            .get(&CookieKey::new(name, domain))
            .map(|&idx| &self.records[idx])
    }

    pub fn contains(&self, name: &str, domain: &str) -> bool {
        self.index.contains_key(&CookieKey::new(name, domain))
    }

    pub fn upsert(&mut self, record: CookieRecord) -> Upsert {
        match self.index.get(&record.key()) {
            Some(&idx) if self.records[idx] == record => Upsert::Unchanged,
            Some(&idx) => {
                self.records[idx] = record;
                Upsert::Replaced
            }
            None => {
                self.index.insert(record.key(), self.records.len());
                self.records.push(record);
                Upsert::Inserted
            }
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CookieRecord> {
        self.records.iter()
    }

    pub fn as_slice(&self) -> &[CookieRecord] {
        &self.records
    }

    pub fn into_vec(self) -> Vec<CookieRecord> {
        self.records
    }

    /// Drop every record `keep` rejects. Returns how many were dropped.
    pub fn retain(&mut self, mut keep: impl FnMut(&CookieRecord) -> bool) -> usize {
        let before = self.records.len();
        self.records.retain(|record| keep(record));
        if self.records.len() != before {
            self.index = self
                .records
                .iter()
                .enumerate()
                .map(|(idx, record)| (record.key(), idx))
                .collect();
        }
        before - self.records.len()
    }

    /// Same `(name, domain, value)` triples, ignoring order.
    #[cfg(test)]
    pub fn same_values_as(&self, other: &[CookieRecord]) -> bool {
        let other = Self::from_snapshot(other);
        self.len() == other.len()
            && self.iter().all(|record| {
                other
                    .get(&record.name, &record.domain)
                    .is_some_and(|found| found.value == record.value)
            })
    }
}

impl PartialEq for ReconciledCookieSet {
    fn eq(&self, other: &Self) -> bool {
        self.records == other.records
    }
}

impl Eq for ReconciledCookieSet {}

impl<'a> IntoIterator for &'a ReconciledCookieSet {
    type Item = &'a CookieRecord;
    type IntoIter = std::slice::Iter<'a, CookieRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
