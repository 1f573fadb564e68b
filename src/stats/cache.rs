//! Aggregate Cache Module
//! Session-scoped memoization of aggregate results, keyed on the table
//! fingerprint plus the filter criteria. Entries for a previous source are
//! dropped when the fingerprint changes; there is no other eviction.

use crate::data::NormalizedTable;
use crate::stats::{AggregateResult, Aggregator, FilterCriteria};
use std::collections::HashMap;

#[derive(Default)]
pub struct AggregateCache {
    entries: HashMap<(u64, FilterCriteria), AggregateResult>,
    fingerprint: Option<u64>,
}

impl AggregateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the memoized result for (table, criteria), computing and
    /// storing it on a miss. A fingerprint change clears stale entries.
    pub fn get_or_compute(
        &mut self,
        table: &NormalizedTable,
        criteria: &FilterCriteria,
    ) -> AggregateResult {
        if self.fingerprint != Some(table.fingerprint) {
            self.entries.clear();
            self.fingerprint = Some(table.fingerprint);
        }
        self.entries
            .entry((table.fingerprint, criteria.clone()))
            .or_insert_with(|| Aggregator::compute_all(table, criteria))
            .clone()
    }

    /// Store a result computed elsewhere (the background compute thread).
    pub fn insert(&mut self, fingerprint: u64, criteria: FilterCriteria, result: AggregateResult) {
        if self.fingerprint != Some(fingerprint) {
            self.entries.clear();
            self.fingerprint = Some(fingerprint);
        }
        self.entries.insert((fingerprint, criteria), result);
    }

    pub fn get(&self, fingerprint: u64, criteria: &FilterCriteria) -> Option<&AggregateResult> {
        self.entries.get(&(fingerprint, criteria.clone()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{BankRecord, ColumnPresence};
    use chrono::NaiveDate;

    fn table(fingerprint: u64) -> NormalizedTable {
        NormalizedTable {
            records: vec![BankRecord {
                bank_name: None,
                city: None,
                state: Some("CA".to_string()),
                closing_date: NaiveDate::from_ymd_opt(2008, 6, 15),
                acquiring_institution: Some("A".to_string()),
                fund: None,
            }],
            presence: ColumnPresence {
                bank_name: false,
                city: false,
                state: true,
                closing_date: true,
                acquiring_institution: true,
                fund: false,
            },
            columns: vec!["state".to_string()],
            fingerprint,
        }
    }

    #[test]
    fn test_cache_hit_on_same_inputs() {
        let mut cache = AggregateCache::new();
        let t = table(7);
        let criteria = FilterCriteria::default();
        let first = cache.get_or_compute(&t, &criteria);
        let second = cache.get_or_compute(&t, &criteria);
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_distinct_criteria_get_distinct_entries() {
        let mut cache = AggregateCache::new();
        let t = table(7);
        cache.get_or_compute(&t, &FilterCriteria::default());
        cache.get_or_compute(
            &t,
            &FilterCriteria {
                year_range: Some((2008, 2008)),
                states: Default::default(),
            },
        );
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_fingerprint_change_invalidates() {
        let mut cache = AggregateCache::new();
        let criteria = FilterCriteria::default();
        cache.get_or_compute(&table(1), &criteria);
        cache.get_or_compute(&table(2), &criteria);
        // Entries for fingerprint 1 were dropped when the source changed.
        assert_eq!(cache.len(), 1);
        assert!(cache.get(1, &criteria).is_none());
        assert!(cache.get(2, &criteria).is_some());
    }
}
