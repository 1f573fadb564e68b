//! Aggregator Module
//! Pure aggregate computations over a normalized failed-bank table. Every
//! operation takes the table and filter criteria and checks its own column
//! prerequisites, so one missing column never aborts the other aggregates.

use crate::data::{BankRecord, ColumnPresence, NormalizedTable};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// The 50 US states plus DC. Per-state counts are restricted to this set;
/// unrecognized codes are dropped silently.
pub const US_JURISDICTIONS: [&str; 51] = [
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "FL", "GA", "HI", "ID", "IL", "IN", "IA",
    "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH", "NJ",
    "NM", "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT",
    "VA", "WA", "WV", "WI", "WY", "DC",
];

/// Placeholder acquirer for rows with no acquiring institution.
pub const UNKNOWN_ACQUIRER: &str = "Unknown";

/// Filter over the normalized table. `year_range` is inclusive and absent
/// means no year filtering; an empty state set allows every state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub year_range: Option<(i32, i32)>,
    pub states: BTreeSet<String>,
}

/// Shaped aggregate tables handed to the chart layer. Each field empties
/// (or goes None) independently when its required columns are missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateResult {
    pub total_count: usize,
    /// Year with the most failures; lowest year wins ties.
    pub peak_year: Option<i32>,
    /// State with the most failures; smallest code wins ties.
    pub top_state: Option<String>,
    /// (year, count) ascending by year, null dates excluded.
    pub per_year: Vec<(i32, usize)>,
    /// (state, count) ascending by code, restricted to US_JURISDICTIONS.
    pub per_state: Vec<(String, usize)>,
    /// (acquirer, count) descending by count, ties first-encountered.
    pub per_acquirer: Vec<(String, usize)>,
    /// (top_50, top_80) Pareto thresholds; None when there is no
    /// acquisition data at all.
    pub pareto: Option<(usize, usize)>,
    /// (year, HHI) ascending by year, HHI in (0, 1].
    pub hhi_by_year: Vec<(i32, f64)>,
}

/// Pure aggregate calculations. Safe to memoize on (table fingerprint,
/// filter criteria).
pub struct Aggregator;

impl Aggregator {
    /// Keep rows matching the year range and state set. A null closing date
    /// never matches an active year filter; a null state never matches an
    /// active state filter.
    pub fn filter_rows<'a>(
        table: &'a NormalizedTable,
        criteria: &FilterCriteria,
    ) -> Vec<&'a BankRecord> {
        table
            .records
            .iter()
            .filter(|r| {
                let year_ok = match criteria.year_range {
                    None => true,
                    Some((min, max)) => r
                        .closing_date
                        .map(|d| (min..=max).contains(&d.year()))
                        .unwrap_or(false),
                };
                let state_ok = criteria.states.is_empty()
                    || r.state
                        .as_ref()
                        .map(|s| criteria.states.contains(s))
                        .unwrap_or(false);
                year_ok && state_ok
            })
            .collect()
    }

    /// Year with the maximum failure count. Ascending enumeration, first
    /// maximum kept, so the lowest year wins ties.
    pub fn peak_year(rows: &[&BankRecord], presence: &ColumnPresence) -> Option<i32> {
        if !presence.closing_date {
            return None;
        }
        let counts = Self::year_counts(rows);
        let mut best: Option<(i32, usize)> = None;
        for (&year, &count) in &counts {
            match best {
                Some((_, best_count)) if count <= best_count => {}
                _ => best = Some((year, count)),
            }
        }
        best.map(|(year, _)| year)
    }

    /// State with the maximum failure count across all non-null states
    /// (not restricted to US codes). Smallest code wins ties.
    pub fn top_state(rows: &[&BankRecord], presence: &ColumnPresence) -> Option<String> {
        if !presence.state {
            return None;
        }
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for r in rows {
            if let Some(state) = r.state.as_deref() {
                *counts.entry(state).or_insert(0) += 1;
            }
        }
        let mut best: Option<(&str, usize)> = None;
        for (&state, &count) in &counts {
            match best {
                Some((_, best_count)) if count <= best_count => {}
                _ => best = Some((state, count)),
            }
        }
        best.map(|(state, _)| state.to_string())
    }

    fn year_counts(rows: &[&BankRecord]) -> BTreeMap<i32, usize> {
        let mut counts = BTreeMap::new();
        for r in rows {
            if let Some(date) = r.closing_date {
                *counts.entry(date.year()).or_insert(0) += 1;
            }
        }
        counts
    }

    /// (year, count) pairs ascending by year; rows with null dates excluded.
    pub fn failures_per_year(
        rows: &[&BankRecord],
        presence: &ColumnPresence,
    ) -> Vec<(i32, usize)> {
        if !presence.closing_date {
            return Vec::new();
        }
        Self::year_counts(rows).into_iter().collect()
    }

    /// (state, count) pairs ascending by code, restricted to the 51 US
    /// jurisdiction codes. Null and unrecognized codes are dropped.
    pub fn failures_by_state(
        rows: &[&BankRecord],
        presence: &ColumnPresence,
    ) -> Vec<(String, usize)> {
        if !presence.state {
            return Vec::new();
        }
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for r in rows {
            if let Some(state) = r.state.as_deref() {
                if US_JURISDICTIONS.contains(&state) {
                    *counts.entry(state).or_insert(0) += 1;
                }
            }
        }
        counts
            .into_iter()
            .map(|(state, count)| (state.to_string(), count))
            .collect()
    }

    /// (acquirer, count) pairs, null acquirers filled with "Unknown" before
    /// grouping, sorted descending by count. The sort is stable, so equal
    /// counts keep first-encountered order.
    pub fn acquirer_counts(
        rows: &[&BankRecord],
        presence: &ColumnPresence,
    ) -> Vec<(String, usize)> {
        if !presence.acquiring_institution {
            return Vec::new();
        }
        let mut order: Vec<String> = Vec::new();
        let mut counts: HashMap<String, usize> = HashMap::new();
        for r in rows {
            let acq = r
                .acquiring_institution
                .as_deref()
                .unwrap_or(UNKNOWN_ACQUIRER);
            match counts.get_mut(acq) {
                Some(count) => *count += 1,
                None => {
                    order.push(acq.to_string());
                    counts.insert(acq.to_string(), 1);
                }
            }
        }
        let mut pairs: Vec<(String, usize)> = order
            .into_iter()
            .map(|acq| {
                let count = counts[&acq];
                (acq, count)
            })
            .collect();
        pairs.sort_by(|a, b| b.1.cmp(&a.1));
        pairs
    }

    /// Smallest k whose cumulative share of the descending counts reaches
    /// 50% and 80%. None when the total is zero.
    pub fn pareto_thresholds(per_acquirer: &[(String, usize)]) -> Option<(usize, usize)> {
        let total: usize = per_acquirer.iter().map(|(_, c)| c).sum();
        if total == 0 {
            return None;
        }
        let total = total as f64;
        let mut cumulative = 0.0;
        let mut top_50 = None;
        let mut top_80 = None;
        for (k, (_, count)) in per_acquirer.iter().enumerate() {
            cumulative += *count as f64 / total;
            if top_50.is_none() && cumulative >= 0.5 {
                top_50 = Some(k + 1);
            }
            if top_80.is_none() && cumulative >= 0.8 {
                top_80 = Some(k + 1);
                break;
            }
        }
        match (top_50, top_80) {
            (Some(a), Some(b)) => Some((a, b)),
            _ => None,
        }
    }

    /// Per-year Herfindahl-Hirschman Index of acquirer concentration:
    /// HHI_year = sum of squared market shares of that year's acquirers.
    /// Needs both valid dates and the acquirer column.
    pub fn hhi_by_year(rows: &[&BankRecord], presence: &ColumnPresence) -> Vec<(i32, f64)> {
        if !presence.closing_date || !presence.acquiring_institution {
            return Vec::new();
        }
        let mut per_year: BTreeMap<i32, HashMap<&str, usize>> = BTreeMap::new();
        for r in rows {
            if let Some(date) = r.closing_date {
                let acq = r
                    .acquiring_institution
                    .as_deref()
                    .unwrap_or(UNKNOWN_ACQUIRER);
                *per_year
                    .entry(date.year())
                    .or_default()
                    .entry(acq)
                    .or_insert(0) += 1;
            }
        }
        per_year
            .into_iter()
            .map(|(year, counts)| {
                let total: usize = counts.values().sum();
                let total = total as f64;
                let hhi = counts
                    .values()
                    .map(|&c| (c as f64 / total).powi(2))
                    .sum::<f64>();
                (year, hhi)
            })
            .collect()
    }

    /// Compute every aggregate for the given table and criteria. The
    /// independent group-bys run on the rayon pool.
    pub fn compute_all(table: &NormalizedTable, criteria: &FilterCriteria) -> AggregateResult {
        let rows = Self::filter_rows(table, criteria);
        let presence = &table.presence;

        let ((per_year, per_state), (per_acquirer, hhi_by_year)) = rayon::join(
            || {
                rayon::join(
                    || Self::failures_per_year(&rows, presence),
                    || Self::failures_by_state(&rows, presence),
                )
            },
            || {
                rayon::join(
                    || Self::acquirer_counts(&rows, presence),
                    || Self::hhi_by_year(&rows, presence),
                )
            },
        );

        let pareto = Self::pareto_thresholds(&per_acquirer);

        AggregateResult {
            total_count: rows.len(),
            peak_year: Self::peak_year(&rows, presence),
            top_state: Self::top_state(&rows, presence),
            per_year,
            per_state,
            per_acquirer,
            pareto,
            hhi_by_year,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(year: Option<i32>, state: Option<&str>, acquirer: Option<&str>) -> BankRecord {
        BankRecord {
            bank_name: None,
            city: None,
            state: state.map(|s| s.to_string()),
            closing_date: year.and_then(|y| NaiveDate::from_ymd_opt(y, 6, 15)),
            acquiring_institution: acquirer.map(|a| a.to_string()),
            fund: None,
        }
    }

    fn table(records: Vec<BankRecord>) -> NormalizedTable {
        NormalizedTable {
            records,
            presence: ColumnPresence {
                bank_name: false,
                city: false,
                state: true,
                closing_date: true,
                acquiring_institution: true,
                fund: false,
            },
            columns: vec![
                "state".to_string(),
                "closing_date".to_string(),
                "acquiring_institution".to_string(),
            ],
            fingerprint: 1,
        }
    }

    #[test]
    fn test_empty_criteria_keeps_all_rows_in_order() {
        let t = table(vec![
            record(Some(2008), Some("CA"), Some("A")),
            record(None, None, None),
            record(Some(2010), Some("NY"), Some("B")),
        ]);
        let rows = Aggregator::filter_rows(&t, &FilterCriteria::default());
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].state.as_deref(), Some("CA"));
        assert_eq!(rows[2].state.as_deref(), Some("NY"));
    }

    #[test]
    fn test_null_date_excluded_under_year_filter() {
        let t = table(vec![
            record(Some(2008), Some("CA"), None),
            record(None, Some("CA"), None),
        ]);
        let criteria = FilterCriteria {
            year_range: Some((2000, 2020)),
            states: BTreeSet::new(),
        };
        let rows = Aggregator::filter_rows(&t, &criteria);
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_null_state_excluded_under_state_filter() {
        let t = table(vec![
            record(Some(2008), Some("CA"), None),
            record(Some(2008), None, None),
        ]);
        let criteria = FilterCriteria {
            year_range: None,
            states: BTreeSet::from(["CA".to_string()]),
        };
        let rows = Aggregator::filter_rows(&t, &criteria);
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_peak_year_lowest_wins_ties() {
        let t = table(vec![
            record(Some(2010), None, None),
            record(Some(2008), None, None),
            record(Some(2008), None, None),
            record(Some(2010), None, None),
        ]);
        let rows = Aggregator::filter_rows(&t, &FilterCriteria::default());
        assert_eq!(Aggregator::peak_year(&rows, &t.presence), Some(2008));
    }

    #[test]
    fn test_top_state_smallest_code_wins_ties() {
        let t = table(vec![
            record(None, Some("TX"), None),
            record(None, Some("AZ"), None),
        ]);
        let rows = Aggregator::filter_rows(&t, &FilterCriteria::default());
        assert_eq!(
            Aggregator::top_state(&rows, &t.presence).as_deref(),
            Some("AZ")
        );
    }

    #[test]
    fn test_missing_column_degrades_only_its_aggregate() {
        let mut t = table(vec![record(Some(2008), Some("CA"), Some("A"))]);
        t.presence.closing_date = false;
        let result = Aggregator::compute_all(&t, &FilterCriteria::default());
        assert_eq!(result.total_count, 1);
        assert_eq!(result.peak_year, None);
        assert!(result.per_year.is_empty());
        assert!(result.hhi_by_year.is_empty());
        // State and acquirer aggregates still compute.
        assert_eq!(result.top_state.as_deref(), Some("CA"));
        assert_eq!(result.per_state, vec![("CA".to_string(), 1)]);
        assert_eq!(result.per_acquirer, vec![("A".to_string(), 1)]);
    }

    #[test]
    fn test_by_state_drops_non_us_codes() {
        let t = table(vec![
            record(None, Some("CA"), None),
            record(None, Some("PR"), None),
            record(None, Some("ZZ"), None),
            record(None, None, None),
        ]);
        let rows = Aggregator::filter_rows(&t, &FilterCriteria::default());
        let by_state = Aggregator::failures_by_state(&rows, &t.presence);
        assert_eq!(by_state, vec![("CA".to_string(), 1)]);
    }

    #[test]
    fn test_acquirer_counts_fills_unknown_and_sorts() {
        let t = table(vec![
            record(None, None, Some("B")),
            record(None, None, Some("A")),
            record(None, None, Some("A")),
            record(None, None, None),
        ]);
        let rows = Aggregator::filter_rows(&t, &FilterCriteria::default());
        let counts = Aggregator::acquirer_counts(&rows, &t.presence);
        assert_eq!(counts[0], ("A".to_string(), 2));
        // B and Unknown tie at 1; B was encountered first.
        assert_eq!(counts[1], ("B".to_string(), 1));
        assert_eq!(counts[2], (UNKNOWN_ACQUIRER.to_string(), 1));
    }

    #[test]
    fn test_pareto_thresholds_minimal() {
        // Shares: 0.4, 0.3, 0.2, 0.1 -> cumulative 0.4, 0.7, 0.9, 1.0
        let counts = vec![
            ("A".to_string(), 4),
            ("B".to_string(), 3),
            ("C".to_string(), 2),
            ("D".to_string(), 1),
        ];
        let (top_50, top_80) = Aggregator::pareto_thresholds(&counts).unwrap();
        assert_eq!(top_50, 2);
        assert_eq!(top_80, 3);
        assert!(top_50 <= top_80 && top_80 <= counts.len());
    }

    #[test]
    fn test_pareto_exact_boundary() {
        // Cumulative hits exactly 0.5 at k=1.
        let counts = vec![("A".to_string(), 1), ("B".to_string(), 1)];
        let (top_50, top_80) = Aggregator::pareto_thresholds(&counts).unwrap();
        assert_eq!(top_50, 1);
        assert_eq!(top_80, 2);
    }

    #[test]
    fn test_pareto_none_when_empty() {
        assert_eq!(Aggregator::pareto_thresholds(&[]), None);
    }

    #[test]
    fn test_hhi_bounds_and_monopoly() {
        let t = table(vec![
            record(Some(2008), None, Some("A")),
            record(Some(2008), None, Some("A")),
            record(Some(2009), None, Some("A")),
            record(Some(2009), None, Some("B")),
        ]);
        let rows = Aggregator::filter_rows(&t, &FilterCriteria::default());
        let hhi = Aggregator::hhi_by_year(&rows, &t.presence);
        assert_eq!(hhi.len(), 2);
        // 2008: single acquirer -> exactly 1.0.
        assert_eq!(hhi[0], (2008, 1.0));
        // 2009: two equal acquirers -> 0.5.
        assert_eq!(hhi[1].0, 2009);
        assert!((hhi[1].1 - 0.5).abs() < 1e-12);
        for (_, v) in &hhi {
            assert!(*v > 0.0 && *v <= 1.0);
        }
    }

    #[test]
    fn test_count_sums_match_exclusions() {
        let t = table(vec![
            record(Some(2008), Some("CA"), None),
            record(None, Some("CA"), None),    // excluded from per_year
            record(Some(2009), None, None),    // excluded from per_state
            record(Some(2009), Some("PR"), None), // non-US, excluded from per_state
        ]);
        let result = Aggregator::compute_all(&t, &FilterCriteria::default());
        let per_year_sum: usize = result.per_year.iter().map(|(_, c)| c).sum();
        let per_state_sum: usize = result.per_state.iter().map(|(_, c)| c).sum();
        assert_eq!(result.total_count, 4);
        assert_eq!(per_year_sum, result.total_count - 1);
        assert_eq!(per_state_sum, result.total_count - 2);
    }

    #[test]
    fn test_spec_scenario_ca_filter() {
        let t = table(vec![
            record(Some(2008), Some("CA"), Some("Acq A")),
            record(Some(2008), Some("CA"), Some("Acq A")),
            record(Some(2008), Some("NY"), Some("Acq B")),
            record(Some(2009), Some("CA"), Some("Acq A")),
        ]);
        let criteria = FilterCriteria {
            year_range: Some((2008, 2009)),
            states: BTreeSet::from(["CA".to_string()]),
        };
        let result = Aggregator::compute_all(&t, &criteria);
        assert_eq!(result.total_count, 3);
        assert_eq!(result.peak_year, Some(2008));
        assert_eq!(result.top_state.as_deref(), Some("CA"));
        assert_eq!(result.per_year, vec![(2008, 2), (2009, 1)]);
        assert_eq!(result.per_acquirer, vec![("Acq A".to_string(), 3)]);
        assert_eq!(result.hhi_by_year, vec![(2008, 1.0), (2009, 1.0)]);
    }

    #[test]
    fn test_null_date_row_counts_in_total_and_state() {
        // A row whose date failed to parse still counts toward the total
        // and the state chart when no year filter is active.
        let t = table(vec![
            record(None, Some("GA"), Some("A")),
            record(Some(2008), Some("GA"), Some("A")),
        ]);
        let result = Aggregator::compute_all(&t, &FilterCriteria::default());
        assert_eq!(result.total_count, 2);
        assert_eq!(result.per_state, vec![("GA".to_string(), 2)]);
        assert_eq!(result.per_year, vec![(2008, 1)]);
        assert_eq!(result.hhi_by_year, vec![(2008, 1.0)]);
    }
}
