//! Normalizer Module
//! Canonicalizes column names and turns the raw string DataFrame into typed
//! failed-bank records. Unparseable values become nulls, never errors.

use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

/// One normalized row of the failed-bank table. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankRecord {
    pub bank_name: Option<String>,
    pub city: Option<String>,
    /// Two-letter code, upper-cased.
    pub state: Option<String>,
    /// None when the source value is absent or unparseable.
    pub closing_date: Option<NaiveDate>,
    /// Raw tidied value; the "Unknown" fill is applied at grouping time.
    pub acquiring_institution: Option<String>,
    pub fund: Option<String>,
}

/// Which of the six recognized columns the source actually carried.
/// Every aggregate checks its own required columns against these flags and
/// degrades to an explicit "no data" result when they are missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnPresence {
    pub bank_name: bool,
    pub city: bool,
    pub state: bool,
    pub closing_date: bool,
    pub acquiring_institution: bool,
    pub fund: bool,
}

/// Normalized table: ordered records plus the canonical header set and an
/// identity fingerprint used as the memoization key component.
#[derive(Debug, Clone)]
pub struct NormalizedTable {
    pub records: Vec<BankRecord>,
    pub presence: ColumnPresence,
    /// Canonicalized names of every source column, recognized or not.
    pub columns: Vec<String>,
    pub fingerprint: u64,
}

/// Canonicalize a single raw column name: trim, drop the historical footnote
/// dagger, lower-case, spaces to underscores.
pub fn canonicalize_column(raw: &str) -> String {
    raw.trim().replace('\u{2020}', "").to_lowercase().replace(' ', "_")
}

/// Canonicalize a header row and apply the two fixed aliasing rules. An
/// alias is renamed only when the canonical name is not already present, so
/// it never overwrites an existing canonical column. Idempotent.
pub fn canonicalize_headers(raw: &[String]) -> Vec<String> {
    let mut names: Vec<String> = raw.iter().map(|c| canonicalize_column(c)).collect();

    for (alias, canonical) in [
        ("closingdate", "closing_date"),
        ("acquiringinstitution", "acquiring_institution"),
    ] {
        if names.iter().any(|n| n == canonical) {
            continue;
        }
        for name in names.iter_mut() {
            if name == alias {
                *name = canonical.to_string();
            }
        }
    }

    names
}

/// Date formats seen across FDIC failed-bank exports.
const DATE_FORMATS: &[&str] = &[
    "%d-%b-%y",
    "%d-%b-%Y",
    "%B %d, %Y",
    "%m/%d/%Y",
    "%m/%d/%y",
    "%Y-%m-%d",
];

/// Permissive date parse: first matching format wins, failure is None.
pub fn parse_closing_date(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

fn tidy(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}

/// Cell value at row `i` of `series`, as trimmed text, None for nulls.
fn cell(series: Option<&Column>, i: usize) -> Option<String> {
    let series = series?;
    let value = series.get(i).ok()?;
    if value.is_null() {
        None
    } else {
        Some(value.to_string().trim_matches('"').to_string())
    }
}

/// Build a NormalizedTable from the raw string DataFrame.
///
/// `source_id` identifies where the frame came from (file path or upload
/// name); it feeds the fingerprint so that switching sources invalidates
/// memoized aggregates.
pub fn normalize(df: &DataFrame, source_id: &str) -> Result<NormalizedTable, NormalizeError> {
    let raw_names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    let columns = canonicalize_headers(&raw_names);

    // Map each recognized canonical name to its source column, if present.
    let find = |canonical: &str| -> Option<&Column> {
        columns
            .iter()
            .position(|c| c == canonical)
            .and_then(|idx| df.column(raw_names[idx].as_str()).ok())
    };

    let bank_name_col = find("bank_name");
    let city_col = find("city");
    let state_col = find("state");
    let closing_date_col = find("closing_date");
    let acquirer_col = find("acquiring_institution");
    let fund_col = find("fund");

    let presence = ColumnPresence {
        bank_name: bank_name_col.is_some(),
        city: city_col.is_some(),
        state: state_col.is_some(),
        closing_date: closing_date_col.is_some(),
        acquiring_institution: acquirer_col.is_some(),
        fund: fund_col.is_some(),
    };

    let mut records = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        records.push(BankRecord {
            bank_name: tidy(cell(bank_name_col, i)),
            city: tidy(cell(city_col, i)),
            state: tidy(cell(state_col, i)).map(|s| s.to_uppercase()),
            closing_date: cell(closing_date_col, i).and_then(|v| parse_closing_date(&v)),
            acquiring_institution: tidy(cell(acquirer_col, i)),
            fund: tidy(cell(fund_col, i)),
        });
    }

    let mut hasher = DefaultHasher::new();
    source_id.hash(&mut hasher);
    columns.hash(&mut hasher);
    df.height().hash(&mut hasher);
    let fingerprint = hasher.finish();

    Ok(NormalizedTable {
        records,
        presence,
        columns,
        fingerprint,
    })
}

impl NormalizedTable {
    /// Distinct years with at least one valid closing date, ascending.
    /// Drives the year-filter combo boxes.
    pub fn available_years(&self) -> Vec<i32> {
        use chrono::Datelike;
        let mut years: Vec<i32> = self
            .records
            .iter()
            .filter_map(|r| r.closing_date.map(|d| d.year()))
            .collect();
        years.sort_unstable();
        years.dedup();
        years
    }

    /// Distinct non-null states, ascending. Drives the state multi-select.
    pub fn available_states(&self) -> Vec<String> {
        let mut states: Vec<String> = self
            .records
            .iter()
            .filter_map(|r| r.state.clone())
            .collect();
        states.sort_unstable();
        states.dedup();
        states
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string_df(cols: &[(&str, &[Option<&str>])]) -> DataFrame {
        let columns: Vec<Column> = cols
            .iter()
            .map(|(name, values)| {
                Column::new(
                    (*name).into(),
                    values
                        .iter()
                        .map(|v| v.map(|s| s.to_string()))
                        .collect::<Vec<Option<String>>>(),
                )
            })
            .collect();
        DataFrame::new(columns).unwrap()
    }

    #[test]
    fn test_canonicalize_column() {
        assert_eq!(canonicalize_column("  Bank Name\u{2020} "), "bank_name");
        assert_eq!(canonicalize_column("Closing Date"), "closing_date");
        assert_eq!(canonicalize_column("STATE"), "state");
    }

    #[test]
    fn test_canonicalize_is_idempotent() {
        let raw = vec![
            "Bank Name\u{2020}".to_string(),
            "ClosingDate".to_string(),
            "Acquiring Institution".to_string(),
        ];
        let once = canonicalize_headers(&raw);
        let twice = canonicalize_headers(&once);
        assert_eq!(once, twice);
        assert_eq!(
            once,
            vec!["bank_name", "closing_date", "acquiring_institution"]
        );
    }

    #[test]
    fn test_alias_never_overwrites_canonical() {
        let raw = vec!["Closing Date".to_string(), "ClosingDate".to_string()];
        let names = canonicalize_headers(&raw);
        // The canonical column already exists, so the alias stays as-is.
        assert_eq!(names, vec!["closing_date", "closingdate"]);
    }

    #[test]
    fn test_parse_closing_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2020, 10, 23).unwrap();
        assert_eq!(parse_closing_date("23-Oct-20"), Some(expected));
        assert_eq!(parse_closing_date("October 23, 2020"), Some(expected));
        assert_eq!(parse_closing_date("10/23/2020"), Some(expected));
        assert_eq!(parse_closing_date("2020-10-23"), Some(expected));
        assert_eq!(parse_closing_date("not-a-date"), None);
        assert_eq!(parse_closing_date(""), None);
    }

    #[test]
    fn test_normalize_tidies_and_uppercases() {
        let df = string_df(&[
            ("Bank Name\u{2020}", &[Some(" First Bank ")]),
            ("City", &[Some("Chicago")]),
            ("State", &[Some(" il ")]),
            ("ClosingDate", &[Some("23-Oct-20")]),
            ("Acquiring Institution", &[None]),
        ]);

        let table = normalize(&df, "test").unwrap();
        assert!(table.presence.bank_name);
        assert!(table.presence.closing_date);
        assert!(table.presence.acquiring_institution);
        assert!(!table.presence.fund);

        let record = &table.records[0];
        assert_eq!(record.bank_name.as_deref(), Some("First Bank"));
        assert_eq!(record.state.as_deref(), Some("IL"));
        assert_eq!(
            record.closing_date,
            NaiveDate::from_ymd_opt(2020, 10, 23)
        );
        assert_eq!(record.acquiring_institution, None);
    }

    #[test]
    fn test_unparseable_date_becomes_null() {
        let df = string_df(&[
            ("State", &[Some("GA")]),
            ("Closing Date", &[Some("not-a-date")]),
        ]);
        let table = normalize(&df, "test").unwrap();
        assert!(table.presence.closing_date);
        assert_eq!(table.records[0].closing_date, None);
        assert_eq!(table.records[0].state.as_deref(), Some("GA"));
    }

    #[test]
    fn test_fingerprint_changes_with_source() {
        let df = string_df(&[("State", &[Some("GA")])]);
        let a = normalize(&df, "a.csv").unwrap();
        let b = normalize(&df, "b.csv").unwrap();
        assert_ne!(a.fingerprint, b.fingerprint);
    }

    #[test]
    fn test_available_years_and_states() {
        let df = string_df(&[
            ("State", &[Some("ny"), Some("ca"), Some("ca"), None]),
            (
                "Closing Date",
                &[Some("1/10/2009"), Some("3/5/2008"), Some("bad"), Some("7/2/2008")],
            ),
        ]);
        let table = normalize(&df, "test").unwrap();
        assert_eq!(table.available_years(), vec![2008, 2009]);
        assert_eq!(table.available_states(), vec!["CA", "NY"]);
    }
}
