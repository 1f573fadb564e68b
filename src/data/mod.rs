//! Data module - CSV loading and normalization

mod loader;
mod normalizer;

pub use loader::{CsvLoader, LoaderError};
pub use normalizer::{
    canonicalize_column, canonicalize_headers, normalize, parse_closing_date, BankRecord,
    ColumnPresence, NormalizedTable,
};
