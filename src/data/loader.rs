//! CSV Loader Module
//! Reads the failed-bank CSV with Polars. Every column is read as text;
//! typed coercion happens in the normalizer.

use polars::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoaderError {
    /// The input file does not exist. Distinct from a read/parse failure so
    /// the UI can prompt for an upload instead of reporting corruption.
    #[error("Could not find '{0}'")]
    NotFound(String),
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
}

/// Handles CSV file loading with Polars.
pub struct CsvLoader {
    df: Option<DataFrame>,
    file_path: Option<PathBuf>,
}

impl Default for CsvLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvLoader {
    pub fn new() -> Self {
        Self {
            df: None,
            file_path: None,
        }
    }

    /// Read a CSV, keeping every column as a string column. Static so the
    /// background load thread can call it without borrowing the loader.
    pub fn read_csv(file_path: &str) -> Result<DataFrame, LoaderError> {
        if !Path::new(file_path).exists() {
            return Err(LoaderError::NotFound(file_path.to_string()));
        }

        // infer_schema_length of 0 keeps every column as String; dates and
        // numbers are coerced later, with failures mapped to nulls.
        let df = LazyCsvReader::new(file_path)
            .with_infer_schema_length(Some(0))
            .with_ignore_errors(true)
            .finish()?
            .collect()?;

        Ok(df)
    }

    pub fn get_row_count(&self) -> usize {
        self.df.as_ref().map(|df| df.height()).unwrap_or(0)
    }

    pub fn get_file_path(&self) -> Option<&PathBuf> {
        self.file_path.as_ref()
    }

    /// Set DataFrame directly (used for async loading).
    pub fn set_dataframe(&mut self, df: DataFrame, path: PathBuf) {
        self.df = Some(df);
        self.file_path = Some(path);
    }
}
