//! Error types for loading and exporting

use thiserror::Error;

pub type LoadResult<T> = std::result::Result<T, LoadError>;

/// Reasons a workbook load fails as a whole.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("Missing sheet: {0}")]
    MissingSheet(String),

    #[error("Sheet '{0}' has no header row")]
    NoHeader(String),

    #[error("Sheet '{sheet}' has no date column (expected Tanggal or Date)")]
    MissingDateColumn { sheet: String },

    #[error("Sheet '{sheet}', row {row}: cannot parse date from '{value}'")]
    BadDate {
        sheet: String,
        row: usize,
        value: String,
    },

    #[error("Sheet '{sheet}' has {found} columns, expected {expected}")]
    ColumnCount {
        sheet: String,
        expected: usize,
        found: usize,
    },

    #[error("Sheet '{sheet}', column {column}: cannot parse period from header '{value}'")]
    BadPeriod {
        sheet: String,
        column: usize,
        value: String,
    },
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
