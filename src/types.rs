use chrono::NaiveDate;
use serde::Serialize;
use tabled::Tabled;

use crate::schema::{Diagnostic, ResolvedSchema};

/// A spreadsheet cell as the loader saw it, before any coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Text(String),
    Date(NaiveDate),
    Empty,
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Header text for this cell. Dates render as ISO, whole numbers without a fraction.
    pub fn to_header(&self) -> String {
        match self {
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Cell::Number(n) => n.to_string(),
            Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
            Cell::Empty => String::new(),
        }
    }
}

/// Identifier of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowKey {
    /// Calendar day as loaded from the source sheet.
    Date(NaiveDate),
    /// Calendar day after date-range filtering; displayed as `dd/mm`.
    Day(NaiveDate),
    Block(String),
    /// Sentinel label of a synthetic summary record.
    Summary(String),
}

impl RowKey {
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            RowKey::Date(d) | RowKey::Day(d) => Some(*d),
            RowKey::Block(_) | RowKey::Summary(_) => None,
        }
    }

    pub fn is_summary(&self) -> bool {
        matches!(self, RowKey::Summary(_))
    }

    pub fn label(&self) -> String {
        match self {
            RowKey::Date(d) => d.format("%Y-%m-%d").to_string(),
            RowKey::Day(d) => d.format("%d/%m").to_string(),
            RowKey::Block(b) => b.clone(),
            RowKey::Summary(s) => s.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub key: RowKey,
    /// One slot per entry of the owning dataset's `columns`.
    pub values: Vec<Option<f64>>,
}

/// A named table of records sharing one column set.
///
/// The key column is held apart from `columns`: `columns` lists only the
/// value columns, and every record carries exactly one value per column.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub name: String,
    pub key_column: String,
    pub columns: Vec<String>,
    pub records: Vec<Record>,
}

impl Dataset {
    pub fn new(name: impl Into<String>, key_column: impl Into<String>, columns: Vec<String>) -> Self {
        Dataset {
            name: name.into(),
            key_column: key_column.into(),
            columns,
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, key: RowKey, mut values: Vec<Option<f64>>) {
        values.resize(self.columns.len(), None);
        self.records.push(Record { key, values });
    }

    /// Same name and columns, no records.
    pub fn clone_schema(&self) -> Dataset {
        Dataset::new(self.name.clone(), self.key_column.clone(), self.columns.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Values of one column across the data records (summary records skipped).
    pub fn column_values(&self, idx: usize) -> impl Iterator<Item = Option<f64>> + '_ {
        self.records
            .iter()
            .filter(|r| !r.key.is_summary())
            .map(move |r| r.values.get(idx).copied().flatten())
    }

    pub fn data_records(&self) -> impl Iterator<Item = &Record> {
        self.records.iter().filter(|r| !r.key.is_summary())
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.records.iter().filter_map(|r| r.key.date()).min()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.records.iter().filter_map(|r| r.key.date()).max()
    }
}

/// Raw sheet as read from a workbook: every header, and the parsed key per row.
#[derive(Debug, Clone)]
pub struct RawSheet {
    pub name: String,
    pub headers: Vec<String>,
    pub key_index: usize,
    pub rows: Vec<RawRow>,
}

#[derive(Debug, Clone)]
pub struct RawRow {
    pub key: RowKey,
    /// All cells of the row, the key cell included, aligned with `headers`.
    pub cells: Vec<Cell>,
}

/// Normalized content of the primary production workbook.
#[derive(Debug, Clone)]
pub struct PrimaryWorkbook {
    pub dashboard: Dataset,
    /// Dashboard cells as read, for the raw export.
    pub dashboard_raw: RawSheet,
    pub production: Dataset,
    pub budget: Dataset,
    pub grading_mentah: Dataset,
    pub grading_mengkal: Dataset,
    pub dashboard_fields: ResolvedSchema,
    pub budget_fields: ResolvedSchema,
    pub diagnostics: Vec<Diagnostic>,
}

/// All-or-nothing result of a load call.
#[derive(Debug, Clone)]
pub enum LoadOutcome<T> {
    Loaded(T),
    NoData { reason: String },
}

impl<T> LoadOutcome<T> {
    pub fn loaded(&self) -> Option<&T> {
        match self {
            LoadOutcome::Loaded(v) => Some(v),
            LoadOutcome::NoData { .. } => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadOutcome::Loaded(_))
    }
}

impl<T> From<Result<T, crate::error::LoadError>> for LoadOutcome<T> {
    fn from(result: Result<T, crate::error::LoadError>) -> Self {
        match result {
            Ok(v) => LoadOutcome::Loaded(v),
            Err(e) => {
                tracing::warn!(error = %e, "load failed, no data available");
                LoadOutcome::NoData {
                    reason: e.to_string(),
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Tabled)]
pub struct AfdelingTotal {
    #[serde(rename = "Afd")]
    #[tabled(rename = "Afd")]
    pub afdeling: String,
    #[serde(rename = "Ton")]
    #[tabled(rename = "Ton", display_with = "crate::util::display_ton")]
    pub ton: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockObservation {
    pub block: String,
    pub period: NaiveDate,
    pub value: Option<f64>,
}
