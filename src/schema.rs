//! Column classification.
//!
//! One table decides what a column *is*: its aggregation role, and which
//! named business field it carries. Both the summary row and the KPI code
//! read from here, so a column is never treated differently by two callers.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::types::Dataset;

/// Key column names. These are never aggregated.
pub const IDENTIFIER_COLUMNS: &[&str] = &["Tgl", "Tanggal", "Date"];

/// Upper-cased markers meaning "this is a cumulative quantity".
///
/// Note `(J)` does not match `(JJG)`: bunch-count columns in the grading
/// sheets fall through to the excluded role.
pub const CUMULATIVE_MARKERS: &[&str] = &["(J)", "AKTUAL", "AKP", "RESTAN", "TOTAL", "CURAH", "LUAS"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnRole {
    Identifier,
    Additive,
    Averaged,
    Excluded,
}

pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER_COLUMNS
        .iter()
        .any(|id| id.eq_ignore_ascii_case(name.trim()))
}

pub fn is_percentage_column(name: &str) -> bool {
    name.contains('%')
}

/// Role of a column, from its name alone.
///
/// Precedence: identifier, then the caller's explicit additive names, then
/// the cumulative markers, then `%`/`TK` (averaged); anything else is excluded.
pub fn classify_column(name: &str, additive: &[String]) -> ColumnRole {
    if is_identifier(name) {
        return ColumnRole::Identifier;
    }
    if additive.iter().any(|c| c == name) {
        return ColumnRole::Additive;
    }
    let upper = name.to_uppercase();
    if CUMULATIVE_MARKERS.iter().any(|m| upper.contains(m)) {
        ColumnRole::Additive
    } else if is_percentage_column(name) || upper.contains("TK") {
        ColumnRole::Averaged
    } else {
        ColumnRole::Excluded
    }
}

/// True when `name` contains every needle, ignoring case.
pub fn column_matches(name: &str, needles: &[&str]) -> bool {
    let lower = name.to_lowercase();
    needles.iter().all(|n| lower.contains(&n.to_lowercase()))
}

/// First column (by position) containing every needle, ignoring case.
pub fn find_column<'a>(columns: &'a [String], needles: &[&str]) -> Option<&'a str> {
    columns
        .iter()
        .find(|c| column_matches(c, needles))
        .map(String::as_str)
}

/// Business fields the dashboard reads by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Field {
    ActualProduction,
    Akp,
    Restan,
    Rainfall,
    HarvestLabor,
    Budget,
    Bbc,
}

#[derive(Debug, Clone, Copy)]
pub enum Matcher {
    /// Whole name, case-insensitive, surrounding whitespace ignored.
    Exact(&'static str),
    /// Every substring must occur, case-insensitive.
    Contains(&'static [&'static str]),
}

impl Matcher {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Matcher::Exact(want) => name.trim().eq_ignore_ascii_case(want),
            Matcher::Contains(needles) => column_matches(name, needles),
        }
    }

    /// First matching column by position.
    pub fn find<'a>(&self, columns: &'a [String]) -> Option<&'a str> {
        match self {
            Matcher::Exact(_) => columns.iter().find(|c| self.matches(c)).map(String::as_str),
            Matcher::Contains(needles) => find_column(columns, needles),
        }
    }
}

pub const DASHBOARD_FIELDS: &[Field] = &[
    Field::ActualProduction,
    Field::Akp,
    Field::Restan,
    Field::Rainfall,
    Field::HarvestLabor,
];

pub const BUDGET_FIELDS: &[Field] = &[Field::Budget, Field::Bbc];

impl Field {
    /// How the field is recognised in a header row.
    pub fn matcher(self) -> Matcher {
        match self {
            Field::ActualProduction => Matcher::Exact("Aktual Produksi"),
            Field::Akp => Matcher::Exact("AKP"),
            Field::Restan => Matcher::Exact("Restan"),
            Field::Rainfall => Matcher::Contains(&["curah"]),
            Field::HarvestLabor => Matcher::Contains(&["tk", "panen"]),
            Field::Budget => Matcher::Contains(&["budget"]),
            Field::Bbc => Matcher::Contains(&["bbc"]),
        }
    }
}

/// Something the loader wants the user to know but that did not stop the load.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    Unresolved {
        dataset: String,
        field: Field,
    },
    Ambiguous {
        dataset: String,
        field: Field,
        candidates: Vec<String>,
        chosen: String,
    },
    PercentOutOfRange {
        dataset: String,
        column: String,
        row: String,
        value: f64,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Unresolved { dataset, field } => {
                write!(f, "{dataset}: no column found for {field:?}")
            }
            Diagnostic::Ambiguous { dataset, field, candidates, chosen } => write!(
                f,
                "{dataset}: {field:?} matches {} columns ({}), using '{chosen}'",
                candidates.len(),
                candidates.join(", ")
            ),
            Diagnostic::PercentOutOfRange { dataset, column, row, value } => write!(
                f,
                "{dataset}: '{column}' at {row} is {value}, outside 0..100; treated as missing"
            ),
        }
    }
}

/// Field-to-column mapping of one dataset, resolved once after loading.
#[derive(Debug, Clone, Default)]
pub struct ResolvedSchema {
    columns: HashMap<Field, String>,
}

impl ResolvedSchema {
    pub fn column(&self, field: Field) -> Option<&str> {
        self.columns.get(&field).map(String::as_str)
    }
}

/// Resolve `fields` against the dataset's columns. The first match wins;
/// misses and multiple matches are reported through `diagnostics`.
pub fn resolve_fields(dataset: &Dataset, fields: &[Field], diagnostics: &mut Vec<Diagnostic>) -> ResolvedSchema {
    let mut resolved = ResolvedSchema::default();
    for &field in fields {
        let matcher = field.matcher();
        let Some(chosen) = matcher.find(&dataset.columns) else {
            diagnostics.push(Diagnostic::Unresolved {
                dataset: dataset.name.clone(),
                field,
            });
            continue;
        };
        let candidates: Vec<String> = dataset
            .columns
            .iter()
            .filter(|c| matcher.matches(c))
            .cloned()
            .collect();
        if candidates.len() > 1 {
            diagnostics.push(Diagnostic::Ambiguous {
                dataset: dataset.name.clone(),
                field,
                candidates,
                chosen: chosen.to_string(),
            });
        }
        resolved.columns.insert(field, chosen.to_string());
    }
    resolved
}
