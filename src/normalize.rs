//! Column Normalizer: canonical names and typed values.

use once_cell::sync::Lazy;
use tracing::debug;

use crate::error::{LoadError, LoadResult};
use crate::schema::{is_percentage_column, Diagnostic};
use crate::types::{Cell, Dataset, RawSheet};
use crate::util::{cell_to_f64, cell_to_percent};

/// Canonical header of both grading sheets: the date, then a bunch count and
/// a percentage for each afdeling A..F, then the estate-wide pair.
pub static GRADING_COLUMNS: Lazy<Vec<String>> = Lazy::new(|| {
    let mut cols = vec!["Tanggal".to_string()];
    for afd in ['A', 'B', 'C', 'D', 'E', 'F'] {
        cols.push(format!("Afd {afd} (JJG)"));
        cols.push(format!("Afd {afd} %"));
    }
    cols.push("ESTATE (JJG)".to_string());
    cols.push("ESTATE %".to_string());
    cols
});

/// Replace every header with `canonical`, position by position.
///
/// Source column order is trusted as is: a reordered sheet is silently
/// mislabelled. A sheet with a different column count cannot be renamed and
/// fails the load.
pub fn rename_positional(mut sheet: RawSheet, canonical: &[String]) -> LoadResult<RawSheet> {
    if sheet.headers.len() != canonical.len() {
        return Err(LoadError::ColumnCount {
            sheet: sheet.name,
            expected: canonical.len(),
            found: sheet.headers.len(),
        });
    }
    sheet.headers = canonical.to_vec();
    Ok(sheet)
}

/// Coerce one cell for `column`. Anything unparseable becomes missing.
pub fn coerce_cell(column: &str, cell: &Cell) -> Option<f64> {
    if is_percentage_column(column) {
        cell_to_percent(cell)
    } else {
        cell_to_f64(cell)
    }
}

/// Turn a raw sheet into a typed dataset.
///
/// Percentages outside `0..=100` are dropped to missing and reported.
pub fn normalize_sheet(sheet: RawSheet, diagnostics: &mut Vec<Diagnostic>) -> Dataset {
    let RawSheet {
        name,
        headers,
        key_index,
        rows,
    } = sheet;

    let key_column = headers.get(key_index).cloned().unwrap_or_default();
    let columns: Vec<String> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != key_index)
        .map(|(_, h)| h.clone())
        .collect();

    let mut dataset = Dataset::new(name, key_column, columns);
    let mut dropped = 0usize;
    for row in rows {
        let mut values = Vec::with_capacity(dataset.columns.len());
        for (i, cell) in row.cells.iter().enumerate() {
            if i == key_index {
                continue;
            }
            let Some(column) = headers.get(i) else { break };
            let mut value = coerce_cell(column, cell);
            if let Some(v) = value {
                if is_percentage_column(column) && !(0.0..=100.0).contains(&v) {
                    diagnostics.push(Diagnostic::PercentOutOfRange {
                        dataset: dataset.name.clone(),
                        column: column.clone(),
                        row: row.key.label(),
                        value: v,
                    });
                    value = None;
                }
            }
            if value.is_none() && !cell.is_empty() {
                dropped += 1;
            }
            values.push(value);
        }
        dataset.push(row.key, values);
    }

    debug!(
        sheet = %dataset.name,
        rows = dataset.len(),
        dropped_cells = dropped,
        "normalized sheet"
    );
    dataset
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RawRow, RowKey};
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn sheet(headers: &[&str], rows: Vec<Vec<Cell>>) -> RawSheet {
        RawSheet {
            name: "Grading Mentah".to_string(),
            headers: headers.iter().map(|s| s.to_string()).collect(),
            key_index: 0,
            rows: rows
                .into_iter()
                .enumerate()
                .map(|(i, cells)| RawRow {
                    key: RowKey::Date(day(i as u32 + 1)),
                    cells,
                })
                .collect(),
        }
    }

    #[test]
    fn grading_header_has_fifteen_names() {
        assert_eq!(GRADING_COLUMNS.len(), 15);
        assert_eq!(GRADING_COLUMNS[0], "Tanggal");
        assert_eq!(GRADING_COLUMNS[1], "Afd A (JJG)");
        assert_eq!(GRADING_COLUMNS[12], "Afd F %");
        assert_eq!(GRADING_COLUMNS[14], "ESTATE %");
    }

    #[test]
    fn positional_rename_ignores_source_text() {
        let headers: Vec<String> = (0..15).map(|i| format!("Unnamed: {i}")).collect();
        let refs: Vec<&str> = headers.iter().map(String::as_str).collect();
        let renamed = rename_positional(sheet(&refs, vec![]), &GRADING_COLUMNS).unwrap();
        assert_eq!(renamed.headers[14], "ESTATE %");
        assert_eq!(renamed.headers[13], "ESTATE (JJG)");
    }

    #[test]
    fn positional_rename_rejects_wrong_width() {
        let err = rename_positional(sheet(&["Tanggal", "A"], vec![]), &GRADING_COLUMNS).unwrap_err();
        assert!(matches!(err, LoadError::ColumnCount { expected: 15, found: 2, .. }));
    }

    #[test]
    fn percentages_are_stripped_and_coerced() {
        let raw = sheet(
            &["Tanggal", "Afd A (JJG)", "Afd A %"],
            vec![
                vec![Cell::Text("2024-01-01".into()), Cell::Number(120.0), Cell::Text("1.5%".into())],
                vec![Cell::Text("2024-01-02".into()), Cell::Text("n/a".into()), Cell::Text("rusak%".into())],
                vec![Cell::Text("2024-01-03".into()), Cell::Empty, Cell::Number(2.0)],
            ],
        );
        let mut diags = Vec::new();
        let ds = normalize_sheet(raw, &mut diags);

        assert_eq!(ds.key_column, "Tanggal");
        assert_eq!(ds.columns, vec!["Afd A (JJG)".to_string(), "Afd A %".to_string()]);
        assert_eq!(ds.records[0].values, vec![Some(120.0), Some(1.5)]);
        assert_eq!(ds.records[1].values, vec![None, None]);
        assert_eq!(ds.records[2].values, vec![None, Some(2.0)]);
        assert!(diags.is_empty());
    }

    #[test]
    fn out_of_range_percent_becomes_missing() {
        let raw = sheet(
            &["Tanggal", "ESTATE %"],
            vec![vec![Cell::Text("2024-01-01".into()), Cell::Text("140%".into())]],
        );
        let mut diags = Vec::new();
        let ds = normalize_sheet(raw, &mut diags);
        assert_eq!(ds.records[0].values, vec![None]);
        assert!(matches!(
            &diags[0],
            Diagnostic::PercentOutOfRange { value, row, .. } if *value == 140.0 && row == "2024-01-01"
        ));
    }

    #[test]
    fn key_column_need_not_be_first() {
        let mut raw = sheet(
            &["AKP", "Date"],
            vec![vec![Cell::Number(7.0), Cell::Text("2024-01-01".into())]],
        );
        raw.key_index = 1;
        let ds = normalize_sheet(raw, &mut Vec::new());
        assert_eq!(ds.key_column, "Date");
        assert_eq!(ds.columns, vec!["AKP".to_string()]);
        assert_eq!(ds.records[0].values, vec![Some(7.0)]);
    }
}
