use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tabled::{builder::Builder, settings::Style, Table, Tabled};

use crate::error::ExportError;
use crate::types::{Dataset, RawSheet};
use crate::util::format_cell;

/// Default file name of the raw dashboard export.
pub const EXPORT_FILE_NAME: &str = "produksi.csv";

/// Write `dataset` as CSV: key column first, missing values as empty fields.
pub fn write_csv<W: Write>(writer: W, dataset: &Dataset) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(std::iter::once(&dataset.key_column).chain(&dataset.columns))?;
    for record in &dataset.records {
        let mut row = Vec::with_capacity(record.values.len() + 1);
        row.push(record.key.label());
        row.extend(
            record
                .values
                .iter()
                .map(|v| v.map(|v| v.to_string()).unwrap_or_default()),
        );
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Serialize `rows` as CSV with a header taken from the field names.
pub fn write_csv_rows<W: Write, T: Serialize>(writer: W, rows: &[T]) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write a sheet as it was read: every source column, text cells kept.
/// The date column is written `%Y-%m-%d` whatever its source format.
pub fn write_raw_csv<W: Write>(writer: W, sheet: &RawSheet) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(&sheet.headers)?;
    for row in &sheet.rows {
        let fields = row.cells.iter().enumerate().map(|(i, cell)| {
            if i == sheet.key_index {
                row.key.label()
            } else {
                cell.to_header()
            }
        });
        wtr.write_record(fields)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn csv_bytes(sheet: &RawSheet) -> Result<Vec<u8>, ExportError> {
    let mut buf = Vec::new();
    write_raw_csv(&mut buf, sheet)?;
    Ok(buf)
}

pub fn write_csv_file(path: &Path, sheet: &RawSheet) -> Result<(), ExportError> {
    let file = std::fs::File::create(path)?;
    write_raw_csv(file, sheet)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ExportError> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Markdown table of `dataset`, at most `max_rows` rows from the top.
pub fn render_dataset(dataset: &Dataset, max_rows: usize) -> String {
    if dataset.is_empty() {
        return "(no rows)".to_string();
    }
    let mut builder = Builder::default();
    builder.push_record(std::iter::once(dataset.key_column.clone()).chain(dataset.columns.iter().cloned()));
    for record in dataset.records.iter().take(max_rows) {
        builder.push_record(
            std::iter::once(record.key.label()).chain(
                dataset
                    .columns
                    .iter()
                    .zip(&record.values)
                    .map(|(c, v)| format_cell(c, *v)),
            ),
        );
    }
    let mut table = builder.build();
    table.with(Style::markdown());
    table.to_string()
}

pub fn render_rows<T: Tabled>(rows: &[T]) -> String {
    if rows.is_empty() {
        return "(no rows)".to_string();
    }
    let mut table = Table::new(rows);
    table.with(Style::markdown());
    table.to_string()
}
