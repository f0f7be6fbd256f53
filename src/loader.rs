use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};
use tracing::{debug, info, warn};

use crate::blocks::{parse_block_sheet, BlockWorkbook, BLOCK_SHEETS};
use crate::error::{LoadError, LoadResult};
use crate::normalize::{normalize_sheet, rename_positional, GRADING_COLUMNS};
use crate::schema::{resolve_fields, BUDGET_FIELDS, DASHBOARD_FIELDS};
use crate::types::{Cell, LoadOutcome, PrimaryWorkbook, RawRow, RawSheet, RowKey};
use crate::util::{parse_date_cell, parse_date_text};

pub const DASHBOARD_SHEET: &str = "Dashboard";
pub const PRODUCTION_SHEET: &str = "Prod Afd";
pub const BUDGET_SHEET: &str = "Budget & BBC";
pub const MENTAH_SHEET: &str = "Grading Mentah";
pub const MENGKAL_SHEET: &str = "Grading Mengkal";

pub const PRIMARY_SHEETS: [&str; 5] = [
    DASHBOARD_SHEET,
    PRODUCTION_SHEET,
    BUDGET_SHEET,
    MENTAH_SHEET,
    MENGKAL_SHEET,
];

/// Accepted names for the date key column.
pub const DATE_COLUMNS: &[&str] = &["Tanggal", "Date"];

/// Sheet contents as plain rows of cells, header row first.
pub type Grid = Vec<Vec<Cell>>;

pub fn data_to_cell(data: &Data) -> Cell {
    match data {
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::String(s) if s.trim().is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Bool(b) => Cell::Text(b.to_string()),
        // as_datetime honours the workbook's 1900/1904 date system.
        Data::DateTime(dt) if dt.is_datetime() => dt
            .as_datetime()
            .map(|d| Cell::Date(d.date()))
            .unwrap_or(Cell::Number(dt.as_f64())),
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::DateTimeIso(s) => parse_date_text(s)
            .map(Cell::Date)
            .unwrap_or_else(|| Cell::Text(s.clone())),
        Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(_) | Data::Empty => Cell::Empty,
    }
}

pub fn range_to_grid(range: &Range<Data>) -> Grid {
    range
        .rows()
        .map(|row| row.iter().map(data_to_cell).collect())
        .collect()
}

/// Read the named sheets, in order. Any missing sheet fails the whole read.
pub fn read_grids(path: &Path, sheets: &[&str]) -> LoadResult<Vec<(String, Grid)>> {
    let mut workbook = open_workbook_auto(path)?;
    let available = workbook.sheet_names();
    let mut grids = Vec::with_capacity(sheets.len());
    for &name in sheets {
        if !available.iter().any(|s| s == name) {
            return Err(LoadError::MissingSheet(name.to_string()));
        }
        let range = workbook.worksheet_range(name)?;
        let (rows, cols) = range.get_size();
        debug!(sheet = name, rows, cols, "read sheet");
        grids.push((name.to_string(), range_to_grid(&range)));
    }
    Ok(grids)
}

/// Remove the grid called `name` from `grids`.
pub fn take_grid(grids: &mut Vec<(String, Grid)>, name: &str) -> LoadResult<Grid> {
    let idx = grids
        .iter()
        .position(|(n, _)| n == name)
        .ok_or_else(|| LoadError::MissingSheet(name.to_string()))?;
    Ok(grids.swap_remove(idx).1)
}

fn is_date_column(header: &str) -> bool {
    DATE_COLUMNS
        .iter()
        .any(|c| c.eq_ignore_ascii_case(header.trim()))
}

/// Parse a daily sheet: find the date column, parse every row's date.
///
/// A single unparseable date fails the sheet. Rows with every cell empty are
/// skipped. Rows come back in date order; rows sharing a date keep their
/// sheet order.
pub fn parse_daily_sheet(name: &str, grid: Grid) -> LoadResult<RawSheet> {
    let mut rows = grid.into_iter();
    let headers: Vec<String> = rows
        .next()
        .ok_or_else(|| LoadError::NoHeader(name.to_string()))?
        .iter()
        .map(Cell::to_header)
        .collect();

    let key_index = headers
        .iter()
        .position(|h| is_date_column(h))
        .ok_or_else(|| LoadError::MissingDateColumn {
            sheet: name.to_string(),
        })?;

    let mut parsed: Vec<RawRow> = Vec::new();
    let mut out_of_order = 0usize;
    for (idx, mut cells) in rows.enumerate() {
        if cells.iter().all(Cell::is_empty) {
            continue;
        }
        cells.resize(headers.len(), Cell::Empty);
        // Spreadsheet row number: 1-based, after the header.
        let row_no = idx + 2;
        let key_cell = &cells[key_index];
        let date = parse_date_cell(key_cell).ok_or_else(|| LoadError::BadDate {
            sheet: name.to_string(),
            row: row_no,
            value: key_cell.to_header(),
        })?;
        if parsed.last().and_then(|r| r.key.date()).is_some_and(|p| date < p) {
            out_of_order += 1;
        }
        parsed.push(RawRow {
            key: RowKey::Date(date),
            cells,
        });
    }

    if out_of_order > 0 {
        warn!(sheet = name, rows = out_of_order, "dates out of order, sorting by date");
        parsed.sort_by_key(|r| r.key.date());
    }

    Ok(RawSheet {
        name: name.to_string(),
        headers,
        key_index,
        rows: parsed,
    })
}

/// Build the primary workbook from already-read grids.
pub fn primary_from_grids(mut grids: Vec<(String, Grid)>) -> LoadResult<PrimaryWorkbook> {
    let mut diagnostics = Vec::new();

    let mut daily = |name: &str| -> LoadResult<RawSheet> { parse_daily_sheet(name, take_grid(&mut grids, name)?) };
    let dashboard = daily(DASHBOARD_SHEET)?;
    let production = daily(PRODUCTION_SHEET)?;
    let budget = daily(BUDGET_SHEET)?;
    let mentah = rename_positional(daily(MENTAH_SHEET)?, &GRADING_COLUMNS)?;
    let mengkal = rename_positional(daily(MENGKAL_SHEET)?, &GRADING_COLUMNS)?;

    let dashboard_raw = dashboard.clone();
    let dashboard = normalize_sheet(dashboard, &mut diagnostics);
    let production = normalize_sheet(production, &mut diagnostics);
    let budget = normalize_sheet(budget, &mut diagnostics);
    let grading_mentah = normalize_sheet(mentah, &mut diagnostics);
    let grading_mengkal = normalize_sheet(mengkal, &mut diagnostics);

    let dashboard_fields = resolve_fields(&dashboard, DASHBOARD_FIELDS, &mut diagnostics);
    let budget_fields = resolve_fields(&budget, BUDGET_FIELDS, &mut diagnostics);

    for d in &diagnostics {
        warn!("{}", d);
    }

    Ok(PrimaryWorkbook {
        dashboard,
        dashboard_raw,
        production,
        budget,
        grading_mentah,
        grading_mengkal,
        dashboard_fields,
        budget_fields,
        diagnostics,
    })
}

/// Load and normalize the five primary sheets. All or nothing.
pub fn load_primary(path: impl AsRef<Path>) -> LoadResult<PrimaryWorkbook> {
    let path = path.as_ref();
    info!(path = %path.display(), "loading production workbook");
    let grids = read_grids(path, &PRIMARY_SHEETS)?;
    let workbook = primary_from_grids(grids)?;
    info!(
        days = workbook.dashboard.len(),
        diagnostics = workbook.diagnostics.len(),
        "production workbook loaded"
    );
    Ok(workbook)
}

pub fn load_primary_or_empty(path: impl AsRef<Path>) -> LoadOutcome<PrimaryWorkbook> {
    load_primary(path).into()
}

pub fn blocks_from_grids(mut grids: Vec<(String, Grid)>) -> LoadResult<BlockWorkbook> {
    let mut series = Vec::with_capacity(BLOCK_SHEETS.len());
    for name in BLOCK_SHEETS {
        series.push(parse_block_sheet(name, take_grid(&mut grids, name)?)?);
    }
    Ok(BlockWorkbook { series })
}

/// Load the five per-block monthly sheets. All or nothing.
pub fn load_blocks(path: impl AsRef<Path>) -> LoadResult<BlockWorkbook> {
    let path = path.as_ref();
    info!(path = %path.display(), "loading block workbook");
    let workbook = blocks_from_grids(read_grids(path, &BLOCK_SHEETS)?)?;
    info!(sheets = workbook.series.len(), "block workbook loaded");
    Ok(workbook)
}
