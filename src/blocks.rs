//! Per-block monthly series from the secondary workbook.
//!
//! Each sheet is wide: one row per block, one column per reporting month.

use chrono::NaiveDate;

use crate::error::{LoadError, LoadResult};
use crate::kpi::ratio;
use crate::types::{BlockObservation, Cell, Dataset, RowKey};
use crate::util::{cell_to_f64, parse_period_cell};

pub const BLOCK_SHEETS: [&str; 5] = ["tbs", "tonase", "yph", "brondol", "bjr"];

#[derive(Debug, Clone, PartialEq)]
pub struct BlockSeries {
    /// Month of each value column, first of the month, aligned with `dataset.columns`.
    pub periods: Vec<NaiveDate>,
    pub dataset: Dataset,
}

impl BlockSeries {
    pub fn name(&self) -> &str {
        &self.dataset.name
    }

    pub fn blocks(&self) -> impl Iterator<Item = &str> {
        self.dataset.records.iter().filter_map(|r| match &r.key {
            RowKey::Block(b) => Some(b.as_str()),
            _ => None,
        })
    }

    pub fn value(&self, block: &str, period: NaiveDate) -> Option<f64> {
        let col = self.periods.iter().position(|p| *p == period)?;
        self.dataset
            .records
            .iter()
            .find(|r| matches!(&r.key, RowKey::Block(b) if b == block))
            .and_then(|r| r.values.get(col).copied().flatten())
    }

    /// One observation per block and month, blocks in sheet order.
    pub fn to_long(&self) -> Vec<BlockObservation> {
        let mut out = Vec::with_capacity(self.dataset.len() * self.periods.len());
        for record in &self.dataset.records {
            let RowKey::Block(block) = &record.key else { continue };
            for (period, value) in self.periods.iter().zip(&record.values) {
                out.push(BlockObservation {
                    block: block.clone(),
                    period: *period,
                    value: *value,
                });
            }
        }
        out
    }
}

#[derive(Debug, Clone, Default)]
pub struct BlockWorkbook {
    pub series: Vec<BlockSeries>,
}

impl BlockWorkbook {
    pub fn get(&self, name: &str) -> Option<&BlockSeries> {
        self.series.iter().find(|s| s.name() == name)
    }
}

/// Parse one wide sheet. Every header after the first must name a month.
pub fn parse_block_sheet(name: &str, grid: Vec<Vec<Cell>>) -> LoadResult<BlockSeries> {
    let mut rows = grid.into_iter();
    let header = rows
        .next()
        .ok_or_else(|| LoadError::NoHeader(name.to_string()))?;
    let key_column = header.first().map(Cell::to_header).unwrap_or_default();

    let mut periods = Vec::with_capacity(header.len().saturating_sub(1));
    for (column, cell) in header.iter().enumerate().skip(1) {
        let period = parse_period_cell(cell).ok_or_else(|| LoadError::BadPeriod {
            sheet: name.to_string(),
            column: column + 1,
            value: cell.to_header(),
        })?;
        periods.push(period);
    }

    let columns = periods
        .iter()
        .map(|p| p.format("%Y-%m").to_string())
        .collect();
    let mut dataset = Dataset::new(name, key_column, columns);
    for cells in rows {
        let block = cells.first().map(Cell::to_header).unwrap_or_default();
        if block.is_empty() {
            continue;
        }
        let values = cells.iter().skip(1).map(cell_to_f64).collect();
        dataset.push(RowKey::Block(block), values);
    }

    Ok(BlockSeries { periods, dataset })
}

/// Average bunch weight in kg per bunch: tonnage (t) × 1000 / bunch count.
///
/// Follows the blocks and months of `tonase`. A missing or zero count gives
/// zero; a missing tonnage stays missing.
pub fn derive_bjr(tonase: &BlockSeries, tbs: &BlockSeries) -> BlockSeries {
    let mut dataset = Dataset::new("bjr (derived)", tonase.dataset.key_column.clone(), tonase.dataset.columns.clone());
    for record in &tonase.dataset.records {
        let RowKey::Block(block) = &record.key else { continue };
        let values = tonase
            .periods
            .iter()
            .zip(&record.values)
            .map(|(period, ton)| ton.map(|t| ratio(t * 1000.0, tbs.value(block, *period))))
            .collect();
        dataset.push(record.key.clone(), values);
    }
    BlockSeries {
        periods: tonase.periods.clone(),
        dataset,
    }
}
