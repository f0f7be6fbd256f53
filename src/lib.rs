//! Normalization and derived metrics for palm-oil plantation production workbooks.
//!
//! The pipeline runs in two stages. The loader and normalizer turn the
//! spreadsheet exports into typed [`Dataset`]s, all or nothing. After that,
//! the date filter, the summary-row aggregator and the KPI classifier are
//! independent, stateless views over that data.
//!
//! ```no_run
//! use sawit_report::{aggregate, filter, kpi, loader};
//!
//! let workbook = loader::load_primary("master_data_produksi.xlsx")?;
//! let (start, end) = (
//!     workbook.dashboard.first_date().unwrap(),
//!     workbook.dashboard.last_date().unwrap(),
//! );
//! let mentah = filter::filter_by_date(&workbook.grading_mentah, start, end);
//! let table = aggregate::grading_with_total(&mentah);
//! let kpis = kpi::DashboardKpis::compute(&workbook, start, end);
//! # Ok::<(), sawit_report::error::LoadError>(())
//! ```

pub mod aggregate;
pub mod blocks;
pub mod cache;
pub mod error;
pub mod filter;
pub mod kpi;
pub mod loader;
pub mod normalize;
pub mod output;
pub mod schema;
pub mod types;
pub mod util;

pub use types::{Cell, Dataset, LoadOutcome, PrimaryWorkbook, Record, RowKey};
