//! Date-Range Filter and other view-shaping helpers.

use chrono::NaiveDate;

use crate::types::{Dataset, Record, RowKey};

/// Key column name once dates are relabelled for display.
pub const DISPLAY_KEY_COLUMN: &str = "Tgl";

/// Records whose date lies in `start..=end`, keyed by `dd/mm` labels.
///
/// The input is left untouched. `start > end` gives an empty dataset.
/// Summary and block records carry no date and never match. Filtering an
/// already-filtered dataset with the same range returns an equal dataset.
pub fn filter_by_date(dataset: &Dataset, start: NaiveDate, end: NaiveDate) -> Dataset {
    let records = dataset
        .records
        .iter()
        .filter_map(|r| {
            let date = r.key.date()?;
            (start <= date && date <= end).then(|| Record {
                key: RowKey::Day(date),
                values: r.values.clone(),
            })
        })
        .collect();

    Dataset {
        name: dataset.name.clone(),
        key_column: DISPLAY_KEY_COLUMN.to_string(),
        columns: dataset.columns.clone(),
        records,
    }
}

/// Keep only the named columns, in the order given; unknown names are skipped.
pub fn select_columns(dataset: &Dataset, names: &[&str]) -> Dataset {
    let picks: Vec<usize> = names
        .iter()
        .filter_map(|n| dataset.column_index(n))
        .collect();
    Dataset {
        name: dataset.name.clone(),
        key_column: dataset.key_column.clone(),
        columns: picks.iter().map(|&i| dataset.columns[i].clone()).collect(),
        records: dataset
            .records
            .iter()
            .map(|r| Record {
                key: r.key.clone(),
                values: picks
                    .iter()
                    .map(|&i| r.values.get(i).copied().flatten())
                    .collect(),
            })
            .collect(),
    }
}

/// The last `n` records.
pub fn tail(dataset: &Dataset, n: usize) -> Dataset {
    let skip = dataset.records.len().saturating_sub(n);
    Dataset {
        records: dataset.records[skip..].to_vec(),
        ..dataset.clone_schema()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn dashboard() -> Dataset {
        let mut ds = Dataset::new(
            "Dashboard",
            "Tanggal",
            vec!["Aktual Produksi".into(), "AKP".into(), "Restan".into()],
        );
        for d in 1..=5 {
            ds.push(RowKey::Date(day(d)), vec![Some(d as f64 * 10.0), Some(1.0), None]);
        }
        ds
    }

    #[test]
    fn keeps_inclusive_window_and_relabels() {
        let ds = dashboard();
        let f = filter_by_date(&ds, day(2), day(4));
        assert_eq!(f.key_column, "Tgl");
        assert_eq!(f.columns, ds.columns);
        let labels: Vec<String> = f.records.iter().map(|r| r.key.label()).collect();
        assert_eq!(labels, vec!["02/01", "03/01", "04/01"]);
        assert_eq!(f.records[0].values[0], Some(20.0));
    }

    #[test]
    fn input_is_not_mutated() {
        let ds = dashboard();
        let before = ds.clone();
        let _ = filter_by_date(&ds, day(2), day(3));
        assert_eq!(ds, before);
    }

    #[test]
    fn reversed_range_is_empty() {
        let f = filter_by_date(&dashboard(), day(4), day(2));
        assert!(f.is_empty());
        assert_eq!(f.columns.len(), 3);
    }

    #[test]
    fn filtering_twice_changes_nothing() {
        let ds = dashboard();
        let once = filter_by_date(&ds, day(1), day(5));
        let twice = filter_by_date(&once, day(1), day(5));
        assert_eq!(once, twice);

        let narrow = filter_by_date(&ds, day(2), day(3));
        assert_eq!(filter_by_date(&narrow, day(2), day(3)), narrow);
    }

    #[test]
    fn summary_rows_fall_outside_any_range() {
        let mut ds = dashboard();
        ds.push(RowKey::Summary("TOTAL".into()), vec![Some(150.0), Some(5.0), None]);
        let f = filter_by_date(&ds, day(1), day(31));
        assert_eq!(f.len(), 5);
    }

    #[test]
    fn select_and_tail_make_the_production_log() {
        let ds = dashboard();
        let log = tail(&select_columns(&ds, &["Restan", "Aktual Produksi", "Nope"]), 2);
        assert_eq!(log.columns, vec!["Restan".to_string(), "Aktual Produksi".to_string()]);
        assert_eq!(log.len(), 2);
        assert_eq!(log.records[1].values, vec![None, Some(50.0)]);
        assert_eq!(tail(&ds, 10).len(), 5);
    }
}
