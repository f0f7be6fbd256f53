use crate::schema::{classify_column, ColumnRole};
use crate::types::{AfdelingTotal, Dataset, Record, RowKey};
use crate::util::{mean_present, sum_present};

pub const TOTAL_LABEL: &str = "TOTAL";
pub const TOTAL_AVERAGE_LABEL: &str = "TOTAL / RERATA";

/// Reduce one column of the data records according to its role.
pub fn reduce_column(dataset: &Dataset, idx: usize, role: ColumnRole) -> Option<f64> {
    match role {
        ColumnRole::Additive => Some(sum_present(dataset.column_values(idx))),
        ColumnRole::Averaged => mean_present(dataset.column_values(idx)),
        ColumnRole::Identifier | ColumnRole::Excluded => None,
    }
}

/// Copy of `dataset` with one synthetic record labelled `label` appended.
///
/// Additive columns are summed and averaged columns averaged over the
/// non-summary records; every other column is present but missing. Names in
/// `additive` are summed whatever their marker. A dataset without data
/// records comes back unchanged.
pub fn add_summary_row(dataset: &Dataset, label: &str, additive: &[String]) -> Dataset {
    if dataset.data_records().next().is_none() {
        return dataset.clone();
    }

    let values = dataset
        .columns
        .iter()
        .enumerate()
        .map(|(idx, name)| reduce_column(dataset, idx, classify_column(name, additive)))
        .collect();

    let mut out = dataset.clone();
    out.records.push(Record {
        key: RowKey::Summary(label.to_string()),
        values,
    });
    out
}

/// Sum of a named column; `0.0` when the column does not exist.
pub fn column_sum(dataset: &Dataset, name: &str) -> f64 {
    dataset
        .column_index(name)
        .map(|i| sum_present(dataset.column_values(i)))
        .unwrap_or(0.0)
}

/// Mean of a named column; `None` when the column does not exist or holds no values.
pub fn column_mean(dataset: &Dataset, name: &str) -> Option<f64> {
    dataset
        .column_index(name)
        .and_then(|i| mean_present(dataset.column_values(i)))
}

/// Per-afdeling tonnage columns of the `Prod Afd` sheet.
pub fn afdeling_columns(dataset: &Dataset) -> Vec<String> {
    dataset
        .columns
        .iter()
        .filter(|c| c.contains("Afdeling") && c.contains("(Ton)"))
        .cloned()
        .collect()
}

pub fn afdeling_totals(dataset: &Dataset) -> Vec<AfdelingTotal> {
    afdeling_columns(dataset)
        .into_iter()
        .map(|c| AfdelingTotal {
            ton: column_sum(dataset, &c),
            afdeling: c,
        })
        .collect()
}

/// `Prod Afd` with a `TOTAL` row: afdeling tonnage and the `TOTAL` column are summed.
pub fn production_with_total(dataset: &Dataset) -> Dataset {
    let mut additive = afdeling_columns(dataset);
    additive.push("TOTAL".to_string());
    add_summary_row(dataset, TOTAL_LABEL, &additive)
}

/// Grading sheet with a `TOTAL / RERATA` row.
pub fn grading_with_total(dataset: &Dataset) -> Dataset {
    add_summary_row(dataset, TOTAL_AVERAGE_LABEL, &[])
}
