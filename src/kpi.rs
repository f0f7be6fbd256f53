//! KPI cards and threshold status.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tabled::Tabled;

use crate::aggregate::{column_mean, column_sum};
use crate::filter::filter_by_date;
use crate::schema::{Field, ResolvedSchema};
use crate::types::{Dataset, PrimaryWorkbook};
use crate::util::{format_number, month_bounds};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Green,
    Caution,
    Critical,
}

impl Status {
    pub fn icon(self) -> &'static str {
        match self {
            Status::Green => "✅",
            Status::Caution => "⚠️",
            Status::Critical => "🚨",
        }
    }

    /// Card accent used by the dashboard stylesheet.
    pub fn color(self) -> &'static str {
        match self {
            Status::Green => "green",
            Status::Caution => "orange",
            Status::Critical => "red",
        }
    }
}

/// Two cutoffs splitting a lower-is-better metric into three bands:
/// green below `green_below`, caution up to and including `caution_up_to`,
/// critical above.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdPolicy {
    pub green_below: f64,
    pub caution_up_to: f64,
}

impl ThresholdPolicy {
    pub const fn new(green_below: f64, caution_up_to: f64) -> Self {
        ThresholdPolicy {
            green_below,
            caution_up_to,
        }
    }

    pub fn classify(&self, value: f64) -> Status {
        if value < self.green_below {
            Status::Green
        } else if value <= self.caution_up_to {
            Status::Caution
        } else {
            Status::Critical
        }
    }
}

// Colour and icon cutoffs of the same metric disagree (e.g. Mentah 0.1 is an
// orange card with a green tick). Both are reproduced as the dashboard shows them.
pub const MENTAH_COLOR: ThresholdPolicy = ThresholdPolicy::new(0.0, 0.2);
pub const MENTAH_ICON: ThresholdPolicy = ThresholdPolicy::new(0.21, 0.21);
pub const MENGKAL_COLOR: ThresholdPolicy = ThresholdPolicy::new(2.0, 5.0);
pub const MENGKAL_ICON: ThresholdPolicy = ThresholdPolicy::new(5.1, 5.1);

/// Gauge bands for a higher-is-better achievement percentage.
pub const ACHIEVEMENT_CRITICAL_BELOW: f64 = 85.0;
pub const ACHIEVEMENT_CAUTION_BELOW: f64 = 100.0;

pub fn achievement_status(pct: f64) -> Status {
    if pct < ACHIEVEMENT_CRITICAL_BELOW {
        Status::Critical
    } else if pct < ACHIEVEMENT_CAUTION_BELOW {
        Status::Caution
    } else {
        Status::Green
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GradingMetric {
    Mentah,
    Mengkal,
}

impl GradingMetric {
    pub fn color_policy(self) -> ThresholdPolicy {
        match self {
            GradingMetric::Mentah => MENTAH_COLOR,
            GradingMetric::Mengkal => MENGKAL_COLOR,
        }
    }

    pub fn icon_policy(self) -> ThresholdPolicy {
        match self {
            GradingMetric::Mentah => MENTAH_ICON,
            GradingMetric::Mengkal => MENGKAL_ICON,
        }
    }

    pub fn color_status(self, value: f64) -> Status {
        self.color_policy().classify(value)
    }

    pub fn icon_status(self, value: f64) -> Status {
        self.icon_policy().classify(value)
    }
}

/// `numerator / denominator`, or exactly `0.0` when the denominator is
/// missing, zero, negative or not finite.
pub fn ratio(numerator: f64, denominator: Option<f64>) -> f64 {
    match denominator {
        Some(d) if d > 0.0 && d.is_finite() => {
            let r = numerator / d;
            if r.is_finite() {
                r
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

/// [`ratio`] as a percentage.
pub fn ratio_pct(numerator: f64, denominator: Option<f64>) -> f64 {
    ratio(numerator, denominator) * 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GradingKpi {
    pub value: f64,
    pub color: Status,
    pub icon: Status,
}

impl GradingKpi {
    pub fn new(metric: GradingMetric, value: f64) -> Self {
        GradingKpi {
            value,
            color: metric.color_status(value),
            icon: metric.icon_status(value),
        }
    }
}

/// Every KPI shown on the main dashboard tab.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardKpis {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub total_production: f64,
    pub total_akp: f64,
    /// Month-to-date production against budget, month of `start`.
    pub budget_achievement: f64,
    pub bbc_achievement: f64,
    pub avg_mentah: GradingKpi,
    pub avg_mengkal: GradingKpi,
    pub total_rainfall: f64,
    pub avg_harvest_labor: f64,
}

fn field_sum(dataset: &Dataset, schema: &ResolvedSchema, field: Field) -> f64 {
    schema
        .column(field)
        .map(|c| column_sum(dataset, c))
        .unwrap_or(0.0)
}

fn field_mean(dataset: &Dataset, schema: &ResolvedSchema, field: Field) -> f64 {
    schema
        .column(field)
        .and_then(|c| column_mean(dataset, c))
        .unwrap_or(0.0)
}

/// Mean estate-wide grading percentage; `0.0` without data.
fn estate_pct(grading: &Dataset) -> f64 {
    column_mean(grading, "ESTATE %").unwrap_or(0.0)
}

impl DashboardKpis {
    pub fn compute(workbook: &PrimaryWorkbook, start: NaiveDate, end: NaiveDate) -> Self {
        let fields = &workbook.dashboard_fields;
        let dash = filter_by_date(&workbook.dashboard, start, end);
        let mentah = filter_by_date(&workbook.grading_mentah, start, end);
        let mengkal = filter_by_date(&workbook.grading_mengkal, start, end);

        // Month-to-date figures ignore `end` and read the unfiltered sheets.
        let (production_mtd, budget_mtd, bbc_mtd) = match month_bounds(start) {
            Some((first, last)) => {
                let month_dash = filter_by_date(&workbook.dashboard, first, last);
                let month_budget = filter_by_date(&workbook.budget, first, last);
                let has_budget_rows = !month_budget.is_empty();
                (
                    field_sum(&month_dash, fields, Field::ActualProduction),
                    has_budget_rows.then(|| field_sum(&month_budget, &workbook.budget_fields, Field::Budget)),
                    has_budget_rows.then(|| field_sum(&month_budget, &workbook.budget_fields, Field::Bbc)),
                )
            }
            None => (0.0, None, None),
        };
        tracing::debug!(
            month = start.month(),
            year = start.year(),
            production_mtd,
            ?budget_mtd,
            ?bbc_mtd,
            "month-to-date totals"
        );

        DashboardKpis {
            start,
            end,
            total_production: field_sum(&dash, fields, Field::ActualProduction),
            total_akp: field_sum(&dash, fields, Field::Akp),
            budget_achievement: ratio_pct(production_mtd, budget_mtd),
            bbc_achievement: ratio_pct(production_mtd, bbc_mtd),
            avg_mentah: GradingKpi::new(GradingMetric::Mentah, estate_pct(&mentah)),
            avg_mengkal: GradingKpi::new(GradingMetric::Mengkal, estate_pct(&mengkal)),
            total_rainfall: field_sum(&dash, fields, Field::Rainfall),
            avg_harvest_labor: field_mean(&dash, fields, Field::HarvestLabor),
        }
    }

    /// Cards in dashboard order.
    pub fn cards(&self) -> Vec<KpiCard> {
        vec![
            KpiCard::new("Total Produksi", format!("{} Mt", format_number(self.total_production, 0)), None),
            KpiCard::new(
                "Capaian Budget (MTD)",
                format!("{}%", format_number(self.budget_achievement, 1)),
                Some(achievement_status(self.budget_achievement)),
            ),
            KpiCard::new("Total AKP", format!("{} Mt", format_number(self.total_akp, 1)), None),
            KpiCard::new(
                "Capaian BBC (MTD)",
                format!("{}%", format_number(self.bbc_achievement, 1)),
                Some(achievement_status(self.bbc_achievement)),
            ),
            KpiCard::grading("Rerata Mentah", &self.avg_mentah),
            KpiCard::new("Total Curah Hujan", format!("{} mm", format_number(self.total_rainfall, 0)), None),
            KpiCard::grading("Rerata Mengkal", &self.avg_mengkal),
            KpiCard::new("Avg TK Panen", format!("{} Org", format_number(self.avg_harvest_labor, 0)), None),
        ]
    }
}

/// Display-ready card.
#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct KpiCard {
    #[tabled(rename = "KPI")]
    pub label: String,
    #[tabled(rename = "Nilai")]
    pub value: String,
    #[tabled(rename = "Status", display_with = "display_status")]
    pub status: Option<Status>,
    #[tabled(rename = "Ikon", display_with = "display_icon")]
    pub icon: Option<Status>,
}

fn display_status(s: &Option<Status>) -> String {
    s.map(|s| s.color().to_string()).unwrap_or_default()
}

fn display_icon(s: &Option<Status>) -> String {
    s.map(|s| s.icon().to_string()).unwrap_or_default()
}

impl KpiCard {
    fn new(label: &str, value: String, status: Option<Status>) -> Self {
        KpiCard {
            label: label.to_string(),
            value,
            status,
            icon: None,
        }
    }

    fn grading(label: &str, kpi: &GradingKpi) -> Self {
        KpiCard {
            label: label.to_string(),
            value: format!("{:.2}%", kpi.value),
            status: Some(kpi.color),
            icon: Some(kpi.icon),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{primary_from_grids, Grid, PRIMARY_SHEETS};
    use crate::normalize::GRADING_COLUMNS;
    use crate::types::Cell;

    #[test]
    fn ratio_guards_zero_and_missing_denominators() {
        assert_eq!(ratio_pct(450.0, Some(0.0)), 0.0);
        assert_eq!(ratio_pct(450.0, None), 0.0);
        assert_eq!(ratio_pct(450.0, Some(-3.0)), 0.0);
        assert_eq!(ratio_pct(450.0, Some(f64::NAN)), 0.0);
        assert_eq!(ratio_pct(450.0, Some(500.0)), 90.0);
    }

    #[test]
    fn mengkal_bands() {
        assert_eq!(GradingMetric::Mengkal.color_status(1.9), Status::Green);
        assert_eq!(GradingMetric::Mengkal.color_status(2.0), Status::Caution);
        assert_eq!(GradingMetric::Mengkal.color_status(5.0), Status::Caution);
        assert_eq!(GradingMetric::Mengkal.color_status(5.01), Status::Critical);
        assert_eq!(GradingMetric::Mengkal.icon_status(5.05), Status::Green);
        assert_eq!(GradingMetric::Mengkal.icon_status(5.1), Status::Caution);
        assert_eq!(GradingMetric::Mengkal.icon_status(5.2), Status::Critical);
    }

    #[test]
    fn mentah_colour_never_green_for_real_values() {
        assert_eq!(GradingMetric::Mentah.color_status(0.0), Status::Caution);
        assert_eq!(GradingMetric::Mentah.color_status(0.2), Status::Caution);
        assert_eq!(GradingMetric::Mentah.color_status(0.25), Status::Critical);
        assert_eq!(GradingMetric::Mentah.icon_status(0.2), Status::Green);
        assert_eq!(GradingMetric::Mentah.icon_status(0.21), Status::Caution);
        assert_eq!(GradingMetric::Mentah.icon_status(0.3), Status::Critical);
    }

    // The colour and icon rules of one metric disagree. This pins the
    // current behaviour so any unification is a deliberate change.
    #[test]
    fn colour_and_icon_rules_diverge() {
        assert_ne!(MENTAH_COLOR, MENTAH_ICON);
        assert_ne!(MENGKAL_COLOR, MENGKAL_ICON);

        let m = GradingKpi::new(GradingMetric::Mentah, 0.1);
        assert_eq!((m.color, m.icon), (Status::Caution, Status::Green));

        let mk = GradingKpi::new(GradingMetric::Mengkal, 5.05);
        assert_eq!((mk.color, mk.icon), (Status::Critical, Status::Green));

        let mk = GradingKpi::new(GradingMetric::Mengkal, 3.0);
        assert_eq!((mk.color, mk.icon), (Status::Caution, Status::Green));
    }

    #[test]
    fn achievement_gauge_bands() {
        assert_eq!(achievement_status(84.9), Status::Critical);
        assert_eq!(achievement_status(85.0), Status::Caution);
        assert_eq!(achievement_status(99.99), Status::Caution);
        assert_eq!(achievement_status(100.0), Status::Green);
    }

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn num(v: f64) -> Cell {
        Cell::Number(v)
    }

    fn grading_grid(estate_pct: &[f64]) -> Grid {
        let mut grid = vec![GRADING_COLUMNS.iter().map(|h| text(h)).collect::<Vec<_>>()];
        for (i, pct) in estate_pct.iter().enumerate() {
            let mut row = vec![text(&format!("2024-01-{:02}", i + 1))];
            row.extend((0..13).map(|_| num(1.0)));
            row.push(text(&format!("{pct}%")));
            grid.push(row);
        }
        grid
    }

    fn workbook() -> PrimaryWorkbook {
        let dashboard = vec![
            vec![text("Tanggal"), text("Aktual Produksi"), text("AKP"), text("Restan"), text("Curah Hujan (mm)"), text("TK Panen")],
            vec![text("2024-01-01"), num(100.0), num(90.0), num(5.0), num(12.0), num(40.0)],
            vec![text("2024-01-02"), num(150.0), num(95.0), num(3.0), Cell::Empty, num(44.0)],
            vec![text("2024-01-03"), num(200.0), num(100.0), num(0.0), num(8.0), num(42.0)],
            vec![text("2024-02-01"), num(999.0), num(1.0), num(0.0), num(1.0), num(1.0)],
        ];
        let production = vec![
            vec![text("Tanggal"), text("Afdeling 1 (Ton)"), text("TOTAL")],
            vec![text("2024-01-01"), num(100.0), num(100.0)],
        ];
        let budget = vec![
            vec![text("Tanggal"), text("Budget Produksi"), text("BBC Produksi")],
            vec![text("2024-01-01"), num(300.0), num(400.0)],
            vec![text("2024-01-15"), num(200.0), num(200.0)],
        ];
        let grids: Vec<(String, Grid)> = PRIMARY_SHEETS
            .iter()
            .zip([
                dashboard,
                production,
                budget,
                grading_grid(&[0.1, 0.3]),
                grading_grid(&[4.0, 6.0, 5.0]),
            ])
            .map(|(n, g)| (n.to_string(), g))
            .collect();
        primary_from_grids(grids).unwrap()
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn dashboard_kpis_over_a_range() {
        let wb = workbook();
        let k = DashboardKpis::compute(&wb, ymd(2024, 1, 1), ymd(2024, 1, 3));

        assert_eq!(k.total_production, 450.0);
        assert_eq!(k.total_akp, 285.0);
        assert_eq!(k.total_rainfall, 20.0);
        assert_eq!(k.avg_harvest_labor, 42.0);
        // 450 produced in January against 500 budget and 600 BBC.
        assert_eq!(k.budget_achievement, 90.0);
        assert_eq!(k.bbc_achievement, 75.0);
        assert!((k.avg_mentah.value - 0.2).abs() < 1e-9);
        assert_eq!(k.avg_mengkal.value, 5.0);
        assert_eq!(k.avg_mengkal.color, Status::Caution);
        assert_eq!(k.avg_mengkal.icon, Status::Green);
    }

    #[test]
    fn month_to_date_ignores_range_end() {
        let wb = workbook();
        let k = DashboardKpis::compute(&wb, ymd(2024, 1, 2), ymd(2024, 1, 2));
        assert_eq!(k.total_production, 150.0);
        assert_eq!(k.budget_achievement, 90.0);
    }

    #[test]
    fn month_without_budget_rows_reports_zero() {
        let wb = workbook();
        let k = DashboardKpis::compute(&wb, ymd(2024, 2, 1), ymd(2024, 2, 1));
        assert_eq!(k.total_production, 999.0);
        assert_eq!(k.budget_achievement, 0.0);
        assert_eq!(k.bbc_achievement, 0.0);
        // No grading rows in February.
        assert_eq!(k.avg_mentah.value, 0.0);
    }

    #[test]
    fn missing_lookup_columns_yield_zero() {
        let mut wb = workbook();
        wb.dashboard_fields = ResolvedSchema::default();
        wb.budget_fields = ResolvedSchema::default();
        let k = DashboardKpis::compute(&wb, ymd(2024, 1, 1), ymd(2024, 1, 3));
        assert_eq!(k.total_rainfall, 0.0);
        assert_eq!(k.avg_harvest_labor, 0.0);
        assert_eq!(k.budget_achievement, 0.0);
    }

    #[test]
    fn cards_follow_dashboard_order() {
        let wb = workbook();
        let cards = DashboardKpis::compute(&wb, ymd(2024, 1, 1), ymd(2024, 1, 3)).cards();
        assert_eq!(cards.len(), 8);
        assert_eq!(cards[0].value, "450 Mt");
        assert_eq!(cards[1].value, "90.0%");
        assert_eq!(cards[1].status, Some(Status::Caution));
        assert_eq!(cards[6].label, "Rerata Mengkal");
        assert_eq!(cards[6].value, "5.00%");
        assert_eq!(cards[6].icon, Some(Status::Green));
    }
}
