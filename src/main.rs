// Command-line front end for the production workbook.
//
// Every subcommand, and every menu choice of the interactive session, is one
// interaction: poll the source file, reload through the cache when it
// changed, then render from that data. Nothing runs in the background.
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sawit_report::aggregate::{afdeling_totals, grading_with_total, production_with_total};
use sawit_report::blocks::{derive_bjr, BlockWorkbook, BLOCK_SHEETS};
use sawit_report::cache::{Freshness, StalenessTracker, WorkbookCache};
use sawit_report::filter::{filter_by_date, select_columns, tail};
use sawit_report::kpi::DashboardKpis;
use sawit_report::util::format_int;
use sawit_report::loader::{load_blocks, load_primary};
use sawit_report::output::{
    csv_bytes, render_dataset, render_rows, write_csv, write_csv_file, write_csv_rows, write_json,
    EXPORT_FILE_NAME,
};
use sawit_report::{Dataset, LoadOutcome, PrimaryWorkbook};

#[derive(Parser)]
#[command(name = "sawit-report")]
#[command(about = "Production, grading and KPI summary for plantation workbooks", long_about = None)]
struct Cli {
    /// Primary production workbook
    #[arg(long, env = "SAWIT_WORKBOOK", default_value = "master_data_produksi.xlsx")]
    workbook: PathBuf,

    /// Per-block monthly workbook (tbs, tonase, yph, brondol, bjr)
    #[arg(long, env = "SAWIT_BLOCKS")]
    blocks: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Inclusive date window; defaults to the first and last Dashboard day.
#[derive(Args, Clone, Copy, Default)]
struct RangeArgs {
    #[arg(long)]
    start: Option<NaiveDate>,
    #[arg(long)]
    end: Option<NaiveDate>,
}

#[derive(Subcommand)]
enum Commands {
    /// KPI cards for a date range
    Summary {
        #[command(flatten)]
        range: RangeArgs,
        /// Also write the KPIs as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// One sheet, filtered, with its summary row
    Table {
        #[arg(value_enum)]
        sheet: SheetArg,
        #[command(flatten)]
        range: RangeArgs,
        #[arg(long, default_value_t = 60)]
        rows: usize,
        /// Write the table to stdout as CSV instead
        #[arg(long)]
        csv: bool,
    },
    /// Tonnage per afdeling
    Distribution {
        #[command(flatten)]
        range: RangeArgs,
    },
    /// Latest production entries
    Log {
        #[command(flatten)]
        range: RangeArgs,
        #[arg(long, default_value_t = 10)]
        rows: usize,
    },
    /// Raw, unfiltered Dashboard sheet as CSV ("-" for stdout)
    Export {
        #[arg(long, default_value = EXPORT_FILE_NAME)]
        out: PathBuf,
    },
    /// Per-block monthly series
    Blocks {
        #[arg(default_value = "tonase", value_parser = BLOCK_SHEETS)]
        sheet: String,
        /// One CSV row per block and month instead of the wide table
        #[arg(long)]
        long: bool,
        /// Show bunch weight derived from tonase and tbs instead
        #[arg(long)]
        bjr: bool,
    },
    /// Menu-driven session
    Interactive,
}

#[derive(Clone, Copy, ValueEnum)]
enum SheetArg {
    Dashboard,
    Production,
    Budget,
    Mentah,
    Mengkal,
}

struct App {
    workbook_path: PathBuf,
    blocks_path: Option<PathBuf>,
    primary: WorkbookCache<PrimaryWorkbook>,
    blocks: WorkbookCache<BlockWorkbook>,
    tracker: StalenessTracker,
}

impl App {
    fn new(workbook_path: PathBuf, blocks_path: Option<PathBuf>) -> Self {
        App {
            workbook_path,
            blocks_path,
            primary: WorkbookCache::new(),
            blocks: WorkbookCache::new(),
            tracker: StalenessTracker::new(),
        }
    }

    /// Poll the source once and return the (possibly reloaded) workbook.
    fn primary(&mut self, freshness: Freshness) -> Arc<LoadOutcome<PrimaryWorkbook>> {
        if self.tracker.poll(&self.workbook_path) {
            info!(path = %self.workbook_path.display(), "source workbook changed");
        }
        self.primary
            .get_or_load(&self.workbook_path, freshness, |p| load_primary(p))
    }

    fn block_workbook(&mut self) -> Result<Arc<LoadOutcome<BlockWorkbook>>> {
        let Some(path) = self.blocks_path.as_deref() else {
            bail!("no block workbook configured (use --blocks or SAWIT_BLOCKS)");
        };
        Ok(self
            .blocks
            .get_or_load(path, Freshness::Revalidate, |p| load_blocks(p)))
    }
}

/// Unwrap a load outcome or tell the user there is nothing to show.
fn loaded<T>(outcome: &LoadOutcome<T>) -> Option<&T> {
    match outcome {
        LoadOutcome::Loaded(v) => Some(v),
        LoadOutcome::NoData { reason } => {
            println!("No data available: {}\n", reason);
            None
        }
    }
}

fn resolve_range(workbook: &PrimaryWorkbook, range: RangeArgs) -> Option<(NaiveDate, NaiveDate)> {
    let start = range.start.or_else(|| workbook.dashboard.first_date())?;
    let end = range.end.or_else(|| workbook.dashboard.last_date())?;
    Some((start, end))
}

fn sheet_dataset(workbook: &PrimaryWorkbook, sheet: SheetArg) -> &Dataset {
    match sheet {
        SheetArg::Dashboard => &workbook.dashboard,
        SheetArg::Production => &workbook.production,
        SheetArg::Budget => &workbook.budget,
        SheetArg::Mentah => &workbook.grading_mentah,
        SheetArg::Mengkal => &workbook.grading_mengkal,
    }
}

fn print_summary(workbook: &PrimaryWorkbook, start: NaiveDate, end: NaiveDate) -> DashboardKpis {
    let kpis = DashboardKpis::compute(workbook, start, end);
    println!("Ringkasan Produksi ({} – {})\n", start, end);
    println!("{}\n", render_rows(&kpis.cards()));
    for d in &workbook.diagnostics {
        println!("Note: {}", d);
    }
    kpis
}

/// One sheet over the range, with its summary row where it has one.
fn table_dataset(workbook: &PrimaryWorkbook, sheet: SheetArg, start: NaiveDate, end: NaiveDate) -> Dataset {
    let filtered = filter_by_date(sheet_dataset(workbook, sheet), start, end);
    match sheet {
        SheetArg::Production => production_with_total(&filtered),
        SheetArg::Mentah | SheetArg::Mengkal => grading_with_total(&filtered),
        SheetArg::Dashboard | SheetArg::Budget => filtered,
    }
}

fn print_table(workbook: &PrimaryWorkbook, sheet: SheetArg, start: NaiveDate, end: NaiveDate, rows: usize) {
    let with_total = table_dataset(workbook, sheet, start, end);
    println!("{}\n", with_total.name);
    // Keep the summary row visible when the table is cut.
    let shown = if with_total.len() > rows {
        tail(&with_total, rows)
    } else {
        with_total
    };
    println!("{}\n", render_dataset(&shown, rows));
}

fn print_distribution(workbook: &PrimaryWorkbook, start: NaiveDate, end: NaiveDate) {
    let filtered = filter_by_date(&workbook.production, start, end);
    let totals = afdeling_totals(&filtered);
    println!("Total Produksi per Afdeling\n");
    println!("{}\n", render_rows(&totals));
}

fn print_log(workbook: &PrimaryWorkbook, start: NaiveDate, end: NaiveDate, rows: usize) {
    let filtered = filter_by_date(&workbook.dashboard, start, end);
    let log = tail(&select_columns(&filtered, &["Aktual Produksi", "AKP", "Restan"]), rows);
    println!("Log Produksi Terakhir\n");
    println!("{}\n", render_dataset(&log, rows));
}

fn export_dashboard(workbook: &PrimaryWorkbook, out: &Path) -> Result<()> {
    if out == Path::new("-") {
        let bytes = csv_bytes(&workbook.dashboard_raw)?;
        io::stdout().write_all(&bytes)?;
    } else {
        write_csv_file(out, &workbook.dashboard_raw)
            .with_context(|| format!("failed to write {}", out.display()))?;
        println!(
            "Exported {} rows to {}",
            format_int(workbook.dashboard_raw.rows.len()),
            out.display()
        );
    }
    Ok(())
}

fn run_blocks(app: &mut App, sheet: &str, long: bool, bjr: bool) -> Result<()> {
    let outcome = app.block_workbook()?;
    let Some(workbook) = loaded(&outcome) else {
        return Ok(());
    };
    let derived;
    let series = if bjr {
        match (workbook.get("tonase"), workbook.get("tbs")) {
            (Some(tonase), Some(tbs)) => {
                derived = derive_bjr(tonase, tbs);
                &derived
            }
            _ => bail!("block workbook lacks tonase or tbs"),
        }
    } else {
        workbook
            .get(sheet)
            .with_context(|| format!("block workbook has no sheet {sheet}"))?
    };
    if long {
        write_csv_rows(io::stdout(), &series.to_long())?;
    } else {
        println!("{}\n", render_dataset(&series.dataset, usize::MAX));
    }
    Ok(())
}

/// Read one trimmed line after printing `prompt`; `None` once stdin is closed.
fn prompt_line(prompt: &str) -> Option<String> {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match io::stdin().read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

fn prompt_date(prompt: &str, current: NaiveDate) -> Option<NaiveDate> {
    loop {
        let input = prompt_line(&format!("{} [{}]: ", prompt, current))?;
        if input.is_empty() {
            return Some(current);
        }
        match NaiveDate::parse_from_str(&input, "%Y-%m-%d") {
            Ok(d) => return Some(d),
            Err(_) => println!("Invalid date. Please use YYYY-MM-DD."),
        }
    }
}

fn interactive(app: &mut App) -> Result<()> {
    let mut range: Option<(NaiveDate, NaiveDate)> = None;
    loop {
        println!("Select report:");
        println!("[1] Ringkasan KPI");
        println!("[2] Distribusi Afdeling");
        println!("[3] Grading Mentah");
        println!("[4] Grading Mengkal");
        println!("[5] Log Produksi");
        println!("[6] Set date range");
        println!("[7] Download data (CSV)");
        println!("[8] Reload workbook");
        println!("[0] Exit\n");
        let Some(choice) = prompt_line("Enter choice: ") else {
            break;
        };
        if choice == "0" {
            println!("Exiting the program.");
            break;
        }

        let freshness = if choice == "8" {
            Freshness::Reload
        } else {
            Freshness::Revalidate
        };
        let outcome = app.primary(freshness);
        let Some(workbook) = loaded(&outcome) else {
            continue;
        };
        let Some((default_start, default_end)) = resolve_range(workbook, RangeArgs::default()) else {
            println!("The Dashboard sheet has no rows.\n");
            continue;
        };
        let (start, end) = *range.get_or_insert((default_start, default_end));

        match choice.as_str() {
            "1" => {
                print_summary(workbook, start, end);
            }
            "2" => print_distribution(workbook, start, end),
            "3" => print_table(workbook, SheetArg::Mentah, start, end, usize::MAX),
            "4" => print_table(workbook, SheetArg::Mengkal, start, end, usize::MAX),
            "5" => print_log(workbook, start, end, 10),
            "6" => {
                let Some(s) = prompt_date("Mulai", start) else { break };
                let Some(e) = prompt_date("Selesai", end) else { break };
                range = Some((s, e));
                println!("Range set to {} – {}\n", s, e);
            }
            "7" => {
                if let Err(e) = export_dashboard(workbook, Path::new(EXPORT_FILE_NAME)) {
                    eprintln!("Write error: {:#}", e);
                }
            }
            "8" => println!(
                "Reloaded {} (modified {:?})\n",
                app.workbook_path.display(),
                app.primary.loaded_mtime(&app.workbook_path)
            ),
            _ => println!("Invalid choice. Please enter 0-8.\n"),
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sawit_report=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let mut app = App::new(cli.workbook, cli.blocks);

    match cli.command.unwrap_or(Commands::Interactive) {
        Commands::Summary { range, json } => {
            let outcome = app.primary(Freshness::Revalidate);
            let Some(workbook) = loaded(&outcome) else {
                return Ok(());
            };
            let Some((start, end)) = resolve_range(workbook, range) else {
                println!("The Dashboard sheet has no rows.");
                return Ok(());
            };
            let kpis = print_summary(workbook, start, end);
            if let Some(path) = json {
                write_json(&path, &kpis).with_context(|| format!("failed to write {}", path.display()))?;
                println!("KPIs written to {}", path.display());
            }
        }
        Commands::Table { sheet, range, rows, csv } => {
            let outcome = app.primary(Freshness::Revalidate);
            if let Some(workbook) = loaded(&outcome) {
                if let Some((start, end)) = resolve_range(workbook, range) {
                    if csv {
                        write_csv(io::stdout(), &table_dataset(workbook, sheet, start, end))?;
                    } else {
                        print_table(workbook, sheet, start, end, rows);
                    }
                }
            }
        }
        Commands::Distribution { range } => {
            let outcome = app.primary(Freshness::Revalidate);
            if let Some(workbook) = loaded(&outcome) {
                if let Some((start, end)) = resolve_range(workbook, range) {
                    print_distribution(workbook, start, end);
                }
            }
        }
        Commands::Log { range, rows } => {
            let outcome = app.primary(Freshness::Revalidate);
            if let Some(workbook) = loaded(&outcome) {
                if let Some((start, end)) = resolve_range(workbook, range) {
                    print_log(workbook, start, end, rows);
                }
            }
        }
        Commands::Export { out } => {
            let outcome = app.primary(Freshness::Revalidate);
            if let Some(workbook) = loaded(&outcome) {
                export_dashboard(workbook, &out)?;
            }
        }
        Commands::Blocks { sheet, long, bjr } => run_blocks(&mut app, &sheet, long, bjr)?,
        Commands::Interactive => interactive(&mut app)?,
    }

    Ok(())
}
