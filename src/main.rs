// Entry point and command-line flow.
//
// Each subcommand reads the export once, builds one report view, writes it
// to the output directory (JSON for the full structure, CSV for flat rows)
// and prints a short markdown preview.
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use conversion_report::analysis::{filter_alert_report, offer_performance, summarize};
use conversion_report::anomaly::{active_day_average, alert_flags, code_highlights};
use conversion_report::output::{preview_table, write_csv, write_json};
use conversion_report::types::{
    AnalysisFilter, AvgLevel, CodeTotalRow, OfferReport, PerformanceRow, TargetMonth,
};
use conversion_report::util::{format_int, format_number};
use conversion_report::{build_analysis_data, build_drop_alerts, build_offer_report, max_past_day};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "conversion_report", about = "Monthly affiliate conversion reports")]
struct Cli {
    /// Conversion export to read.
    #[arg(long, env = "REPORT_CSV_PATH")]
    csv: PathBuf,

    /// Directory for CSV/JSON exports.
    #[arg(long, env = "REPORT_OUT_DIR", default_value = ".")]
    out_dir: PathBuf,

    /// Treat this date (YYYY-MM-DD) as today when deciding which days are complete.
    #[arg(long)]
    today: Option<NaiveDate>,

    /// Rows shown in console previews.
    #[arg(long, default_value_t = 5)]
    preview: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Offer → code daily matrices with per-code highlights.
    Offers,
    /// Day-over-day drop alerts per offer, affiliate and code.
    Drops {
        /// Evaluate up to this day instead of the resolved last complete day.
        #[arg(long)]
        max_past_day: Option<u32>,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// KPI totals and daily breakdown over a filtered slice.
    Analysis {
        #[command(flatten)]
        filter: FilterArgs,
        /// Restrict to rows with this geo (repeatable).
        #[arg(long = "geo")]
        geos: Vec<String>,
    },
    /// Offer-level daily orders rated against each offer's average.
    Performance,
    /// Every report above, unfiltered.
    All,
}

#[derive(Debug, Args)]
struct FilterArgs {
    /// Restrict to this offer (repeatable).
    #[arg(long = "offer")]
    offers: Vec<String>,
    /// Restrict to this affiliate (repeatable).
    #[arg(long = "affiliate")]
    affiliates: Vec<String>,
    /// Restrict to this code (repeatable).
    #[arg(long = "code")]
    codes: Vec<String>,
    /// First day of the month to include.
    #[arg(long)]
    from: Option<u32>,
    /// Last day of the month to include.
    #[arg(long)]
    to: Option<u32>,
}

impl FilterArgs {
    fn to_filter(&self, geos: &[String]) -> AnalysisFilter {
        // No flag for a dimension means no restriction on it.
        let pick = |values: &[String]| (!values.is_empty()).then(|| values.to_vec());
        AnalysisFilter {
            offers: pick(&self.offers),
            affiliates: pick(&self.affiliates),
            codes: pick(&self.codes),
            geos: pick(geos),
            day_from: self.from,
            day_to: self.to,
        }
    }
}

struct Context<'a> {
    csv_text: &'a str,
    out_dir: &'a Path,
    today: NaiveDate,
    preview: usize,
}

fn run_offers(ctx: &Context) -> Result<(), Box<dyn Error>> {
    let report = build_offer_report(ctx.csv_text);
    let cutoff = max_past_day(report.month.as_ref(), report.days_in_month, ctx.today);
    info!(offers = report.offers.len(), max_past_day = cutoff, "offer report built");

    write_json(&ctx.out_dir.join("offer_report.json"), &report)?;
    let rows = code_total_rows(&report, cutoff);
    write_csv(&ctx.out_dir.join("offer_codes.csv"), &rows)?;

    let highlights: Vec<_> = report
        .offers
        .iter()
        .flat_map(|offer| {
            offer
                .codes
                .iter()
                .map(move |code| (offer.offer.clone(), code_highlights(code, cutoff)))
        })
        .collect();
    write_json(&ctx.out_dir.join("code_highlights.json"), &highlights)?;

    preview_table(
        "Code performance by day",
        Some(month_note(report.month.as_ref())),
        &rows,
        ctx.preview,
    );
    Ok(())
}

fn code_total_rows(report: &OfferReport, cutoff: u32) -> Vec<CodeTotalRow> {
    report
        .offers
        .iter()
        .flat_map(|offer| {
            offer.codes.iter().map(move |code| {
                let flags = alert_flags(&code.counts, cutoff);
                let flagged: Vec<String> = (0..code.counts.len())
                    .filter(|&i| flags.drops[i] || flags.zero_runs[i])
                    .map(|i| (i + 1).to_string())
                    .collect();
                CodeTotalRow {
                    offer: offer.offer.clone(),
                    code: code.code.clone(),
                    total: format_int(code.total),
                    avg: format_number(active_day_average(&code.counts), 1),
                    flagged_days: flagged.join(" "),
                }
            })
        })
        .collect()
}

fn run_drops(
    ctx: &Context,
    override_day: Option<u32>,
    filter: &AnalysisFilter,
) -> Result<(), Box<dyn Error>> {
    // The cutoff needs the target month, so resolve it from a first pass
    // unless the caller fixed it explicitly.
    let cutoff = match override_day {
        Some(day) => day,
        None => {
            let first_pass = build_drop_alerts(ctx.csv_text, Some(0));
            max_past_day(first_pass.month.as_ref(), first_pass.days_in_month, ctx.today)
        }
    };
    let unfiltered = build_drop_alerts(ctx.csv_text, Some(cutoff));
    let report = filter_alert_report(&unfiltered, filter);
    info!(
        alerts = report.alerts.len(),
        unfiltered = unfiltered.alerts.len(),
        max_past_day = cutoff,
        "drop alerts built"
    );

    write_json(&ctx.out_dir.join("drop_alerts.json"), &report)?;
    write_csv(&ctx.out_dir.join("drop_alerts.csv"), &report.alerts)?;
    preview_table(
        "50%+ drops from the previous day",
        Some(month_note(report.month.as_ref())),
        &report.alerts,
        ctx.preview,
    );
    Ok(())
}

fn run_analysis(ctx: &Context, filter: &AnalysisFilter) -> Result<(), Box<dyn Error>> {
    let data = build_analysis_data(ctx.csv_text);
    let summary = summarize(&data, filter);
    info!(rows = data.rows.len(), orders = summary.total_orders, "analysis built");

    write_json(&ctx.out_dir.join("analysis_data.json"), &data)?;
    write_json(&ctx.out_dir.join("analysis_summary.json"), &summary)?;
    write_csv(&ctx.out_dir.join("analysis_daily.csv"), &summary.daily)?;

    println!("Offer performance analysis ({})", month_note(data.month.as_ref()));
    println!(
        "Orders: {}  Revenue: {}  Payout: {}  Sale amount: {}  AOV: {}\n",
        format_int(summary.total_orders),
        format_number(summary.total_revenue, 2),
        format_number(summary.total_payout, 2),
        format_number(summary.total_sale_amount, 2),
        format_number(summary.avg_order_value, 2)
    );
    preview_table("Last update per offer", None, &data.last_updates, ctx.preview);
    Ok(())
}

fn run_performance(ctx: &Context) -> Result<(), Box<dyn Error>> {
    let data = build_analysis_data(ctx.csv_text);
    let cutoff = max_past_day(data.month.as_ref(), data.days_in_month, ctx.today);
    let offers = offer_performance(&data, cutoff);

    let rows: Vec<PerformanceRow> = offers
        .iter()
        .map(|o| PerformanceRow {
            offer: o.offer.clone(),
            total: format_int(o.total),
            avg: format_number(o.average, 1),
            low_days: days_with(&o.levels, &[AvgLevel::VeryLow, AvgLevel::Low]),
            high_days: days_with(&o.levels, &[AvgLevel::High]),
        })
        .collect();

    write_json(&ctx.out_dir.join("offer_performance.json"), &offers)?;
    write_csv(&ctx.out_dir.join("offer_performance.csv"), &rows)?;
    preview_table(
        "Offer performance summary",
        Some(month_note(data.month.as_ref())),
        &rows,
        ctx.preview,
    );
    Ok(())
}

fn month_note(month: Option<&TargetMonth>) -> &str {
    month.map_or("no dated rows", |m| m.label.as_str())
}

fn days_with(levels: &[Option<AvgLevel>], wanted: &[AvgLevel]) -> String {
    levels
        .iter()
        .enumerate()
        .filter(|(_, level)| matches!(level, Some(l) if wanted.contains(l)))
        .map(|(idx, _)| (idx + 1).to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let csv_text = std::fs::read_to_string(&cli.csv)?;
    std::fs::create_dir_all(&cli.out_dir)?;
    let today = cli.today.unwrap_or_else(|| Local::now().date_naive());
    info!(csv = %cli.csv.display(), %today, "loaded export");

    let ctx = Context {
        csv_text: &csv_text,
        out_dir: &cli.out_dir,
        today,
        preview: cli.preview,
    };

    match cli.command {
        Command::Offers => run_offers(&ctx),
        Command::Drops {
            max_past_day: cutoff,
            filter,
        } => run_drops(&ctx, cutoff, &filter.to_filter(&[])),
        Command::Analysis { filter, geos } => run_analysis(&ctx, &filter.to_filter(&geos)),
        Command::Performance => run_performance(&ctx),
        Command::All => {
            let everything = AnalysisFilter::default();
            run_offers(&ctx)?;
            run_drops(&ctx, None, &everything)?;
            run_analysis(&ctx, &everything)?;
            run_performance(&ctx)
        }
    }
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
