use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use dotenv::dotenv;
use log::info;

use report_ledger::{
    load_manifest, DayIdentifier, LedgerConfig, LedgerError, ProcessingOutcome, ReportImage,
    ReportProcessor, ReportRequest, ReportType, TrailingMinus,
};

#[derive(Parser)]
#[command(name = "report-ledger")]
#[command(about = "Read a photographed report and record its figures in the daily ledger")]
#[command(version)]
struct Cli {
    /// Report type: batch, day1, day2, day3, handwritten, lotto, handwritten_lotto_end, shift
    #[arg(short, long, required_unless_present = "manifest")]
    report: Option<String>,

    /// Day of the month (1-31) selecting the ledger sheet
    #[arg(short, long)]
    day: String,

    /// Report photograph; repeat for multi-page reports
    #[arg(short, long = "image", required_unless_present = "manifest")]
    images: Vec<PathBuf>,

    /// JSON list of {"report", "images"} entries processed in order for the day
    #[arg(short, long, conflicts_with_all = ["report", "images"])]
    manifest: Option<PathBuf>,

    /// Ledger workbook (overrides LEDGER_WORKBOOK)
    #[arg(short, long)]
    workbook: Option<PathBuf>,

    /// Extract and print values without touching the workbook
    #[arg(long)]
    dry_run: bool,

    /// Read `122.00-` as -122.00 instead of 122.00
    #[arg(long)]
    negate_trailing_minus: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let manifest_mode = cli.manifest.is_some();
    let outcomes = run(cli).await;

    if manifest_mode {
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
    } else {
        for outcome in &outcomes {
            println!("{}", serde_json::to_string_pretty(outcome)?);
        }
    }

    if outcomes.iter().any(|o| !o.is_success()) {
        std::process::exit(1);
    }
    Ok(())
}

/// Every failure, including argument and configuration errors, comes back
/// as an outcome so the output stays machine-readable.
async fn run(cli: Cli) -> Vec<ProcessingOutcome> {
    let report = cli.report.as_deref().map(str::parse::<ReportType>);
    let known_report = report.as_ref().and_then(|r| r.as_ref().ok()).copied();

    let day: DayIdentifier = match cli.day.parse() {
        Ok(day) => day,
        Err(e) => return vec![ProcessingOutcome::rejected(known_report, None, e)],
    };

    let mut config = match LedgerConfig::from_env() {
        Ok(config) => config,
        Err(e) => return vec![ProcessingOutcome::rejected(known_report, Some(day), e)],
    };
    if let Some(workbook) = cli.workbook {
        config = config.with_workbook(workbook);
    }
    if cli.negate_trailing_minus {
        config = config.with_trailing_minus(TrailingMinus::Negate);
    }

    let processor = match ReportProcessor::from_config(&config) {
        Ok(processor) => processor,
        Err(e) => return vec![ProcessingOutcome::rejected(known_report, Some(day), e)],
    };

    if let Some(manifest) = cli.manifest {
        let entries = match load_manifest(&manifest).await {
            Ok(entries) => entries,
            Err(e) => return vec![ProcessingOutcome::rejected(None, Some(day), e)],
        };
        info!(
            "Processing {} report(s) from {} for day {} into {}",
            entries.len(),
            manifest.display(),
            day,
            config.workbook_path.display()
        );

        let mut outcomes = Vec::with_capacity(entries.len());
        for entry in entries {
            let report = entry.report;
            let outcome = match entry.into_request(day, cli.dry_run).await {
                Ok(request) => processor.process(request).await,
                Err(e) => ProcessingOutcome::rejected(Some(report), Some(day), e),
            };
            outcomes.push(outcome);
        }
        return outcomes;
    }

    let report = match report {
        Some(Ok(report)) => report,
        Some(Err(e)) => return vec![ProcessingOutcome::rejected(None, Some(day), e)],
        None => {
            let e = LedgerError::InputValidation("--report is required".to_string());
            return vec![ProcessingOutcome::rejected(None, Some(day), e)];
        }
    };

    let mut images = Vec::with_capacity(cli.images.len());
    for path in &cli.images {
        match ReportImage::from_path(path).await {
            Ok(image) => images.push(image),
            Err(e) => return vec![ProcessingOutcome::rejected(Some(report), Some(day), e)],
        }
    }

    info!(
        "Processing {} report for day {} into {}",
        report,
        day,
        config.workbook_path.display()
    );

    let request = ReportRequest {
        report,
        day,
        images,
        dry_run: cli.dry_run,
    };
    vec![processor.process(request).await]
}
