use crate::infra::ConfiguredSource;
use chrono::{Local, NaiveDate};
use clap::{Args, ValueEnum};
use sdr_funnel::config::AppConfig;
use sdr_funnel::error::AppError;
use sdr_funnel::telemetry;
use sdr_funnel::workflows::funnel::{rollup, FunnelReporter, Report};
use sdr_funnel::workflows::publish::{render_dashboard, write_rep_csv, ReportStore};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Print the report JSON
    #[default]
    Json,
    /// Write the HTML dashboard next to the stored report
    Html,
    /// Print one CSV row per SDR plus totals
    Csv,
}

#[derive(Args, Debug)]
pub(crate) struct DailyArgs {
    /// Report day (YYYY-MM-DD). Defaults to REPORT_DATE, then yesterday.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) date: Option<NaiveDate>,
    /// Output written after the report is stored
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub(crate) format: OutputFormat,
    /// Read deals from a saved HubSpot export instead of the API
    #[arg(long)]
    pub(crate) deals_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct BackfillArgs {
    /// First day of the range (YYYY-MM-DD)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) from: NaiveDate,
    /// Last day of the range, inclusive (YYYY-MM-DD)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) to: NaiveDate,
    /// Read deals from a saved HubSpot export instead of the API
    #[arg(long)]
    pub(crate) deals_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct RollupArgs {
    /// First day of the range (YYYY-MM-DD)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) from: NaiveDate,
    /// Last day of the range, inclusive (YYYY-MM-DD)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) to: NaiveDate,
}

fn load_config() -> Result<AppConfig, AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    Ok(config)
}

pub(crate) async fn run_daily(args: DailyArgs) -> Result<(), AppError> {
    let DailyArgs {
        date,
        format,
        deals_file,
    } = args;

    let config = load_config()?;
    let now = Local::now().naive_local();
    let day = date.unwrap_or_else(|| config.reports.report_date_or_yesterday(now.date()));

    let source = ConfiguredSource::from_config(&config, deals_file)?;
    let reporter = FunnelReporter::new(source, config.pipeline.excluded_reps.clone());
    let report = reporter.daily(day, now).await?;

    let store = ReportStore::new(&config.reports.data_dir);
    let path = store.save(&report)?;
    info!(
        %day,
        deals = report.summary.total,
        reps = report.active_reps,
        path = %path.display(),
        "daily report stored"
    );

    emit(&report, format, &store)
}

pub(crate) async fn run_backfill(args: BackfillArgs) -> Result<(), AppError> {
    let BackfillArgs {
        from,
        to,
        deals_file,
    } = args;
    if from > to {
        return Err(AppError::InvalidRequest(format!(
            "--from {from} is after --to {to}"
        )));
    }

    let config = load_config()?;
    let now = Local::now().naive_local();
    let source = ConfiguredSource::from_config(&config, deals_file)?;
    let reporter = FunnelReporter::new(source, config.pipeline.excluded_reps.clone());
    let reports = reporter.backfill(from, to, now).await?;

    let store = ReportStore::new(&config.reports.data_dir);
    for report in &reports {
        store.save(report)?;
        let conversions = report.headline_conversions();
        println!(
            "{}: {} deals | {} SDRs | Lead->MQL {} | MQL->SQL {} | Lead->SQL {}",
            report.date,
            report.summary.total,
            report.active_reps,
            conversions.lead_mql,
            conversions.mql_sql,
            conversions.lead_sql
        );
    }

    println!(
        "Backfilled {} days into {}",
        reports.len(),
        store.root().display()
    );
    Ok(())
}

pub(crate) fn run_rollup(args: RollupArgs) -> Result<(), AppError> {
    let RollupArgs { from, to } = args;
    if from > to {
        return Err(AppError::InvalidRequest(format!(
            "--from {from} is after --to {to}"
        )));
    }

    let config = load_config()?;
    let store = ReportStore::new(&config.reports.data_dir);
    let reports = store.load_range(from, to)?;
    let merged = rollup(&reports)
        .ok_or_else(|| AppError::NotFound(format!("stored reports between {from} and {to}")))?;

    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &merged).map_err(io::Error::from)?;
    writeln!(stdout)?;
    Ok(())
}

fn emit(report: &Report, format: OutputFormat, store: &ReportStore) -> Result<(), AppError> {
    let mut stdout = io::stdout().lock();
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut stdout, report).map_err(io::Error::from)?;
            writeln!(stdout)?;
        }
        OutputFormat::Html => {
            let path = store.save_dashboard(report.date, &render_dashboard(report)?)?;
            writeln!(stdout, "Dashboard written to {}", path.display())?;
        }
        OutputFormat::Csv => write_rep_csv(report, &mut stdout)?,
    }
    Ok(())
}
