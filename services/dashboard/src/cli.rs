use crate::commands::{run_backfill, run_daily, run_rollup, BackfillArgs, DailyArgs, RollupArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use sdr_funnel::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "sdr-dashboard",
    about = "Build and serve the daily SDR pipeline funnel dashboard",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Build and store the report for one day
    Daily(DailyArgs),
    /// Rebuild snapshot reports for every active day in a range
    Backfill(BackfillArgs),
    /// Merge stored reports over a date range
    Rollup(RollupArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Daily(args) => run_daily(args).await,
        Command::Backfill(args) => run_backfill(args).await,
        Command::Rollup(args) => run_rollup(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::OutputFormat;
    use chrono::NaiveDate;

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["sdr-dashboard"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn daily_accepts_date_format_and_export() {
        let cli = Cli::try_parse_from([
            "sdr-dashboard",
            "daily",
            "--date",
            "2026-02-02",
            "--format",
            "csv",
            "--deals-file",
            "export.json",
        ])
        .expect("parses");

        match cli.command {
            Some(Command::Daily(args)) => {
                assert_eq!(args.date, NaiveDate::from_ymd_opt(2026, 2, 2));
                assert_eq!(args.format, OutputFormat::Csv);
                assert_eq!(
                    args.deals_file.as_deref(),
                    Some(std::path::Path::new("export.json"))
                );
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn backfill_requires_range() {
        assert!(Cli::try_parse_from(["sdr-dashboard", "backfill", "--from", "2026-02-01"]).is_err());
        assert!(Cli::try_parse_from([
            "sdr-dashboard",
            "backfill",
            "--from",
            "2026-02-01",
            "--to",
            "2026-02-28"
        ])
        .is_ok());
    }

    #[test]
    fn malformed_dates_are_rejected() {
        assert!(Cli::try_parse_from(["sdr-dashboard", "daily", "--date", "yesterday"]).is_err());
    }
}
