use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::error::ErrorKind;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod aggregate;
mod client;
mod collect;
mod config;
mod error;
mod models;
mod range;
mod report;
mod resolve;
#[cfg(test)]
mod testing;

use client::{ClientOptions, ZendeskClient};
use config::{CollectOptions, Credentials};
use range::{DateRange, SliceWidth};
use resolve::{ResolutionRule, DEFAULT_CLOUD_TAG};

#[derive(Parser)]
#[command(name = "solved-report")]
#[command(about = "Per-engineer ticket resolution report from the helpdesk")]
#[command(long_about = None)]
struct Cli {
    /// Start date (oldest), yyyy-MM-dd. Inclusive.
    #[arg(short, long)]
    start: String,
    /// End date (most recent), yyyy-MM-dd. Inclusive.
    #[arg(short, long)]
    end: String,
    /// Verbose tracing plus a per-engineer ticket dump after the totals
    #[arg(short, long)]
    debug: bool,
    /// Search one week at a time by creation date instead of one day at a time by solve date
    #[arg(short, long)]
    weekly: bool,
    /// Tag that marks a ticket as belonging to the cloud product line
    #[arg(long, default_value = DEFAULT_CLOUD_TAG)]
    cloud_tag: String,
    /// Take the last solved event in API order rather than the latest by timestamp
    #[arg(long)]
    scan_order: bool,
    /// Maximum audit-history requests in flight
    #[arg(long, default_value_t = 4)]
    concurrency: usize,
    /// Retries per API request on transient failures
    #[arg(long, default_value_t = 3)]
    #[arg(value_parser = clap::value_parser!(u32).range(0..=10))]
    retries: u32,
    /// Per-request HTTP timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
}

/// Exit code for a rejected command line. Help and version output exit cleanly.
fn cli_exit_code(err: &clap::Error) -> u8 {
    match err.kind() {
        ErrorKind::DisplayHelp
        | ErrorKind::DisplayVersion
        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => 0,
        // --start and --end are the only required arguments.
        ErrorKind::MissingRequiredArgument => error::EXIT_BAD_DATE,
        _ => error::EXIT_FAILURE,
    }
}

fn init_tracing(debug: bool) {
    let fallback = if debug {
        "solved_report=debug"
    } else {
        "solved_report=info"
    };
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| fallback.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let range = DateRange::parse(&cli.start, &cli.end)
        .context("invalid date range")?;
    tracing::debug!(start = %range.start, end = %range.end, "date range");

    let credentials = Credentials::from_env()
        .context("helpdesk credentials are not configured")?;
    let client = ZendeskClient::new(
        &credentials,
        ClientOptions {
            timeout: Duration::from_secs(cli.timeout_secs),
            max_retries: cli.retries,
            ..ClientOptions::default()
        },
    )?;

    let base_url = &credentials.base_url;
    let me = client
        .current_user()
        .await
        .with_context(|| format!("failed to authenticate with {base_url}"))?;
    tracing::info!(user_id = me.id, user = %me.name, "authenticated");

    let options = CollectOptions {
        width: if cli.weekly {
            SliceWidth::Week
        } else {
            SliceWidth::Day
        },
        cloud_tag: cli.cloud_tag,
        rule: if cli.scan_order {
            ResolutionRule::ScanOrder
        } else {
            ResolutionRule::Chronological
        },
        concurrency: cli.concurrency,
    };

    let collection = collect::collect(&client, &range, &options).await?;
    let report = report::build_report(&range, collection.summaries, &collection.stats, cli.debug);
    print!("{report}");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = cli_exit_code(&err);
            if code == 0 {
                err.exit();
            }
            let _ = err.print();
            return ExitCode::from(code);
        }
    };
    init_tracing(cli.debug);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "report failed");
            eprintln!("Error: {err:?}");
            ExitCode::from(error::exit_code_for(&err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn short_flags_parse() {
        let cli = Cli::try_parse_from([
            "solved-report",
            "-s",
            "2024-03-01",
            "-e",
            "2024-03-31",
            "-d",
            "-w",
        ])
        .unwrap();
        assert_eq!(cli.start, "2024-03-01");
        assert_eq!(cli.end, "2024-03-31");
        assert!(cli.debug);
        assert!(cli.weekly);
        assert!(!cli.scan_order);
        assert_eq!(cli.cloud_tag, DEFAULT_CLOUD_TAG);
        assert_eq!(cli.concurrency, 4);
    }

    const DATES: [&str; 5] = ["solved-report", "-s", "2024-01-01", "-e", "2024-01-02"];

    fn with_dates(extra: &[&'static str]) -> Vec<&'static str> {
        DATES.iter().chain(extra).copied().collect()
    }

    fn rejection(args: &[&str]) -> clap::Error {
        match Cli::try_parse_from(args.iter().copied()) {
            Ok(_) => panic!("{args:?} should be rejected"),
            Err(err) => err,
        }
    }

    #[test]
    fn missing_dates_exit_with_bad_date_code() {
        let err = rejection(&["solved-report", "--start", "2024-03-01"]);
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        assert_eq!(cli_exit_code(&err), error::EXIT_BAD_DATE);

        let err = rejection(&["solved-report"]);
        assert_eq!(cli_exit_code(&err), error::EXIT_BAD_DATE);
    }

    #[test]
    fn other_argument_errors_exit_with_failure_code() {
        let err = rejection(&with_dates(&["--bogus"]));
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
        assert_eq!(cli_exit_code(&err), error::EXIT_FAILURE);

        let err = rejection(&with_dates(&["--concurrency", "x"]));
        assert_eq!(cli_exit_code(&err), error::EXIT_FAILURE);
    }

    #[test]
    fn help_exits_cleanly() {
        let err = rejection(&["solved-report", "--help"]);
        assert_eq!(cli_exit_code(&err), 0);
    }

    #[test]
    fn retries_are_capped() {
        let args = with_dates(&["--retries", "10"]);
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.retries, 10);

        let err = rejection(&with_dates(&["--retries", "11"]));
        assert_eq!(cli_exit_code(&err), error::EXIT_FAILURE);
    }

    #[tokio::test]
    async fn bad_dates_exit_before_touching_the_network() {
        let cli = Cli::try_parse_from(["solved-report", "-s", "2024-03-09", "-e", "2024-03-01"])
            .unwrap();
        let err = run(cli).await.unwrap_err();
        assert_eq!(error::exit_code_for(&err), error::EXIT_BAD_DATE);
    }
}
