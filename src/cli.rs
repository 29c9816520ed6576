//! CLI parsing and orchestration. Parses args, merges config, walks each subreddit's
//! listing over the date window, and writes one file per subreddit. Maps errors to exit codes.

use crate::config::{self, Config, ConfigError};
use crate::export::{output_path, write_records, OutputFormat};
use crate::listing::{
    walk_window, Fetcher, HttpTransport, ListingError, ListingTarget, RetryPolicy, Transport,
    WalkOptions, DEFAULT_BASE_URL, MAX_PAGE_LIMIT,
};
use crate::model::{parse_date, DateWindow, DATE_FORMAT};
use chrono::{Months, NaiveDate, Utc};
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_OUTPUT_DIR: &str = "Datasets";
const DEFAULT_TIMEOUT_SECS: u64 = 8;
const DEFAULT_DELAY_MS: u64 = 1000;
/// Default window length when --start is not given.
const DEFAULT_WINDOW_MONTHS: u32 = 3;

/// CLI error carrying exit code and message.
#[derive(Debug, Error)]
pub enum CliRunError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Listing(#[from] ListingError),

    #[error("Collection incomplete for: {}. Partial results were written.", .failed.join(", "))]
    FetchFailed { failed: Vec<String> },

    /// At least one result file could not be written. `fetch_failed` lists the
    /// subreddits whose collection was also incomplete.
    #[error(
        "Could not write results for: {}.{}",
        .export_failed.join(", "),
        incomplete_note(.fetch_failed)
    )]
    ExportFailed {
        export_failed: Vec<String>,
        fetch_failed: Vec<String>,
    },
}

fn incomplete_note(fetch_failed: &[String]) -> String {
    if fetch_failed.is_empty() {
        String::new()
    } else {
        format!(" Collection also incomplete for: {}.", fetch_failed.join(", "))
    }
}

impl CliRunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliRunError::InvalidInput(_) | CliRunError::Config(_) | CliRunError::Listing(_) => 1,
            CliRunError::FetchFailed { .. } => 2,
            CliRunError::ExportFailed { .. } => 3,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "subscrape")]
#[command(about = "Collect post metrics from subreddit listings within a date window")]
#[command(
    after_help = "Config file keys (output_dir, base_url, user_agent, timeout_secs, request_delay_ms, retry_count, backoff_base_ms, backoff_max_ms, backoff_multiplier, jitter_factor, max_pages, page_limit, format) are read from ./subscrape.toml or the user config dir. CLI flags override config. RUST_LOG overrides -q/-v."
)]
pub struct Args {
    /// Subreddit names (e.g. emacs or r/emacs). Each is collected in turn.
    #[arg(required = true)]
    pub subreddits: Vec<String>,

    /// First day of the window, YYYY-MM-DD. Default: three months before --end.
    #[arg(long, value_parser = parse_date_arg)]
    pub start: Option<NaiveDate>,

    /// Last day of the window, YYYY-MM-DD. Default: today (UTC).
    #[arg(long, value_parser = parse_date_arg)]
    pub end: Option<NaiveDate>,

    /// Output directory (created if missing). Default: ./Datasets.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Output format: csv or json.
    #[arg(long, value_parser = parse_format)]
    pub format: Option<OutputFormat>,

    /// Stop each walk after this many pages.
    #[arg(long)]
    pub max_pages: Option<u32>,

    /// HTTP User-Agent (overrides config).
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Per-request timeout in seconds (overrides config; default 8).
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Attempts per page before giving up (overrides config; default 5).
    #[arg(long)]
    pub retries: Option<u32>,

    /// Listing API host (overrides config; default https://www.reddit.com).
    #[arg(long)]
    pub base_url: Option<String>,

    /// Print the window, first request URL and output path per subreddit without fetching.
    #[arg(long)]
    pub dry_run: bool,

    /// Errors only; no progress spinner.
    #[arg(short, long)]
    pub quiet: bool,

    /// More log output (-v info, -vv debug) and the full error chain on failure.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub log_json: bool,
}

fn parse_date_arg(s: &str) -> Result<NaiveDate, String> {
    parse_date(s).map_err(|e| {
        format!(
            "Invalid date '{}': expected YYYY-MM-DD ({})",
            s.trim(),
            e
        )
    })
}

fn parse_format(s: &str) -> Result<OutputFormat, String> {
    match s.trim().to_lowercase().as_str() {
        "csv" => Ok(OutputFormat::Csv),
        "json" => Ok(OutputFormat::Json),
        _ => Err(format!("Invalid format '{}'. Use csv or json.", s)),
    }
}

/// Fill in missing bounds (end = today, start = end minus three months) and check order.
fn resolve_window(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<DateWindow, CliRunError> {
    let end = end.unwrap_or(today);
    let start = match start {
        Some(s) => s,
        None => end
            .checked_sub_months(Months::new(DEFAULT_WINDOW_MONTHS))
            .ok_or_else(|| {
                CliRunError::InvalidInput(format!(
                    "Cannot compute default start date from end {}",
                    end.format(DATE_FORMAT)
                ))
            })?,
    };
    DateWindow::new(start, end).map_err(|e| CliRunError::InvalidInput(e.to_string()))
}

/// Effective settings after merging CLI flags, config file, and defaults.
#[derive(Debug, Clone, PartialEq)]
struct Settings {
    output_dir: PathBuf,
    format: OutputFormat,
    base_url: String,
    user_agent: Option<String>,
    timeout_secs: u64,
    request_delay_ms: u64,
    page_limit: u32,
    max_pages: Option<u32>,
    retry: RetryPolicy,
}

impl Settings {
    fn resolve(args: &Args, config: Option<&Config>) -> Result<Self, CliRunError> {
        let format = match (args.format, config.and_then(|c| c.format.as_deref())) {
            (Some(f), _) => f,
            (None, Some(s)) => parse_format(s).map_err(CliRunError::InvalidInput)?,
            (None, None) => OutputFormat::Csv,
        };
        let defaults = RetryPolicy::default();
        let retry = RetryPolicy {
            max_attempts: args
                .retries
                .or_else(|| config.and_then(|c| c.retry_count))
                .unwrap_or(defaults.max_attempts)
                .max(1),
            base_delay: config
                .and_then(|c| c.backoff_base_ms)
                .map_or(defaults.base_delay, Duration::from_millis),
            multiplier: config
                .and_then(|c| c.backoff_multiplier)
                .unwrap_or(defaults.multiplier),
            max_delay: config
                .and_then(|c| c.backoff_max_ms)
                .map_or(defaults.max_delay, Duration::from_millis),
            jitter_factor: config
                .and_then(|c| c.jitter_factor)
                .unwrap_or(defaults.jitter_factor),
        };
        Ok(Self {
            output_dir: args
                .output_dir
                .clone()
                .or_else(|| config.and_then(|c| c.output_dir.clone()))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            format,
            base_url: args
                .base_url
                .clone()
                .or_else(|| config.and_then(|c| c.base_url.clone()))
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            user_agent: args
                .user_agent
                .clone()
                .or_else(|| config.and_then(|c| c.user_agent.clone())),
            timeout_secs: args
                .timeout
                .or_else(|| config.and_then(|c| c.timeout_secs))
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
            request_delay_ms: config
                .and_then(|c| c.request_delay_ms)
                .unwrap_or(DEFAULT_DELAY_MS),
            page_limit: config
                .and_then(|c| c.page_limit)
                .unwrap_or(MAX_PAGE_LIMIT),
            max_pages: args.max_pages.or_else(|| config.and_then(|c| c.max_pages)),
            retry,
        })
    }
}

/// Install the global tracing subscriber. RUST_LOG wins over the verbosity flags.
pub fn init_logging(args: &Args) -> anyhow::Result<()> {
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("subscrape={}", default_level)));
    let registry = tracing_subscriber::registry().with(filter);
    if args.log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }
    Ok(())
}

fn new_spinner(subreddit: &str) -> indicatif::ProgressBar {
    let bar = indicatif::ProgressBar::new_spinner();
    if let Ok(style) = indicatif::ProgressStyle::default_spinner()
        .template("{spinner} {msg} ({elapsed})")
    {
        bar.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
    }
    bar.set_message(format!("r/{}: starting", subreddit));
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

/// Entry point for the CLI. Returns Ok(()) on success; Err with exit code and message on failure.
pub fn run(args: &Args) -> Result<(), CliRunError> {
    let config = config::load_config()?;
    let settings = Settings::resolve(args, config.as_ref())?;
    let window = resolve_window(args.start, args.end, Utc::now().date_naive())?;

    // Validate every target before any request goes out.
    let targets = args
        .subreddits
        .iter()
        .map(|s| ListingTarget::new(&settings.base_url, s, settings.page_limit))
        .collect::<Result<Vec<_>, _>>()?;

    if args.dry_run {
        eprintln!("Window: {}", window);
        for target in &targets {
            eprintln!("r/{}", target.subreddit());
            eprintln!("  First request: {}", target.page_url(None));
            eprintln!(
                "  Output: {}",
                output_path(&settings.output_dir, target.subreddit(), settings.format).display()
            );
        }
        return Ok(());
    }

    let mut builder = HttpTransport::builder()
        .timeout_secs(settings.timeout_secs)
        .delay_ms(settings.request_delay_ms);
    if let Some(ua) = &settings.user_agent {
        builder = builder.user_agent(ua.clone());
    }
    let transport = builder
        .build()
        .map_err(|e| CliRunError::InvalidInput(format!("Failed to create HTTP client: {}", e)))?;

    let report = Report {
        quiet: args.quiet,
        spinner: !args.quiet && args.verbose == 0 && !args.log_json,
    };
    collect_all(targets, &settings, &window, transport, report)
}

/// How much to tell the user on stderr outside of the log.
#[derive(Debug, Clone, Copy)]
struct Report {
    quiet: bool,
    spinner: bool,
}

/// Walk and export each target in turn over one shared transport. A fetch or
/// write failure for one subreddit never stops the others.
fn collect_all<T: Transport>(
    targets: Vec<ListingTarget>,
    settings: &Settings,
    window: &DateWindow,
    mut transport: T,
    report: Report,
) -> Result<(), CliRunError> {
    let mut fetch_failed: Vec<String> = Vec::new();
    let mut export_failed: Vec<String> = Vec::new();

    for target in targets {
        let subreddit = target.subreddit().to_string();
        info!(subreddit = %subreddit, window = %window, "collecting");

        let spinner = report.spinner.then(|| new_spinner(&subreddit));
        let progress_cb = |pages: u32, records: usize| {
            if let Some(bar) = &spinner {
                bar.set_message(format!(
                    "r/{}: {} page(s), {} post(s) in window",
                    subreddit, pages, records
                ));
            }
        };
        let options = WalkOptions {
            max_pages: settings.max_pages,
            progress: Some(&progress_cb),
        };

        let mut fetcher = Fetcher::new(&mut transport, target, settings.retry.clone());
        let outcome = walk_window(&mut fetcher, window, &options);

        if let Some(bar) = &spinner {
            bar.finish_and_clear();
        }

        if let Some(e) = outcome.failure() {
            error!(subreddit = %subreddit, error = %e, "collection incomplete");
            fetch_failed.push(subreddit.clone());
        }

        let path = output_path(&settings.output_dir, &subreddit, settings.format);
        if let Err(e) = write_records(&outcome.records, &path, settings.format) {
            error!(
                subreddit = %subreddit,
                path = %path.display(),
                records = outcome.records.len(),
                error = %e,
                "results not saved"
            );
            if !report.quiet {
                eprintln!(
                    "r/{}: {}. {} collected record(s) were not saved",
                    subreddit,
                    e,
                    outcome.records.len()
                );
            }
            export_failed.push(subreddit);
            continue;
        }
        info!(
            subreddit = %subreddit,
            path = %path.display(),
            records = outcome.records.len(),
            pages = outcome.pages,
            "results saved"
        );

        if outcome.failure().is_none() && outcome.records.is_empty() {
            warn!(subreddit = %subreddit, window = %window, "no posts in window");
        }
        if report.quiet {
            continue;
        }
        match outcome.failure() {
            Some(e) => eprintln!(
                "r/{}: {}. Saved {} partial record(s) to {}",
                subreddit,
                e,
                outcome.records.len(),
                path.display()
            ),
            None => {
                eprintln!(
                    "r/{}: wrote {} record(s) from {} page(s) to {} ({})",
                    subreddit,
                    outcome.records.len(),
                    outcome.pages,
                    path.display(),
                    outcome.stop
                );
            }
        }
    }

    if !export_failed.is_empty() {
        Err(CliRunError::ExportFailed {
            export_failed,
            fetch_failed,
        })
    } else if !fetch_failed.is_empty() {
        Err(CliRunError::FetchFailed {
            failed: fetch_failed,
        })
    } else {
        Ok(())
    }
}
