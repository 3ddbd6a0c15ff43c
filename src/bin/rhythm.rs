//! Rhythm CLI - Command-line interface for Nestling Rhythm
//!
//! Commands:
//! - insight: Compute today's insight from an activity log
//! - trend: Summarize a 7, 30 or 90 day window
//! - validate: Validate activity records
//! - norms: Print the age-indexed norms for an age

use chrono::Utc;
use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use nestling_rhythm::aggregate::TrendWindow;
use nestling_rhythm::config::InsightConfig;
use nestling_rhythm::norms::{band_for, AgeBand, DEFAULT_AGE_MONTHS};
use nestling_rhythm::pipeline::{parse_household, RhythmProcessor};
use nestling_rhythm::schema::{ActivityAdapter, ValidationReport};
use nestling_rhythm::{RhythmError, PRODUCER_NAME, RHYTHM_VERSION};

/// Rhythm - On-device rhythm engine for infant care logs
#[derive(Parser)]
#[command(name = "rhythm")]
#[command(author = "Nestling Labs")]
#[command(version = RHYTHM_VERSION)]
#[command(about = "Turn an infant activity log into daily insights and trends", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute today's insight (deviations, narrative, predictions)
    Insight {
        #[command(flatten)]
        input: InputArgs,

        /// Insight configuration JSON file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Summarize a trailing window of days
    Trend {
        #[command(flatten)]
        input: InputArgs,

        /// Window length in days (7, 30 or 90)
        #[arg(long, default_value = "7", value_parser = parse_window)]
        window: TrendWindow,
    },

    /// Validate activity records
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the age-indexed norms
    Norms {
        /// Age in months (defaults to the age assumed when no birthday is known)
        #[arg(long, default_value_t = DEFAULT_AGE_MONTHS)]
        age_months: f64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Args)]
struct InputArgs {
    /// Activities file, JSON array or NDJSON (use - for stdin)
    #[arg(short, long)]
    activities: PathBuf,

    /// Household context JSON file
    #[arg(long)]
    household: Option<PathBuf>,

    /// Current time (RFC 3339 or household-local ISO); defaults to the wall clock
    #[arg(long)]
    now: Option<String>,

    /// Output file path (use - for stdout)
    #[arg(short, long, default_value = "-")]
    output: PathBuf,
}

fn parse_window(s: &str) -> Result<TrendWindow, String> {
    s.parse::<u32>()
        .ok()
        .and_then(TrendWindow::from_days)
        .ok_or_else(|| format!("window must be 7, 30 or 90 days, got {}", s))
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), RhythmCliError> {
    match cli.command {
        Commands::Insight { input, config } => cmd_insight(&input, config.as_deref()),
        Commands::Trend { input, window } => cmd_trend(&input, window),
        Commands::Validate { input, json } => cmd_validate(&input, json),
        Commands::Norms { age_months, json } => cmd_norms(age_months, json),
    }
}

fn cmd_insight(input: &InputArgs, config: Option<&Path>) -> Result<(), RhythmCliError> {
    let processor = match config {
        Some(path) => RhythmProcessor::with_config(InsightConfig::from_json(&fs::read_to_string(path)?)?)?,
        None => RhythmProcessor::new(),
    };

    let (activities, household, now) = read_inputs(input)?;
    let payload = processor.daily_insight_json(&activities, &household, &now)?;
    write_output(&input.output, &payload)
}

fn cmd_trend(input: &InputArgs, window: TrendWindow) -> Result<(), RhythmCliError> {
    let (activities, household, now) = read_inputs(input)?;
    let payload =
        RhythmProcessor::new().trend_report_json(&activities, &household, &now, window.days())?;
    write_output(&input.output, &payload)
}

fn cmd_validate(input: &Path, json: bool) -> Result<(), RhythmCliError> {
    let records = ActivityAdapter::parse(&read_source(input)?)?;
    if records.is_empty() {
        return Err(RhythmCliError::NoActivities);
    }

    let report = ActivityAdapter::validate(&records);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_validation(&report);
    }

    if report.is_clean() {
        Ok(())
    } else {
        Err(RhythmCliError::ValidationFailed(report.rejected.len()))
    }
}

fn cmd_norms(age_months: f64, json: bool) -> Result<(), RhythmCliError> {
    if !age_months.is_finite() || age_months < 0.0 {
        return Err(RhythmCliError::InvalidArgument(format!(
            "age must be a non-negative number of months, got {}",
            age_months
        )));
    }

    let report = NormsReport {
        producer: PRODUCER_NAME.to_string(),
        version: RHYTHM_VERSION.to_string(),
        age_months,
        band: *band_for(age_months),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let band = &report.band;
        println!("Norms at {:.1} months", report.age_months);
        println!("=====================");
        println!("Feeds per day:   {}-{}", band.feeds.0, band.feeds.1);
        println!("Naps per day:    {}-{}", band.naps.0, band.naps.1);
        println!(
            "Wake window:     {}-{} min",
            band.wake_window_minutes.0, band.wake_window_minutes.1
        );
        println!("Nap length:      {}-{} min", band.nap_minutes.0, band.nap_minutes.1);
        println!(
            "Night sleep:     {}-{} min",
            band.night_sleep_minutes.0, band.night_sleep_minutes.1
        );
    }

    Ok(())
}

// Helper functions

/// Activities, household JSON and `now`, with `now` defaulting to the household's wall clock
fn read_inputs(input: &InputArgs) -> Result<(String, String, String), RhythmCliError> {
    let activities = read_source(&input.activities)?;
    let household = match &input.household {
        Some(path) => fs::read_to_string(path)?,
        None => String::new(),
    };

    let now = match &input.now {
        Some(now) => now.clone(),
        None => {
            let offset = parse_household(&household)?.offset();
            Utc::now()
                .with_timezone(&offset)
                .naive_local()
                .format("%Y-%m-%dT%H:%M:%S")
                .to_string()
        }
    };

    Ok((activities, household, now))
}

fn read_source(path: &Path) -> Result<String, RhythmCliError> {
    if path.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

fn write_output(path: &Path, payload: &str) -> Result<(), RhythmCliError> {
    if path.to_string_lossy() == "-" {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "{}", payload)?;
    } else {
        fs::write(path, format!("{}\n", payload))?;
    }
    Ok(())
}

fn print_validation(report: &ValidationReport) {
    println!("Validation Report");
    println!("=================");
    println!("Total records:    {}", report.total);
    println!("Accepted records: {}", report.accepted);
    println!("Rejected records: {}", report.rejected.len());

    if !report.rejected.is_empty() {
        println!("\nRejected:");
        for rejected in &report.rejected {
            println!(
                "  - Activity {} (index {}): {}",
                rejected.activity_id.as_deref().unwrap_or("unknown"),
                rejected.index,
                rejected.reason
            );
        }
    }
}

// Error handling

#[derive(Debug)]
enum RhythmCliError {
    Io(io::Error),
    Rhythm(RhythmError),
    Json(serde_json::Error),
    NoActivities,
    ValidationFailed(usize),
    InvalidArgument(String),
}

impl From<io::Error> for RhythmCliError {
    fn from(e: io::Error) -> Self {
        RhythmCliError::Io(e)
    }
}

impl From<RhythmError> for RhythmCliError {
    fn from(e: RhythmError) -> Self {
        RhythmCliError::Rhythm(e)
    }
}

impl From<serde_json::Error> for RhythmCliError {
    fn from(e: serde_json::Error) -> Self {
        RhythmCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<RhythmCliError> for CliError {
    fn from(e: RhythmCliError) -> Self {
        match e {
            RhythmCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            RhythmCliError::Rhythm(e) => {
                let (code, hint) = match &e {
                    RhythmError::InvalidConfig(_) => {
                        ("CONFIG_ERROR", "Check the config and household files")
                    }
                    RhythmError::InvalidTimestamp(_) => {
                        ("TIME_ERROR", "Use an ISO 8601 timestamp such as 2024-03-15T14:30:00")
                    }
                    RhythmError::EncodingError(_) => ("ENCODING_ERROR", "Report this as a bug"),
                    RhythmError::ParseError(_) | RhythmError::JsonError(_) => {
                        ("PARSE_ERROR", "Run 'rhythm validate' for details")
                    }
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            RhythmCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            RhythmCliError::NoActivities => CliError {
                code: "NO_ACTIVITIES".to_string(),
                message: "No activities found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            RhythmCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} activities failed validation", count),
                hint: Some("Rejected records are skipped by insight and trend".to_string()),
            },
            RhythmCliError::InvalidArgument(msg) => CliError {
                code: "INVALID_ARGUMENT".to_string(),
                message: msg,
                hint: None,
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct NormsReport {
    producer: String,
    version: String,
    age_months: f64,
    band: AgeBand,
}
