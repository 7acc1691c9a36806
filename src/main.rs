//! heaptop - top heap allocation call stacks of a running process
//!
//! Usage:
//!   heaptop --profile_url <URL> --output_file_prefix <PREFIX> [OPTIONS]
//!
//! Options:
//!   --profile_url <URL>           Base URL of the profiler (serves /heap and /symbol)
//!   --output_file_prefix <PREFIX> Prefix for .raw.txt, .in_use_bytes.html, .alloc_bytes.html
//!   -c, --config <FILE>           Configuration file path
//!   --seconds <N>                 Heap collection window (default: 20)
//!   --batch_size <N>              Addresses per symbol request (default: 25)
//!   --max_call_stacks <N>         Rows per report (default: 1000)
//!   -l, --log_level <LEVEL>       Log level (error, warn, info, debug, trace)
//!   -h, --help                    Print usage

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, CommandFactory, Parser, ValueEnum};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use heaptop::config::Config;
use heaptop::{HttpProfilerClient, ProfileSession, SessionSettings};

/// Log level for CLI
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum LogLevel {
    /// Only errors
    Error,
    /// Warnings and errors
    Warn,
    /// Informational messages
    #[default]
    Info,
    /// Debug messages
    Debug,
    /// Trace messages (very verbose)
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }

    fn from_config(level: &str) -> Self {
        match level.to_lowercase().as_str() {
            "error" => LogLevel::Error,
            "warn" => LogLevel::Warn,
            "info" => LogLevel::Info,
            "debug" => LogLevel::Debug,
            "trace" => LogLevel::Trace,
            _ => LogLevel::Info,
        }
    }
}

/// heaptop - report the top heap allocation call stacks of a running process
#[derive(Parser, Debug)]
#[command(name = "heaptop")]
#[command(version)]
#[command(about = "Fetch a heap profile, symbolize it and write the top call stacks as HTML")]
#[command(disable_help_flag = true)]
struct Args {
    /// Base URL of the profiler, e.g. http://127.0.0.1:9000/pprof
    #[arg(long = "profile_url", value_name = "URL")]
    profile_url: Option<String>,

    /// Prefix for the raw dump and both HTML reports
    #[arg(long = "output_file_prefix", value_name = "PREFIX")]
    output_file_prefix: Option<String>,

    /// Configuration file path (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Heap collection window in seconds
    #[arg(long)]
    seconds: Option<u64>,

    /// Addresses per symbol request
    #[arg(long = "batch_size")]
    batch_size: Option<usize>,

    /// Rows per report
    #[arg(long = "max_call_stacks")]
    max_call_stacks: Option<usize>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long = "log_level", value_enum)]
    log_level: Option<LogLevel>,

    /// Print usage
    #[arg(short = 'h', long = "help", action = ArgAction::SetTrue)]
    help: bool,
}

fn print_usage() {
    let _ = Args::command().print_help();
    println!();
}

#[tokio::main]
async fn main() -> ExitCode {
    // Unknown flags are reported by clap, which exits non-zero
    let args = Args::parse();

    let (profile_url, output_prefix) = match (&args.profile_url, &args.output_file_prefix) {
        (Some(url), Some(prefix)) if !args.help && !url.is_empty() && !prefix.is_empty() => {
            (url.clone(), prefix.clone())
        }
        _ => {
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    // Load configuration file if specified, otherwise defaults plus env overrides
    let loaded = match &args.config {
        Some(path) => Config::load(path),
        None => Config::from_env(),
    };
    let mut file_config = match loaded {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // CLI args override file config
    if let Some(seconds) = args.seconds {
        file_config.profiler.seconds = seconds;
    }
    if let Some(batch_size) = args.batch_size {
        file_config.symbolizer.batch_size = batch_size;
    }
    if let Some(max_call_stacks) = args.max_call_stacks {
        file_config.report.max_call_stacks = max_call_stacks;
    }
    if let Err(e) = file_config.validate() {
        eprintln!("Invalid options: {}", e);
        return ExitCode::FAILURE;
    }

    let log_level = args
        .log_level
        .unwrap_or_else(|| LogLevel::from_config(&file_config.log.level));

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level.to_tracing_level())
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Error installing logger: {}", e);
        return ExitCode::FAILURE;
    }

    if let Some(path) = &args.config {
        info!("Loaded configuration from {:?}", path);
    }
    info!("Profile base URL: {}", profile_url);
    info!("Output file prefix: {}", output_prefix);

    let client = match HttpProfilerClient::new(&profile_url) {
        Ok(client) => client.with_timeout(file_config.profiler.request_timeout),
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let session = ProfileSession::new(
        client,
        &output_prefix,
        SessionSettings::from_config(&file_config),
    );

    match session.run().await {
        Ok(summary) => {
            info!(
                "Done: {} call stacks, {}/{} symbols resolved",
                summary.records, summary.resolved, summary.addresses
            );
            info!("  Raw profile: {}", summary.files.raw.display());
            info!("  By in-use bytes: {}", summary.files.in_use_bytes.display());
            info!("  By allocated bytes: {}", summary.files.alloc_bytes.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
