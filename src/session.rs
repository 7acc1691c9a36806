//! Profiling Session
//!
//! One run of the tool, strictly sequential:
//!
//! 1. fetch the heap profile and save it as `<prefix>.raw.txt`
//! 2. parse the saved file, collecting every distinct stack address
//! 3. resolve all addresses through `/symbol`
//! 4. write `<prefix>.in_use_bytes.html` and `<prefix>.alloc_bytes.html`
//!
//! Each stage finishes before the next starts. Any transport or filesystem
//! failure ends the run.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::client::ProfilerEndpoint;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetch::{fetch_heap_profile, DEFAULT_PROFILE_SECONDS};
use crate::profile::{ProfileHeader, ProfileParser};
use crate::report::{Reporter, SortMetric, DEFAULT_MAX_CALL_STACKS};
use crate::symbol::{Symbolizer, DEFAULT_BATCH_SIZE};

/// Files produced by a session, all derived from one prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFiles {
    pub raw: PathBuf,
    pub in_use_bytes: PathBuf,
    pub alloc_bytes: PathBuf,
}

impl OutputFiles {
    pub fn from_prefix(prefix: &str) -> Self {
        Self {
            raw: PathBuf::from(format!("{}.raw.txt", prefix)),
            in_use_bytes: PathBuf::from(format!("{}.{}.html", prefix, SortMetric::InUseBytes)),
            alloc_bytes: PathBuf::from(format!("{}.{}.html", prefix, SortMetric::AllocBytes)),
        }
    }

    /// Report path for `metric`
    pub fn report(&self, metric: SortMetric) -> &Path {
        match metric {
            SortMetric::InUseBytes => &self.in_use_bytes,
            SortMetric::AllocBytes => &self.alloc_bytes,
        }
    }
}

/// Tunables for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Heap collection window passed as `?seconds=`
    pub seconds: u64,
    /// Addresses per `/symbol` request
    pub batch_size: usize,
    /// Rows per report
    pub max_call_stacks: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            seconds: DEFAULT_PROFILE_SECONDS,
            batch_size: DEFAULT_BATCH_SIZE,
            max_call_stacks: DEFAULT_MAX_CALL_STACKS,
        }
    }
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            seconds: config.profiler.seconds,
            batch_size: config.symbolizer.batch_size,
            max_call_stacks: config.report.max_call_stacks,
        }
    }
}

/// What a completed session produced
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub header: ProfileHeader,
    pub raw_bytes: usize,
    pub records: usize,
    pub malformed_lines: usize,
    pub addresses: usize,
    pub resolved: usize,
    pub symbol_batches: usize,
    /// Rows in each report, at most `max_call_stacks`
    pub report_rows: usize,
    pub files: OutputFiles,
}

/// A single fetch, symbolize and report run against one endpoint
pub struct ProfileSession<E> {
    endpoint: E,
    settings: SessionSettings,
    files: OutputFiles,
}

impl<E: ProfilerEndpoint> ProfileSession<E> {
    pub fn new(endpoint: E, output_prefix: &str, settings: SessionSettings) -> Self {
        Self {
            endpoint,
            settings,
            files: OutputFiles::from_prefix(output_prefix),
        }
    }

    pub fn files(&self) -> &OutputFiles {
        &self.files
    }

    pub async fn run(&self) -> Result<SessionSummary> {
        let raw_bytes =
            fetch_heap_profile(&self.endpoint, self.settings.seconds, &self.files.raw).await?;

        let mut profile = ProfileParser::new()
            .parse_file(&self.files.raw)
            .map_err(|e| Error::io(&self.files.raw, e))?;
        info!(
            "Parsed {} call stacks ({} malformed lines skipped, {} distinct addresses)",
            profile.records.len(),
            profile.malformed_lines,
            profile.symbols.len()
        );

        let stats = Symbolizer::new(&self.endpoint)
            .with_batch_size(self.settings.batch_size)
            .resolve_all(&mut profile.symbols)
            .await?;
        info!(
            "Resolved {}/{} symbols in {} requests",
            stats.resolved, stats.addresses, stats.batches
        );

        let reporter = Reporter::new(&profile.records, &profile.symbols)
            .with_max_call_stacks(self.settings.max_call_stacks);
        let mut report_rows = 0;
        for metric in SortMetric::ALL {
            let path = self.files.report(metric);
            report_rows = reporter
                .write(metric, path)
                .map_err(|e| Error::io(path, e))?;
            info!("Wrote {} call stacks by {}", report_rows, metric);
        }

        Ok(SessionSummary {
            header: profile.header,
            raw_bytes,
            records: profile.records.len(),
            malformed_lines: profile.malformed_lines,
            addresses: stats.addresses,
            resolved: stats.resolved,
            symbol_batches: stats.batches,
            report_rows,
            files: self.files.clone(),
        })
    }
}
