//! HTML Call Stack Reports
//!
//! Produces a self-contained HTML table of the top call stacks ordered by
//! one counter, with every frame shown by its resolved symbol name (or the
//! raw address when resolution failed).

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use tracing::info;

use crate::profile::StackRecord;
use crate::symbol::SymbolTable;

/// Rows kept per report
pub const DEFAULT_MAX_CALL_STACKS: usize = 1000;

/// Counter a report is ordered by (descending)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortMetric {
    /// Bytes still live
    InUseBytes,
    /// Bytes allocated over the whole profiling window
    AllocBytes,
}

impl SortMetric {
    /// Every metric a session reports on, in output order
    pub const ALL: [SortMetric; 2] = [SortMetric::InUseBytes, SortMetric::AllocBytes];

    pub fn as_str(self) -> &'static str {
        match self {
            SortMetric::InUseBytes => "in_use_bytes",
            SortMetric::AllocBytes => "alloc_bytes",
        }
    }

    pub fn value(self, record: &StackRecord) -> u64 {
        match self {
            SortMetric::InUseBytes => record.in_use_bytes,
            SortMetric::AllocBytes => record.alloc_bytes,
        }
    }
}

impl fmt::Display for SortMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Renders stack records against a resolved symbol table
pub struct Reporter<'a> {
    records: &'a [StackRecord],
    symbols: &'a SymbolTable,
    max_call_stacks: usize,
}

impl<'a> Reporter<'a> {
    pub fn new(records: &'a [StackRecord], symbols: &'a SymbolTable) -> Self {
        Self {
            records,
            symbols,
            max_call_stacks: DEFAULT_MAX_CALL_STACKS,
        }
    }

    pub fn with_max_call_stacks(mut self, max_call_stacks: usize) -> Self {
        self.max_call_stacks = max_call_stacks;
        self
    }

    /// Records ordered by `metric` descending, capped at the row limit.
    /// Equal values keep their source order.
    pub fn top(&self, metric: SortMetric) -> Vec<&'a StackRecord> {
        let mut sorted: Vec<&StackRecord> = self.records.iter().collect();
        sorted.sort_by(|a, b| metric.value(b).cmp(&metric.value(a)));
        sorted.truncate(self.max_call_stacks);
        sorted
    }

    /// Frames of `record` by display name, one per line, HTML-escaped
    pub fn stack_text(&self, record: &StackRecord) -> String {
        record
            .stack
            .iter()
            .map(|address| escape_html(self.symbols.display_name(address)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Render the complete HTML document for `metric`
    pub fn render(&self, metric: SortMetric) -> String {
        let mut html = String::new();
        html.push_str("<html>\n");
        html.push_str(&format!("<title>Top Call Stacks By: {}</title>\n", metric));
        html.push_str("<body>\n");
        html.push_str(&format!(
            "<b>Top {} Call Stacks By: {}</b>\n",
            self.max_call_stacks, metric
        ));
        html.push_str("<table border=1>\n");
        html.push_str("<tr>\n");
        for column in [
            "In Use Cnt",
            "In Use Bytes",
            "In Use Avg Size",
            "Alloc Cnt",
            "Alloc Bytes",
            "Alloc Avg Size",
            "Call Stack",
        ] {
            html.push_str(&format!("<td>{}</td>\n", column));
        }
        html.push_str("</tr>\n");

        for record in self.top(metric) {
            html.push_str("<tr>\n");
            html.push_str(&format!(
                "<td>{}</td><td>{}</td><td>{:.2}</td><td>{}</td>\
                 <td>{}</td><td>{:.2}</td><td><pre>{}</pre></td>\n",
                record.in_use_count,
                record.in_use_bytes,
                record.in_use_avg_size(),
                record.alloc_count,
                record.alloc_bytes,
                record.alloc_avg_size(),
                self.stack_text(record),
            ));
            html.push_str("</tr>\n");
        }

        html.push_str("</table>\n");
        html.push_str("</body>\n");
        html.push_str("</html>\n");
        html
    }

    /// Render `metric` and write it to `path`, returning the row count
    pub fn write(&self, metric: SortMetric, path: &Path) -> io::Result<usize> {
        info!("Writing output to {}", path.display());
        fs::write(path, self.render(metric))?;
        Ok(self.records.len().min(self.max_call_stacks))
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
