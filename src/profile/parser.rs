//! Line-oriented heap profile parser

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use regex::{Captures, Regex};
use tracing::{debug, info, warn};

use super::{HeapProfile, ProfileHeader, StackRecord};

/// Marker that ends the stack section of a heap profile
pub const MAPPED_LIBRARIES_MARKER: &str = "MAPPED_LIBRARIES:";

const HEADER_PATTERN: &str = r"^\s*heap profile:\s*(\d+):\s*(\d+)\s*\[\s*(\d+):\s*(\d+)\s*\]";
const STACK_PATTERN: &str = r"^\s*(\d+):\s*(\d+)\s*\[\s*(\d+):\s*(\d+)\s*\]\s*@(.*)$";

/// Parser for the textual heap profile format
///
/// Parsing is best-effort: a header or stack line that does not match is
/// logged and skipped, never returned as an error.
pub struct ProfileParser {
    header_re: Regex,
    stack_re: Regex,
}

impl Default for ProfileParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileParser {
    pub fn new() -> Self {
        Self {
            header_re: Regex::new(HEADER_PATTERN).expect("header pattern is valid"),
            stack_re: Regex::new(STACK_PATTERN).expect("stack pattern is valid"),
        }
    }

    /// Parse the header line: `heap profile: <int>: <int> [<int>: <int>]`
    pub fn parse_header(&self, line: &str) -> Option<ProfileHeader> {
        let caps = self.header_re.captures(line)?;
        let [in_use_count, in_use_bytes, alloc_count, alloc_bytes] = counters(&caps)?;
        Some(ProfileHeader {
            in_use_count,
            in_use_bytes,
            alloc_count,
            alloc_bytes,
        })
    }

    /// Parse a stack line: `<int>: <int> [<int>: <int>] @ <addr> <addr> ...`
    pub fn parse_stack_line(&self, line: &str) -> Option<StackRecord> {
        let caps = self.stack_re.captures(line)?;
        let [in_use_count, in_use_bytes, alloc_count, alloc_bytes] = counters(&caps)?;
        let stack = caps
            .get(5)
            .map(|m| m.as_str().split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();
        Some(StackRecord {
            in_use_count,
            in_use_bytes,
            alloc_count,
            alloc_bytes,
            stack,
        })
    }

    /// Parse a profile previously saved to disk
    pub fn parse_file(&self, path: &Path) -> io::Result<HeapProfile> {
        let file = File::open(path)?;
        self.parse_reader(BufReader::new(file))
    }

    /// Parse a profile from any buffered reader, one line at a time.
    ///
    /// Lines are decoded lossily, so bytes that are not UTF-8 only make their
    /// own line malformed. Only read failures are returned as errors.
    pub fn parse_reader<R: BufRead>(&self, mut reader: R) -> io::Result<HeapProfile> {
        let mut profile = HeapProfile::default();
        let mut buf = Vec::new();
        let mut index = 0;
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            let line = String::from_utf8_lossy(strip_line_ending(&buf));
            if !self.feed(&mut profile, index, &line) {
                break;
            }
            index += 1;
        }
        Ok(profile)
    }

    /// Parse a profile held in memory
    pub fn parse_str(&self, content: &str) -> HeapProfile {
        let mut profile = HeapProfile::default();
        for (index, line) in content.lines().enumerate() {
            if !self.feed(&mut profile, index, line) {
                break;
            }
        }
        profile
    }

    /// Handle one line. Returns false once the stack section has ended.
    fn feed(&self, profile: &mut HeapProfile, index: usize, line: &str) -> bool {
        if index == 0 {
            debug!("header: {}", line);
            match self.parse_header(line) {
                Some(header) => {
                    profile.header = header;
                    profile.header_parsed = true;
                }
                None => warn!("Unexpected header format: {}", line),
            }
            return true;
        }

        if line.trim().is_empty() {
            return true;
        }

        if line.trim_end() == MAPPED_LIBRARIES_MARKER {
            info!("End of stacks at line {}", index + 1);
            return false;
        }

        match self.parse_stack_line(line) {
            Some(record) => {
                for address in &record.stack {
                    profile.symbols.insert(address);
                }
                profile.records.push(record);
            }
            None => {
                warn!("Unexpected format in line {}: {}", index + 1, line);
                profile.malformed_lines += 1;
            }
        }
        true
    }
}

/// Extract the four counters from capture groups 1-4. Values that do not fit
/// in a u64 reject the whole line.
fn counters(caps: &Captures<'_>) -> Option<[u64; 4]> {
    let field = |i: usize| caps.get(i)?.as_str().parse::<u64>().ok();
    Some([field(1)?, field(2)?, field(3)?, field(4)?])
}

/// Drop a trailing `\n` or `\r\n`, as `str::lines` does
fn strip_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
