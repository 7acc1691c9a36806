//! `/symbol` response parsing
//!
//! The endpoint answers with one `<address> <symbol>` pair per line. The
//! symbol itself may contain spaces, only the first whitespace run separates
//! the two parts:
//!
//! ```text
//! 0x7fff950fcd23  std::__1::basic_string<>::append()
//! 0x7fff950f943e  operator new()
//! 0x102296ceb     yb::tserver::(anonymous namespace)::SetLastRow()
//! ```

use tracing::warn;

/// Parsed body of a single `/symbol` response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolResponse {
    /// (address, symbol) pairs in response order
    pub entries: Vec<(String, String)>,
    /// Non-blank lines that did not have two parts
    pub malformed_lines: usize,
}

pub fn parse_symbol_response(body: &str) -> SymbolResponse {
    let mut response = SymbolResponse::default();
    for line in body.lines() {
        let line = line.trim_start();
        if line.is_empty() {
            continue;
        }

        match split_symbol_line(line) {
            Some((address, symbol)) => response
                .entries
                .push((address.to_string(), symbol.to_string())),
            None => {
                warn!("Unexpected output line: {}", line);
                response.malformed_lines += 1;
            }
        }
    }
    response
}

/// Split at the first whitespace run. Everything after it is the symbol,
/// verbatim.
fn split_symbol_line(line: &str) -> Option<(&str, &str)> {
    let (address, rest) = line.split_once(char::is_whitespace)?;
    let symbol = rest.trim_start();
    if symbol.is_empty() {
        return None;
    }
    Some((address, symbol))
}
