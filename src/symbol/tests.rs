//! Symbol table, response parsing and symbolizer tests

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use pretty_assertions::assert_eq;
use test_case::test_case;

use super::*;
use crate::client::{ClientError, ProfilerEndpoint};

/// Endpoint that answers `/symbol` from a fixed map and records each batch
struct FakeSymbols {
    names: HashMap<&'static str, &'static str>,
    batches: Mutex<Vec<Vec<String>>>,
    fail_on_batch: Option<usize>,
}

impl FakeSymbols {
    fn new(names: &[(&'static str, &'static str)]) -> Self {
        Self {
            names: names.iter().copied().collect(),
            batches: Mutex::new(Vec::new()),
            fail_on_batch: None,
        }
    }

    fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProfilerEndpoint for FakeSymbols {
    async fn fetch_heap(&self, _seconds: u64) -> Result<Bytes, ClientError> {
        Ok(Bytes::new())
    }

    async fn symbolize(&self, addresses: &[String]) -> Result<String, ClientError> {
        let mut batches = self.batches.lock().unwrap();
        if self.fail_on_batch == Some(batches.len()) {
            return Err(ClientError::Transport {
                method: hyper::Method::POST,
                url: "http://127.0.0.1:1/symbol".to_string(),
                reason: "connection refused".to_string(),
            });
        }
        batches.push(addresses.to_vec());

        let mut body = String::new();
        for address in addresses {
            if let Some(name) = self.names.get(address.as_str()) {
                body.push_str(&format!("{}\t{}\n", address, name));
            }
        }
        Ok(body)
    }
}

fn table(addresses: &[&str]) -> SymbolTable {
    let mut table = SymbolTable::new();
    for address in addresses {
        table.insert(address);
    }
    table
}

// ============================================================================
// SymbolTable
// ============================================================================

#[test]
fn test_table_deduplicates_and_keeps_order() {
    let mut table = SymbolTable::new();
    assert!(table.insert("0x2"));
    assert!(table.insert("0x1"));
    assert!(!table.insert("0x2"));

    assert_eq!(table.len(), 2);
    assert_eq!(table.addresses().collect::<Vec<_>>(), vec!["0x2", "0x1"]);
}

#[test]
fn test_table_display_name_falls_back_to_address() {
    let mut table = table(&["0x1", "0x2"]);
    assert!(table.resolve("0x1", "main"));

    assert_eq!(table.display_name("0x1"), "main");
    assert_eq!(table.display_name("0x2"), "0x2");
    assert_eq!(table.display_name("0x3"), "0x3");
    assert_eq!(table.name("0x2"), None);
    assert_eq!(table.resolved_count(), 1);
}

#[test]
fn test_table_resolve_unknown_address() {
    let mut table = table(&["0x1"]);
    assert!(!table.resolve("0x9", "other"));
    assert!(!table.contains("0x9"));
    assert_eq!(table.len(), 1);
}

// ============================================================================
// Response parsing
// ============================================================================

#[test_case("0x1 funcA", "0x1", "funcA"; "single space")]
#[test_case("0x7fff950f943e  operator new()", "0x7fff950f943e", "operator new()"; "embedded space")]
#[test_case(
    "0x102296ceb\tyb::tserver::(anonymous namespace)::SetLastRow()",
    "0x102296ceb",
    "yb::tserver::(anonymous namespace)::SetLastRow()";
    "tab separator"
)]
#[test_case("  0x1   std::vector<int>::push_back(int&&)", "0x1", "std::vector<int>::push_back(int&&)"; "leading whitespace")]
fn test_parse_symbol_line(line: &str, address: &str, symbol: &str) {
    let response = parse_symbol_response(line);
    assert_eq!(
        response.entries,
        vec![(address.to_string(), symbol.to_string())]
    );
    assert_eq!(response.malformed_lines, 0);
}

#[test]
fn test_parse_symbol_response_crlf_endings() {
    let response = parse_symbol_response("0x1 funcA\r\n0x2 ns::funcB()\r\n");
    assert_eq!(
        response.entries,
        vec![
            ("0x1".to_string(), "funcA".to_string()),
            ("0x2".to_string(), "ns::funcB()".to_string()),
        ]
    );
}

#[test]
fn test_parse_symbol_response_skips_bad_lines() {
    let body = "0x1 funcA\n\n   \n0x2\n0x3   \n0x4 funcD\n";
    let response = parse_symbol_response(body);

    assert_eq!(
        response.entries,
        vec![
            ("0x1".to_string(), "funcA".to_string()),
            ("0x4".to_string(), "funcD".to_string()),
        ]
    );
    assert_eq!(response.malformed_lines, 2);
}

// ============================================================================
// Symbolizer
// ============================================================================

#[tokio::test]
async fn test_symbolizer_resolves_and_falls_back() {
    let endpoint = FakeSymbols::new(&[("0x1", "funcA"), ("0x2", "funcB")]);
    let mut table = table(&["0x1", "0x2", "0x3"]);

    let stats = Symbolizer::new(&endpoint)
        .resolve_all(&mut table)
        .await
        .unwrap();

    assert_eq!(table.display_name("0x1"), "funcA");
    assert_eq!(table.display_name("0x2"), "funcB");
    assert_eq!(table.display_name("0x3"), "0x3");
    assert_eq!(
        stats,
        SymbolizeStats {
            batches: 1,
            addresses: 3,
            resolved: 2,
            malformed_lines: 0,
            unknown_addresses: 0,
        }
    );
}

#[tokio::test]
async fn test_symbolizer_batches_of_25() {
    let addresses: Vec<String> = (0..60).map(|i| format!("0x{:x}", i)).collect();
    let refs: Vec<&str> = addresses.iter().map(String::as_str).collect();
    let mut table = table(&refs);
    let endpoint = FakeSymbols::new(&[]);

    let stats = Symbolizer::new(&endpoint)
        .resolve_all(&mut table)
        .await
        .unwrap();

    let batches = endpoint.batches();
    assert_eq!(stats.batches, 3);
    assert_eq!(
        batches.iter().map(Vec::len).collect::<Vec<_>>(),
        vec![25, 25, 10]
    );
    assert_eq!(batches.concat(), addresses);
    assert_eq!(stats.resolved, 0);
}

#[tokio::test]
async fn test_symbolizer_custom_batch_size() {
    let mut table = table(&["0x1", "0x2", "0x3"]);
    let endpoint = FakeSymbols::new(&[]);

    let symbolizer = Symbolizer::new(&endpoint).with_batch_size(0);
    assert_eq!(symbolizer.batch_size(), 1);
    symbolizer.resolve_all(&mut table).await.unwrap();

    assert_eq!(endpoint.batches().len(), 3);
}

#[tokio::test]
async fn test_symbolizer_empty_table_sends_nothing() {
    let endpoint = FakeSymbols::new(&[]);
    let mut table = SymbolTable::new();

    let stats = Symbolizer::new(&endpoint)
        .resolve_all(&mut table)
        .await
        .unwrap();

    assert_eq!(stats.batches, 0);
    assert!(endpoint.batches().is_empty());
}

#[tokio::test]
async fn test_symbolizer_failure_is_fatal() {
    let mut endpoint = FakeSymbols::new(&[("0x1", "funcA")]);
    endpoint.fail_on_batch = Some(1);
    let addresses: Vec<String> = (0..30).map(|i| format!("0x{:x}", i)).collect();
    let refs: Vec<&str> = addresses.iter().map(String::as_str).collect();
    let mut table = table(&refs);

    let err = Symbolizer::new(&endpoint)
        .resolve_all(&mut table)
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Transport { .. }));
    assert_eq!(endpoint.batches().len(), 1);
}
