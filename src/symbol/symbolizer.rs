//! Batched symbol resolution against a profiler endpoint

use tracing::{debug, info};

use super::{parse_symbol_response, SymbolTable};
use crate::client::{ClientError, ProfilerEndpoint};

/// Addresses sent per `/symbol` request
pub const DEFAULT_BATCH_SIZE: usize = 25;

/// Outcome of a full symbolization pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SymbolizeStats {
    /// Requests issued
    pub batches: usize,
    /// Distinct addresses submitted
    pub addresses: usize,
    /// Addresses that ended up with a name
    pub resolved: usize,
    /// Response lines skipped because they lacked a symbol part
    pub malformed_lines: usize,
    /// Response entries naming an address that was never requested
    pub unknown_addresses: usize,
}

/// Resolves every address in a [`SymbolTable`] through a [`ProfilerEndpoint`]
pub struct Symbolizer<'a, E: ?Sized> {
    endpoint: &'a E,
    batch_size: usize,
}

impl<'a, E: ProfilerEndpoint + ?Sized> Symbolizer<'a, E> {
    pub fn new(endpoint: &'a E) -> Self {
        Self {
            endpoint,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Override the batch size (clamped to at least one address)
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Resolve all addresses in `table`, overwriting names in place.
    ///
    /// Addresses missing from every response stay unresolved. A failed
    /// request aborts the pass.
    pub async fn resolve_all(&self, table: &mut SymbolTable) -> Result<SymbolizeStats, ClientError> {
        let addresses: Vec<String> = table.addresses().map(str::to_string).collect();
        let total = addresses.len();
        info!("Total symbols: {}", total);

        let mut stats = SymbolizeStats {
            addresses: total,
            ..Default::default()
        };
        let mut completed = 0;

        for batch in addresses.chunks(self.batch_size) {
            let body = self.endpoint.symbolize(batch).await?;
            let response = parse_symbol_response(&body);
            stats.batches += 1;
            stats.malformed_lines += response.malformed_lines;

            for (address, symbol) in response.entries {
                if !table.resolve(&address, symbol) {
                    debug!("Ignoring symbol for unrequested address {}", address);
                    stats.unknown_addresses += 1;
                }
            }

            completed += batch.len();
            info!("Completed symbolizing {}/{} symbols", completed, total);
        }

        stats.resolved = table.resolved_count();
        Ok(stats)
    }
}
