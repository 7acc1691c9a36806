//! heaptop - top heap allocation call stacks of a running process
//!
//! Fetches a heap profile from a process's diagnostic HTTP endpoint,
//! resolves the stack addresses through the same endpoint and renders the
//! heaviest call stacks as HTML tables.

pub mod client;
pub mod config;
pub mod error;
pub mod fetch;
pub mod profile;
pub mod report;
pub mod session;
pub mod symbol;

pub use client::{ClientError, HttpProfilerClient, ProfilerEndpoint};
pub use config::Config;
pub use error::Error;
pub use profile::{HeapProfile, ProfileHeader, ProfileParser, StackRecord};
pub use report::{Reporter, SortMetric};
pub use session::{OutputFiles, ProfileSession, SessionSettings, SessionSummary};
pub use symbol::{SymbolTable, Symbolizer};
