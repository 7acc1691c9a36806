//! Profiler Endpoint Client
//!
//! The tool talks to two routes of a process's diagnostic HTTP server:
//!
//! - `GET  <base>/heap?seconds=<N>` returns the raw heap profile text
//! - `POST <base>/symbol` with `+`-joined addresses returns
//!   `<address> <symbol>` lines
//!
//! [`ProfilerEndpoint`] abstracts those two calls so the pipeline can be
//! driven by the real [`HttpProfilerClient`] or any other implementation.

mod http;

pub use http::{HttpProfilerClient, DEFAULT_REQUEST_TIMEOUT};

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use hyper::{Method, StatusCode};

/// Error type for profiler endpoint requests
///
/// Every variant is fatal to a run; no request is retried.
#[derive(Debug)]
pub enum ClientError {
    /// Base URL could not be used to build a request
    InvalidUrl { url: String, reason: String },
    /// Request could not be constructed
    Request(String),
    /// Connection or protocol failure
    Transport {
        method: Method,
        url: String,
        reason: String,
    },
    /// Response body could not be read
    Body { url: String, reason: String },
    /// Server answered with a non-success status
    Status {
        method: Method,
        url: String,
        status: StatusCode,
        body: String,
    },
    /// No complete response within the request timeout
    Timeout { url: String, after: Duration },
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::InvalidUrl { url, reason } => {
                write!(f, "invalid profile URL '{}': {}", url, reason)
            }
            ClientError::Request(msg) => write!(f, "failed to build request: {}", msg),
            ClientError::Transport {
                method,
                url,
                reason,
            } => write!(f, "failed to send {} {} request: {}", method, url, reason),
            ClientError::Body { url, reason } => {
                write!(f, "failed to read response body from {}: {}", url, reason)
            }
            ClientError::Status {
                method,
                url,
                status,
                body,
            } => {
                write!(f, "{} {} responded with {}", method, url, status)?;
                if !body.is_empty() {
                    write!(f, ": {}", body)?;
                }
                Ok(())
            }
            ClientError::Timeout { url, after } => {
                write!(f, "request to {} timed out after {:?}", url, after)
            }
        }
    }
}

impl std::error::Error for ClientError {}

/// The two profiler routes this tool depends on
#[async_trait]
pub trait ProfilerEndpoint: Send + Sync {
    /// Fetch a heap profile collected over `seconds`, as raw bytes
    async fn fetch_heap(&self, seconds: u64) -> Result<Bytes, ClientError>;

    /// Resolve a batch of addresses, returning the response body
    async fn symbolize(&self, addresses: &[String]) -> Result<String, ClientError>;
}
