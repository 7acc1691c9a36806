//! hyper-based implementation of [`ProfilerEndpoint`]

use std::time::Duration;

use async_trait::async_trait;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::CONTENT_TYPE;
use hyper::{Method, Request, StatusCode, Uri};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tracing::{debug, info};

use super::{ClientError, ProfilerEndpoint};

/// Default upper bound on a single request, heap collection included
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Longest error body kept in [`ClientError::Status`]
const MAX_ERROR_BODY: usize = 512;

/// HTTP(S) client for a profiler's `/heap` and `/symbol` routes
pub struct HttpProfilerClient {
    base_url: String,
    timeout: Duration,
    http: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
}

impl HttpProfilerClient {
    /// Create a client for `base_url` (e.g. `http://127.0.0.1:9000/pprof`).
    ///
    /// A trailing `/` is ignored. `http://` and `https://` URLs are
    /// supported; server certificates are checked against the webpki roots.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let uri: Uri = base_url.parse().map_err(|e| ClientError::InvalidUrl {
            url: base_url.clone(),
            reason: format!("{}", e),
        })?;

        if !matches!(uri.scheme_str(), Some("http") | Some("https")) {
            return Err(ClientError::InvalidUrl {
                url: base_url,
                reason: "only http:// and https:// URLs are supported".to_string(),
            });
        }
        if uri.authority().is_none() {
            return Err(ClientError::InvalidUrl {
                url: base_url,
                reason: "missing host".to_string(),
            });
        }

        let connector = HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .build();

        Ok(Self {
            base_url,
            timeout: DEFAULT_REQUEST_TIMEOUT,
            http: Client::builder(TokioExecutor::new()).build(connector),
        })
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn heap_url(&self, seconds: u64) -> String {
        format!("{}/heap?seconds={}", self.base_url, seconds)
    }

    pub fn symbol_url(&self) -> String {
        format!("{}/symbol", self.base_url)
    }

    async fn send(
        &self,
        method: Method,
        url: String,
        form: Option<String>,
    ) -> Result<Bytes, ClientError> {
        let uri: Uri = url.parse().map_err(|e| ClientError::InvalidUrl {
            url: url.clone(),
            reason: format!("{}", e),
        })?;

        let mut builder = Request::builder().method(method.clone()).uri(uri);
        let body = match form {
            Some(form) => {
                builder = builder.header(CONTENT_TYPE, "application/x-www-form-urlencoded");
                Full::new(Bytes::from(form))
            }
            None => Full::new(Bytes::new()),
        };
        let request = builder
            .body(body)
            .map_err(|e| ClientError::Request(e.to_string()))?;

        debug!("{} {}", method, url);
        let exchange = self.exchange(&method, &url, request);
        let (status, body) = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| ClientError::Timeout {
                url: url.clone(),
                after: self.timeout,
            })??;

        if !status.is_success() {
            return Err(ClientError::Status {
                method,
                url,
                status,
                body: truncate_body(&body),
            });
        }

        Ok(body)
    }

    async fn exchange(
        &self,
        method: &Method,
        url: &str,
        request: Request<Full<Bytes>>,
    ) -> Result<(StatusCode, Bytes), ClientError> {
        let response = self
            .http
            .request(request)
            .await
            .map_err(|e| ClientError::Transport {
                method: method.clone(),
                url: url.to_string(),
                reason: error_chain(&e),
            })?;

        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| ClientError::Body {
                url: url.to_string(),
                reason: e.to_string(),
            })?
            .to_bytes();

        Ok((status, body))
    }
}

#[async_trait]
impl ProfilerEndpoint for HttpProfilerClient {
    async fn fetch_heap(&self, seconds: u64) -> Result<Bytes, ClientError> {
        let url = self.heap_url(seconds);
        info!("Invoking heap profile handler: {}", url);
        self.send(Method::GET, url, None).await
    }

    async fn symbolize(&self, addresses: &[String]) -> Result<String, ClientError> {
        let body = self
            .send(Method::POST, self.symbol_url(), Some(addresses.join("+")))
            .await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

/// Render an error with all of its sources, `outer: inner: root`
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn truncate_body(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    match text.char_indices().nth(MAX_ERROR_BODY) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}
