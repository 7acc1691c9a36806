//! Heap profile download

use std::path::Path;

use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::client::ProfilerEndpoint;
use crate::error::{Error, Result};

/// `?seconds=` value used when none is configured
pub const DEFAULT_PROFILE_SECONDS: u64 = 20;

/// Fetch one heap profile from `endpoint` and save the body, unmodified, to
/// `path`. Returns the number of bytes written.
///
/// The output file is created before the request so an unwritable path fails
/// without waiting out the collection window.
pub async fn fetch_heap_profile<E>(endpoint: &E, seconds: u64, path: &Path) -> Result<usize>
where
    E: ProfilerEndpoint + ?Sized,
{
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| Error::io(path, e))?;

    let body = endpoint.fetch_heap(seconds).await?;

    file.write_all(&body).await.map_err(|e| Error::io(path, e))?;
    file.flush().await.map_err(|e| Error::io(path, e))?;

    info!("Raw output: {} ({} bytes)", path.display(), body.len());
    Ok(body.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientError;
    use async_trait::async_trait;
    use bytes::Bytes;
    use hyper::StatusCode;

    struct StaticHeap(&'static str);

    #[async_trait]
    impl ProfilerEndpoint for StaticHeap {
        async fn fetch_heap(&self, _seconds: u64) -> std::result::Result<Bytes, ClientError> {
            Ok(Bytes::from_static(self.0.as_bytes()))
        }

        async fn symbolize(&self, _addresses: &[String]) -> std::result::Result<String, ClientError> {
            Ok(String::new())
        }
    }

    struct Unavailable;

    #[async_trait]
    impl ProfilerEndpoint for Unavailable {
        async fn fetch_heap(&self, seconds: u64) -> std::result::Result<Bytes, ClientError> {
            Err(ClientError::Status {
                method: hyper::Method::GET,
                url: format!("http://127.0.0.1:1/heap?seconds={}", seconds),
                status: StatusCode::SERVICE_UNAVAILABLE,
                body: "profiling disabled".to_string(),
            })
        }

        async fn symbolize(&self, _addresses: &[String]) -> std::result::Result<String, ClientError> {
            Ok(String::new())
        }
    }

    #[tokio::test]
    async fn test_body_is_written_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.raw.txt");
        let body = "heap profile: 1: 8 [1: 8]\r\n1: 8 [1: 8] @ 0x1\n\n";

        let written = fetch_heap_profile(&StaticHeap(body), 20, &path).await.unwrap();

        assert_eq!(written, body.len());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), body);
    }

    #[tokio::test]
    async fn test_unwritable_path_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("run.raw.txt");

        let err = fetch_heap_profile(&StaticHeap("x"), 20, &path).await.unwrap_err();
        assert!(matches!(err, Error::Io { .. }), "unexpected error: {}", err);
    }

    #[tokio::test]
    async fn test_endpoint_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.raw.txt");

        let err = fetch_heap_profile(&Unavailable, 20, &path).await.unwrap_err();
        match err {
            Error::Client(ClientError::Status { status, .. }) => {
                assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE)
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
