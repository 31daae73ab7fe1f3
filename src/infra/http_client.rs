use std::time::Duration;
use tracing::debug;

use crate::error::{EtlError, Result};

pub fn build_client(timeout_seconds: u64) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .build()?;
    Ok(client)
}

pub fn is_http(reference: &str) -> bool {
    reference.starts_with("http://") || reference.starts_with("https://")
}

/// Read a document from an http(s) URL, or from the local filesystem otherwise.
pub async fn fetch_bytes(client: &reqwest::Client, reference: &str) -> Result<Vec<u8>> {
    if !is_http(reference) {
        debug!(path = reference, "Reading local file");
        return Ok(tokio::fs::read(reference).await?);
    }

    debug!(url = reference, "Fetching remote document");
    let resp = client.get(reference).send().await?;
    if !resp.status().is_success() {
        return Err(EtlError::Source {
            message: format!("GET {} returned {}", reference, resp.status()),
        });
    }
    Ok(resp.bytes().await?.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_http() {
        assert!(is_http("https://example.com/a.csv"));
        assert!(is_http("http://localhost:9000/a.csv"));
        assert!(!is_http("/tmp/a.csv"));
        assert!(!is_http("s3://bucket/a.csv"));
    }

    #[tokio::test]
    async fn test_fetch_bytes_reads_local_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        std::fs::write(&path, b"hello").unwrap();
        let client = build_client(5).unwrap();
        let bytes = fetch_bytes(&client, path.to_str().unwrap()).await.unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[tokio::test]
    async fn test_fetch_bytes_missing_local_file_is_io_error() {
        let client = build_client(5).unwrap();
        let err = fetch_bytes(&client, "/definitely/not/here.csv").await.unwrap_err();
        assert!(matches!(err, EtlError::Io(_)));
    }
}
