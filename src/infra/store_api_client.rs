use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::app::ports::StoreApiPort;
use crate::config::StoreApiConfig;
use crate::error::{EtlError, Result};

const API_KEY_HEADER: &str = "x-api-key";

pub struct ReqwestStoreApi {
    client: reqwest::Client,
    count_url: String,
    detail_url: String,
    api_key_env: String,
}

impl ReqwestStoreApi {
    pub fn new(client: reqwest::Client, config: &StoreApiConfig) -> Self {
        Self {
            client,
            count_url: config.count_url.clone(),
            detail_url: config.detail_url.clone(),
            api_key_env: config.api_key_env.clone(),
        }
    }

    async fn get_json(&self, url: &str) -> Result<Value> {
        let api_key = std::env::var(&self.api_key_env)?;
        let resp = self
            .client
            .get(url)
            .header(API_KEY_HEADER, api_key)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(EtlError::Source {
                message: format!("GET {} returned {}", url, resp.status()),
            });
        }
        Ok(resp.json::<Value>().await?)
    }
}

/// The count endpoint answers `{"number_stores": n, ...}`.
fn parse_count(body: &Value) -> Result<usize> {
    body.get("number_stores")
        .and_then(Value::as_u64)
        .map(|n| n as usize)
        .ok_or_else(|| EtlError::Source {
            message: format!("store count response lacks 'number_stores': {}", body),
        })
}

#[async_trait]
impl StoreApiPort for ReqwestStoreApi {
    #[instrument(skip(self))]
    async fn list_count(&self) -> Result<usize> {
        let body = self.get_json(&self.count_url).await?;
        let count = parse_count(&body)?;
        debug!(count, "Store count");
        Ok(count)
    }

    #[instrument(skip(self))]
    async fn fetch(&self, store_index: usize) -> Result<Value> {
        let url = self.detail_url.replace("{store_number}", &store_index.to_string());
        let record = self.get_json(&url).await?;
        if !record.is_object() {
            return Err(EtlError::Source {
                message: format!("store {} detail is not a JSON object", store_index),
            });
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    /// Serve one HTTP response and hand back the raw request text.
    async fn serve_once(body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = stream.read(&mut buf).await.unwrap();
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&buf[..n]).into_owned()
        });
        (format!("http://{}", addr), handle)
    }

    fn config(base: &str, key_env: &str) -> StoreApiConfig {
        StoreApiConfig {
            count_url: format!("{}/number_stores", base),
            detail_url: format!("{}/store_details/{{store_number}}", base),
            api_key_env: key_env.to_string(),
            timeout_seconds: 5,
        }
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count(&serde_json::json!({"statusCode": 200, "number_stores": 451})).unwrap(), 451);
        assert!(parse_count(&serde_json::json!({"statusCode": 200})).is_err());
    }

    #[tokio::test]
    async fn test_list_count_sends_api_key() {
        std::env::set_var("RETAIL_ETL_TEST_KEY_COUNT", "secret-key");
        let (base, server) = serve_once(r#"{"statusCode": 200, "number_stores": 3}"#).await;
        let api = ReqwestStoreApi::new(reqwest::Client::new(), &config(&base, "RETAIL_ETL_TEST_KEY_COUNT"));

        assert_eq!(api.list_count().await.unwrap(), 3);
        let request = server.await.unwrap().to_lowercase();
        assert!(request.starts_with("get /number_stores"));
        assert!(request.contains("x-api-key: secret-key"));
    }

    #[tokio::test]
    async fn test_fetch_fills_store_number() {
        std::env::set_var("RETAIL_ETL_TEST_KEY_FETCH", "k");
        let (base, server) = serve_once(r#"{"index": 7, "store_code": "HA-7AC23E2D"}"#).await;
        let api = ReqwestStoreApi::new(reqwest::Client::new(), &config(&base, "RETAIL_ETL_TEST_KEY_FETCH"));

        let record = api.fetch(7).await.unwrap();
        assert_eq!(record["store_code"], "HA-7AC23E2D");
        assert!(server.await.unwrap().starts_with("GET /store_details/7 "));
    }

    #[tokio::test]
    async fn test_missing_api_key_is_env_error() {
        let api = ReqwestStoreApi::new(
            reqwest::Client::new(),
            &config("http://127.0.0.1:9", "RETAIL_ETL_TEST_KEY_UNSET"),
        );
        assert!(matches!(api.list_count().await, Err(EtlError::Env(_))));
    }
}
