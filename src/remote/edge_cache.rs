//! Edge cache client: reads and overwrites the pending-transaction list.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::traits::{QueueCacheWriter, TransactionSource};
use crate::error::{CacheWriteError, FetchError};
use crate::transaction::Transaction;

/// `{ "value": [Transaction, ...] }`. A missing or null value means an empty list.
#[derive(Debug, Deserialize)]
struct CacheEnvelope {
    #[serde(default)]
    value: Option<Vec<Transaction>>,
}

pub struct EdgeCacheClient {
    client: reqwest::Client,
    read_url: String,
    write_url: String,
    key: String,
    auth_token: Arc<SecretString>,
}

impl EdgeCacheClient {
    pub fn new(
        client: reqwest::Client,
        read_url: impl Into<String>,
        write_url: impl Into<String>,
        key: impl Into<String>,
        auth_token: Arc<SecretString>,
    ) -> Self {
        Self {
            client,
            read_url: read_url.into(),
            write_url: write_url.into(),
            key: key.into(),
            auth_token,
        }
    }
}

#[async_trait]
impl TransactionSource for EdgeCacheClient {
    async fn fetch_pending(&self) -> Result<Vec<Transaction>, FetchError> {
        let resp = self
            .client
            .get(&self.read_url)
            .bearer_auth(self.auth_token.expose_secret())
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: CacheEnvelope =
            serde_json::from_str(&body).map_err(|e| FetchError::Malformed(e.to_string()))?;
        Ok(envelope.value.unwrap_or_default())
    }
}

#[async_trait]
impl QueueCacheWriter for EdgeCacheClient {
    async fn write_pending(&self, pending: &[Transaction]) -> Result<(), CacheWriteError> {
        let body = serde_json::json!({
            "key": self.key,
            "value": pending,
        });

        let resp = self
            .client
            .post(&self.write_url)
            .bearer_auth(self.auth_token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| CacheWriteError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(CacheWriteError::Status { status, body });
        }

        tracing::debug!(
            remaining = pending.len(),
            key = %self.key,
            "Pending list written to cache"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_for(server: &MockServer) -> EdgeCacheClient {
        EdgeCacheClient::new(
            reqwest::Client::new(),
            format!("{}/cache/unsaved-transactions", server.uri()),
            format!("{}/cache", server.uri()),
            "unsaved-transactions",
            Arc::new(SecretString::from("tok")),
        )
    }

    fn txn_json(uuid: &str) -> serde_json::Value {
        serde_json::json!({
            "uuid": uuid,
            "reference": format!("REF-{uuid}"),
            "date": "2024-05-01",
            "time": "08:15",
            "amount": 64,
            "recipient": "Bakery",
        })
    }

    #[tokio::test]
    async fn fetch_parses_value_list_with_bearer_auth() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cache/unsaved-transactions"))
            .and(header("Authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "value": [txn_json("a"), txn_json("b")]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let txns = client_for(&server).fetch_pending().await.unwrap();
        assert_eq!(txns.len(), 2);
        assert_eq!(txns[0].uuid, "a");
        assert_eq!(txns[1].reference, "REF-b");
    }

    #[tokio::test]
    async fn fetch_treats_null_value_as_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "value": null })),
            )
            .mount(&server)
            .await;

        assert!(client_for(&server).fetch_pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn fetch_accepts_numeric_reference() {
        let server = MockServer::start().await;
        let mut numeric = txn_json("n");
        numeric["reference"] = serde_json::json!(412345678901u64);
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "value": [txn_json("a"), numeric]
            })))
            .mount(&server)
            .await;

        let txns = client_for(&server).fetch_pending().await.unwrap();
        assert_eq!(txns.len(), 2);
        assert_eq!(txns[1].reference, "412345678901");
    }

    #[tokio::test]
    async fn fetch_reports_status_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_pending().await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 401, ref body } if body == "bad token"));
    }

    #[tokio::test]
    async fn fetch_reports_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_pending().await.unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
    }

    #[tokio::test]
    async fn fetch_reports_unreachable_source() {
        let client = EdgeCacheClient::new(
            reqwest::Client::new(),
            "http://127.0.0.1:1/cache",
            "http://127.0.0.1:1/cache",
            "k",
            Arc::new(SecretString::from("tok")),
        );
        assert!(matches!(
            client.fetch_pending().await,
            Err(FetchError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn write_posts_key_and_value() {
        let server = MockServer::start().await;
        let remaining: Vec<Transaction> = vec![serde_json::from_value(txn_json("b")).unwrap()];

        Mock::given(method("POST"))
            .and(path("/cache"))
            .and(header("Authorization", "Bearer tok"))
            .and(body_json(serde_json::json!({
                "key": "unsaved-transactions",
                "value": [txn_json("b")]
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).write_pending(&remaining).await.unwrap();
    }

    #[tokio::test]
    async fn write_reports_non_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .mount(&server)
            .await;

        let err = client_for(&server).write_pending(&[]).await.unwrap_err();
        assert!(matches!(err, CacheWriteError::Status { status: 503, .. }));
    }
}
