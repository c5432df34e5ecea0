//! Commit dispatcher backed by the downstream automation webhook.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use super::traits::CommitDispatcher;
use crate::error::DispatchError;
use crate::transaction::Transaction;

pub struct WebhookDispatcher {
    client: reqwest::Client,
    url: String,
    auth_token: Arc<SecretString>,
}

impl WebhookDispatcher {
    pub fn new(
        client: reqwest::Client,
        url: impl Into<String>,
        auth_token: Arc<SecretString>,
    ) -> Self {
        Self {
            client,
            url: url.into(),
            auth_token,
        }
    }
}

#[async_trait]
impl CommitDispatcher for WebhookDispatcher {
    async fn dispatch(&self, transaction: &Transaction) -> Result<(), DispatchError> {
        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(self.auth_token.expose_secret())
            .json(transaction)
            .send()
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(DispatchError::Status { status, body });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::transaction::Category;

    fn dispatcher_for(server: &MockServer) -> WebhookDispatcher {
        WebhookDispatcher::new(
            reqwest::Client::new(),
            format!("{}/webhook/add-transaction", server.uri()),
            Arc::new(SecretString::from("tok")),
        )
    }

    fn categorized() -> Transaction {
        let mut txn = Transaction::new("u-1", "REF1", "2024-05-01", "12:00", 180.0, "Canteen");
        txn.categorize(Category::Food, "Lunch", None).unwrap();
        txn
    }

    #[tokio::test]
    async fn posts_the_record_as_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/webhook/add-transaction"))
            .and(header("Authorization", "Bearer tok"))
            .and(header("Content-Type", "application/json"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        dispatcher_for(&server).dispatch(&categorized()).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["category"], "Food");
        assert_eq!(body["subcategory"], "Lunch");
        assert!(body.get("remarks").is_none());
    }

    #[tokio::test]
    async fn server_error_is_a_dispatch_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("workflow crashed"))
            .mount(&server)
            .await;

        let err = dispatcher_for(&server).dispatch(&categorized()).await.unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Status { status: 500, ref body } if body == "workflow crashed"
        ));
    }
}
