//! Audit event publishers.
//!
//! `HttpEventPublisher` posts each message to the configured audit endpoint;
//! `TracingEventPublisher` only logs it, for local runs without one.

use anyhow::anyhow;
use async_trait::async_trait;
use forms_core::events::AuditMessage;
use forms_core::ports::EventPublisher;
use forms_core::Result;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Clone)]
pub struct HttpEventPublisher {
    client: reqwest::Client,
    url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishReceipt {
    message_id: String,
}

impl HttpEventPublisher {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl EventPublisher for HttpEventPublisher {
    async fn publish(&self, message: &AuditMessage) -> Result<String> {
        let response = self
            .client
            .post(&self.url)
            .json(message)
            .send()
            .await
            .map_err(|e| anyhow!(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("audit endpoint error {status}: {body}").into());
        }

        let receipt: PublishReceipt = response.json().await.map_err(|e| anyhow!(e))?;
        Ok(receipt.message_id)
    }
}

/// Writes each message to the log and hands back a generated id.
#[derive(Debug, Clone, Default)]
pub struct TracingEventPublisher;

#[async_trait]
impl EventPublisher for TracingEventPublisher {
    async fn publish(&self, message: &AuditMessage) -> Result<String> {
        let payload = serde_json::to_string(message).map_err(|e| anyhow!(e))?;
        let message_id = Uuid::new_v4().to_string();
        tracing::info!(%message_id, %payload, "audit event");
        Ok(message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forms_core::events::AuditEventType;
    use forms_core::model::Author;

    #[tokio::test]
    async fn tracing_publisher_returns_fresh_ids() {
        let publisher = TracingEventPublisher;
        let message = AuditMessage::new(
            AuditEventType::FormCreated,
            Uuid::nil(),
            &Author::new("u", "U"),
            None,
        );
        let a = publisher.publish(&message).await.unwrap();
        let b = publisher.publish(&message).await.unwrap();
        assert_ne!(a, b);
    }
}
