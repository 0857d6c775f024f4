//! NATS event source.
//!
//! The consumer subscribes to the configured topic as a NATS subject, joined
//! to a queue group named after the consumer group id. Every consumer sharing
//! a group receives a disjoint share of the subject's messages, the same
//! delivery model as a Kafka consumer group.

use buzzboard_core::{EventSource, RawRecord, SourceError};
use futures::StreamExt;
use tracing::{debug, info};

use crate::error::AppError;

/// Queue-group subscription yielding raw message payloads.
pub struct NatsEventSource {
    client: async_nats::Client,
    subscriber: async_nats::Subscriber,
    subject: String,
    next_position: u64,
}

impl NatsEventSource {
    /// Connect to `url` and subscribe to `subject` in queue group `group`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Nats`] if the connection or subscription fails.
    pub async fn connect(url: &str, subject: &str, group: &str) -> Result<Self, AppError> {
        info!(url = url, "connecting to NATS server");
        let client = async_nats::connect(url)
            .await
            .map_err(|e| AppError::Nats(format!("failed to connect to {url}: {e}")))?;
        info!("NATS connection established");

        debug!(subject = subject, group = group, "subscribing to topic");
        let subscriber = client
            .queue_subscribe(subject.to_owned(), group.to_owned())
            .await
            .map_err(|e| AppError::Nats(format!("failed to subscribe to {subject}: {e}")))?;
        info!(subject = subject, group = group, "subscribed to topic");

        Ok(Self {
            client,
            subscriber,
            subject: subject.to_owned(),
            next_position: 0,
        })
    }
}

impl EventSource for NatsEventSource {
    async fn next_record(&mut self) -> Result<Option<RawRecord>, SourceError> {
        let Some(message) = self.subscriber.next().await else {
            info!(subject = self.subject, "NATS subscription ended");
            return Ok(None);
        };

        let position = self.next_position;
        self.next_position = self.next_position.saturating_add(1);
        debug!(
            subject = %message.subject,
            position = position,
            payload_size = message.payload.len(),
            "received NATS message"
        );
        Ok(Some(RawRecord::new(position, message.payload.to_vec())))
    }

    async fn close(mut self) -> Result<(), SourceError> {
        self.subscriber
            .unsubscribe()
            .await
            .map_err(|e| SourceError::Release(format!("unsubscribe from {} failed: {e}", self.subject)))?;
        self.client
            .flush()
            .await
            .map_err(|e| SourceError::Release(format!("flush failed: {e}")))?;
        info!(subject = self.subject, "NATS consumer closed");
        Ok(())
    }
}

impl std::fmt::Debug for NatsEventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NatsEventSource")
            .field("subject", &self.subject)
            .field("next_position", &self.next_position)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Integration tests that require a live NATS server are marked #[ignore].
    #[tokio::test]
    #[ignore]
    async fn connect_and_subscribe() {
        let result = NatsEventSource::connect("nats://localhost:4222", "buzz_test", "group").await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    #[ignore]
    async fn receives_published_payload() {
        let mut source = NatsEventSource::connect("nats://localhost:4222", "buzz_roundtrip", "g")
            .await
            .unwrap_or_else(|e| {
                tracing::error!("NATS connection failed: {e}");
                std::process::exit(1);
            });
        let publisher = async_nats::connect("nats://localhost:4222")
            .await
            .unwrap_or_else(|e| {
                tracing::error!("NATS connection failed: {e}");
                std::process::exit(1);
            });
        let payload = r#"{"author":"a","message":"great"}"#;
        publisher
            .publish("buzz_roundtrip", payload.as_bytes().to_vec().into())
            .await
            .ok();
        publisher.flush().await.ok();

        let record = source.next_record().await.ok().flatten();
        assert_eq!(record.map(|r| r.payload), Some(payload.as_bytes().to_vec()));
        assert!(source.close().await.is_ok());
    }

    #[tokio::test]
    #[ignore]
    async fn unreachable_server_fails_to_connect() {
        let result = NatsEventSource::connect("nats://127.0.0.1:1", "buzz", "g").await;
        assert!(matches!(result, Err(AppError::Nats(_))));
    }
}
