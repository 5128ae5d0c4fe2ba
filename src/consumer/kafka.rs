//! rdkafka-backed message source.
//!
//! [`KafkaMessageSource`] wraps an rdkafka `StreamConsumer`. Polls are
//! batch-shaped: wait up to the timeout for the first record, then take
//! whatever else is already buffered without waiting, up to the configured
//! batch size.

use async_trait::async_trait;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::error::{KafkaError, KafkaResult};
use rdkafka::message::BorrowedMessage;
use rdkafka::ClientConfig;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::config::ConsumerSettings;
use super::message::ConsumedMessage;
use crate::credentials::CredentialError;

/// Errors that can occur during consumer operations.
#[derive(Error, Debug)]
pub enum ConsumerError {
    /// The credential descriptor could not be loaded.
    #[error("Credential descriptor error: {0}")]
    Credentials(#[from] CredentialError),

    /// librdkafka rejected the client configuration.
    #[error("Failed to create Kafka consumer: {0}")]
    Create(#[source] KafkaError),

    /// The brokers could not be reached or refused authentication.
    #[error("Failed to connect to Kafka: {0}")]
    Connect(String),

    /// Subscribing to the topic failed.
    #[error("Failed to subscribe to topic {topic}: {source}")]
    Subscribe {
        /// Topic name.
        topic: String,
        /// Underlying Kafka error.
        #[source]
        source: KafkaError,
    },
}

/// Source of message batches for the trigger dispatcher.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Subscribes to exactly one topic, replacing any earlier subscription.
    fn subscribe(&self, topic: &str) -> Result<(), ConsumerError>;

    /// Waits up to `timeout` for records.
    ///
    /// Returns an empty batch when nothing arrives in time. Records are in
    /// the order the client delivered them.
    async fn poll_batch(&self, timeout: Duration) -> Result<Vec<ConsumedMessage>, ConsumerError>;
}

/// Kafka consumer used by the poll loop.
pub struct KafkaMessageSource {
    consumer: Arc<StreamConsumer>,
    max_batch_size: usize,
}

impl KafkaMessageSource {
    /// Creates the consumer and verifies the brokers accept it.
    ///
    /// Client creation alone does not touch the network, so a metadata
    /// request is made to surface unreachable brokers and rejected
    /// credentials at startup.
    ///
    /// # Errors
    ///
    /// Returns `ConsumerError::Create` for an invalid configuration and
    /// `ConsumerError::Connect` when the metadata request fails.
    pub async fn connect(settings: ConsumerSettings) -> Result<Self, ConsumerError> {
        info!(
            brokers = %settings.brokers,
            group_id = super::GROUP_ID,
            client_id = super::CLIENT_ID,
            "Creating Kafka consumer"
        );

        let mut client_config = ClientConfig::new();
        for (key, value) in settings.client_config() {
            client_config.set(key, value);
        }

        let consumer: StreamConsumer = client_config.create().map_err(ConsumerError::Create)?;
        let consumer = Arc::new(consumer);

        let probe = Arc::clone(&consumer);
        let timeout = settings.connect_timeout;
        let metadata = tokio::task::spawn_blocking(move || {
            probe
                .fetch_metadata(None, timeout)
                .map(|metadata| metadata.brokers().len())
        })
        .await
        .map_err(|e| ConsumerError::Connect(format!("metadata task failed: {}", e)))?
        .map_err(|e| ConsumerError::Connect(e.to_string()))?;

        info!(brokers = metadata, "Created Kafka consumer");

        Ok(Self {
            consumer,
            max_batch_size: settings.max_batch_size.max(1),
        })
    }

    fn collect(result: KafkaResult<BorrowedMessage<'_>>, batch: &mut Vec<ConsumedMessage>) {
        match result {
            Ok(message) => batch.push(ConsumedMessage::from_message(&message)),
            Err(e) => warn!(error = %e, "Kafka error while polling"),
        }
    }
}

#[async_trait]
impl MessageSource for KafkaMessageSource {
    fn subscribe(&self, topic: &str) -> Result<(), ConsumerError> {
        self.consumer
            .subscribe(&[topic])
            .map_err(|source| ConsumerError::Subscribe {
                topic: topic.to_string(),
                source,
            })?;
        info!(topic = %topic, "Subscribed to topic");
        Ok(())
    }

    async fn poll_batch(&self, timeout: Duration) -> Result<Vec<ConsumedMessage>, ConsumerError> {
        let mut batch = Vec::new();

        match tokio::time::timeout(timeout, self.consumer.recv()).await {
            Ok(first) => Self::collect(first, &mut batch),
            Err(_) => return Ok(batch),
        }

        // A zero timeout still polls the receive future once, so records
        // that are already buffered are taken without waiting.
        for _ in 1..self.max_batch_size {
            match tokio::time::timeout(Duration::ZERO, self.consumer.recv()).await {
                Ok(next) => Self::collect(next, &mut batch),
                Err(_) => break,
            }
        }

        debug!(count = batch.len(), "Polled batch");
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consumer_error_display() {
        let err = ConsumerError::Connect("Local: Broker transport failure".to_string());
        assert_eq!(
            err.to_string(),
            "Failed to connect to Kafka: Local: Broker transport failure"
        );

        let err = ConsumerError::Subscribe {
            topic: "api".to_string(),
            source: KafkaError::Subscription("bad".to_string()),
        };
        assert!(err.to_string().starts_with("Failed to subscribe to topic api"));
    }

    #[test]
    fn test_consumer_error_from_credentials() {
        let err: ConsumerError = CredentialError::MissingField("password").into();
        assert!(matches!(err, ConsumerError::Credentials(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ConsumerError>();
        assert_send_sync::<KafkaMessageSource>();
    }
}
