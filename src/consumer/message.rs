//! Consumed message records.
//!
//! Keys and payloads are decoded as UTF-8 text; invalid sequences are
//! replaced rather than rejected, so every record reaches the dispatcher.

use rdkafka::message::Message;

/// A single consumed record, detached from the consumer that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumedMessage {
    /// Topic the record was read from.
    pub topic: String,

    /// Partition within the topic.
    pub partition: i32,

    /// Offset within the partition.
    pub offset: i64,

    /// Record key, if any.
    pub key: Option<String>,

    /// Record value as text, if any.
    pub payload: Option<String>,
}

impl ConsumedMessage {
    /// Builds a text record from a payload, for sources other than Kafka.
    pub fn text(topic: &str, partition: i32, offset: i64, payload: &str) -> Self {
        Self {
            topic: topic.to_string(),
            partition,
            offset,
            key: None,
            payload: Some(payload.to_string()),
        }
    }

    /// Copies an rdkafka message into an owned record.
    pub fn from_message<M: Message>(message: &M) -> Self {
        Self {
            topic: message.topic().to_string(),
            partition: message.partition(),
            offset: message.offset(),
            key: message
                .key()
                .map(|k| String::from_utf8_lossy(k).into_owned()),
            payload: message
                .payload()
                .map(|p| String::from_utf8_lossy(p).into_owned()),
        }
    }
}
