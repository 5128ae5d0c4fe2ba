//! Kafka consumer for trigger messages.
//!
//! This module provides everything between the broker and the trigger
//! dispatcher:
//!
//! - **Settings**: fixed SASL_SSL/PLAIN connection parameters plus the
//!   broker list and credentials read from the credential descriptor
//! - **Message Source**: the [`MessageSource`] trait the poll loop consumes,
//!   and its rdkafka implementation
//! - **Messages**: owned copies of consumed records with text payloads
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::time::Duration;
//! use cachetrigger::config::KafkaConfig;
//! use cachetrigger::consumer::{ConsumerSettings, KafkaMessageSource, MessageSource};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = KafkaConfig {
//!         brokers: "broker-0:9093".to_string(),
//!         ..Default::default()
//!     };
//!     let settings = ConsumerSettings::from_descriptor(&config, Path::new("/tmp/jaas.conf"))?;
//!     let source = KafkaMessageSource::connect(settings).await?;
//!     source.subscribe("api")?;
//!
//!     let batch = source.poll_batch(Duration::from_millis(3000)).await?;
//!     println!("received {} messages", batch.len());
//!     Ok(())
//! }
//! ```
//!
//! # Consumer Group
//!
//! Group and client identity are fixed (`cachetrigger-group`,
//! `cachetrigger-id`): every instance joins the same single logical group.
//! New groups start at the latest offset, so history is never replayed.

pub mod config;
pub mod kafka;
pub mod message;

pub use config::{ConsumerSettings, CLIENT_ID, GROUP_ID};
pub use kafka::{ConsumerError, KafkaMessageSource, MessageSource};
pub use message::ConsumedMessage;
