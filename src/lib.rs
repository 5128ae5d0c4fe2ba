//! cachetrigger - cache refresh trigger for Kafka
//!
//! This library provides a small consumer that watches one Kafka topic and
//! refreshes a downstream cache whenever a message contains a trigger
//! phrase. Before consuming it writes the SASL credential descriptor and
//! makes sure the topic exists through the admin REST API.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `credentials`: JAAS-style credential descriptor file
//! - `admin`: Admin REST API client and topic provisioning
//! - `consumer`: SASL_SSL Kafka consumer and message source trait
//! - `cache`: Cache refresher trait and HTTP implementation
//! - `dispatcher`: Poll loop and trigger matching
//! - `bootstrap`: Ordered startup sequence
//! - `config`: Configuration management and validation
//! - `error`: Bootstrap error kinds, exit codes and result alias
//! - `logging`: tracing subscriber setup
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use cachetrigger::{bootstrap, Config, HttpCacheRefresher, TriggerDispatcher};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/cachetrigger.yaml")?;
//!     config.validate()?;
//!
//!     let source = bootstrap::bootstrap(&config).await?;
//!     let refresher = HttpCacheRefresher::new(&config.cache)?;
//!     TriggerDispatcher::new(source, refresher, config.trigger_message.clone())
//!         .run()
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod admin;
pub mod bootstrap;
pub mod cache;
pub mod cli;
pub mod commands;
pub mod config;
pub mod consumer;
pub mod credentials;
pub mod dispatcher;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use admin::{ensure_topic_exists, AdminClient, TopicAdmin, TopicStatus};
pub use cache::{CacheRefresher, HttpCacheRefresher};
pub use config::Config;
pub use consumer::{ConsumedMessage, KafkaMessageSource, MessageSource};
pub use credentials::CredentialDescriptor;
pub use dispatcher::{matches_trigger, RefreshFailurePolicy, TriggerDispatcher};
pub use error::{BootstrapError, Result};

#[cfg(test)]
pub mod test_utils;
