//! Test utilities for cachetrigger
//!
//! In-memory stand-ins for the message source and the cache refresher,
//! plus a configuration that passes validation.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::cache::{CacheRefresher, RefreshError};
use crate::config::Config;
use crate::consumer::{ConsumedMessage, ConsumerError, MessageSource};

/// Message source that hands out queued batches, then empty ones.
///
/// Clones share state, so a test can keep a handle after moving the source
/// into a dispatcher.
#[derive(Clone, Default)]
pub struct ScriptedSource {
    batches: Arc<Mutex<VecDeque<Vec<ConsumedMessage>>>>,
    subscriptions: Arc<Mutex<Vec<String>>>,
    polls: Arc<AtomicUsize>,
}

impl ScriptedSource {
    pub fn with_batches(batches: Vec<Vec<ConsumedMessage>>) -> Self {
        Self {
            batches: Arc::new(Mutex::new(batches.into())),
            ..Default::default()
        }
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.subscriptions.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageSource for ScriptedSource {
    fn subscribe(&self, topic: &str) -> Result<(), ConsumerError> {
        self.subscriptions.lock().unwrap().push(topic.to_string());
        Ok(())
    }

    async fn poll_batch(&self, _timeout: Duration) -> Result<Vec<ConsumedMessage>, ConsumerError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let next = self.batches.lock().unwrap().pop_front();
        match next {
            Some(batch) => Ok(batch),
            None => {
                // stands in for the poll timeout
                tokio::time::sleep(Duration::from_millis(1)).await;
                Ok(Vec::new())
            }
        }
    }
}

/// Refresher that counts calls and fails the first `failures` of them.
#[derive(Clone, Default)]
pub struct CountingRefresher {
    calls: Arc<AtomicUsize>,
    failures: usize,
}

impl CountingRefresher {
    pub fn failing(failures: usize) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            failures,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheRefresher for CountingRefresher {
    async fn refresh(&self) -> Result<(), RefreshError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            Err(RefreshError::Other("index unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Text message on topic `api`, partition 0.
pub fn message(offset: i64, payload: &str) -> ConsumedMessage {
    ConsumedMessage::text("api", 0, offset, payload)
}

/// A configuration that passes [`Config::validate`], with the credential
/// descriptor placed under `dir`.
pub fn valid_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.kafka.brokers = "kafka-0:9093".to_string();
    config.kafka.username = "token".to_string();
    config.kafka.password = "s3cret".to_string();
    config.kafka.credentials_path = Some(dir.join("jaas.conf"));
    config.admin.url = "https://admin.example.com".to_string();
    config.admin.api_key = "abc123".to_string();
    config.cache.refresh_url = "http://localhost:9200/inventory/_refresh".to_string();
    config
}
