//! Poll loop and trigger dispatch
//!
//! The dispatcher owns the steady state of the process:
//! 1. Polls the message source with a fixed 3 second timeout
//! 2. Matches each payload against the trigger phrase, ignoring case
//! 3. Calls the cache refresher once per matching message, in order
//! 4. Applies the configured policy when a refresh fails
//!
//! There is no debouncing: two matching messages in one batch cause two
//! refresh calls.

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::cache::{CacheRefresher, RefreshError};
use crate::config::{CacheConfig, RefreshFailureMode};
use crate::consumer::{ConsumedMessage, MessageSource};

/// Timeout passed to every poll of the message source.
pub const POLL_TIMEOUT: Duration = Duration::from_millis(3000);

/// Errors that stop the poll loop.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// A cache refresh failed and the policy does not allow continuing.
    #[error(
        "Cache refresh failed after {attempts} attempt(s) for message {topic}/{partition}@{offset}: {source}"
    )]
    Refresh {
        /// Topic of the triggering message.
        topic: String,
        /// Partition of the triggering message.
        partition: i32,
        /// Offset of the triggering message.
        offset: i64,
        /// Number of refresh calls made for this message.
        attempts: u32,
        /// Last refresh error.
        #[source]
        source: RefreshError,
    },
}

/// What the poll loop does when a refresh call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshFailurePolicy {
    /// Stop the loop and surface the error.
    #[default]
    Abort,
    /// Log the failure and move on to the next message.
    Skip,
    /// Call again up to `attempts` times in total, sleeping
    /// `backoff * n` after the n-th failure. Stops the loop when every
    /// attempt failed.
    Retry {
        /// Total refresh calls per triggering message.
        attempts: u32,
        /// Base delay between calls.
        backoff: Duration,
    },
}

impl RefreshFailurePolicy {
    /// Builds the policy from the cache configuration.
    pub fn from_config(config: &CacheConfig) -> Self {
        match config.on_failure {
            RefreshFailureMode::Abort => Self::Abort,
            RefreshFailureMode::Skip => Self::Skip,
            RefreshFailureMode::Retry => Self::Retry {
                attempts: config.retry_attempts.max(1),
                backoff: Duration::from_millis(config.retry_backoff_ms),
            },
        }
    }

    fn max_attempts(&self) -> u32 {
        match self {
            Self::Retry { attempts, .. } => (*attempts).max(1),
            Self::Abort | Self::Skip => 1,
        }
    }
}

/// Returns true when `payload` contains `trigger`, ignoring case.
pub fn matches_trigger(payload: &str, trigger: &str) -> bool {
    payload.to_lowercase().contains(&trigger.to_lowercase())
}

/// Consumes messages and refreshes the cache on trigger messages.
pub struct TriggerDispatcher<S, R> {
    source: S,
    refresher: R,
    trigger: String,
    policy: RefreshFailurePolicy,
    dry_run: bool,
}

impl<S: MessageSource, R: CacheRefresher> TriggerDispatcher<S, R> {
    /// Creates a dispatcher over an already subscribed source.
    pub fn new(source: S, refresher: R, trigger: impl Into<String>) -> Self {
        Self {
            source,
            refresher,
            trigger: trigger.into(),
            policy: RefreshFailurePolicy::default(),
            dry_run: false,
        }
    }

    /// Sets the refresh failure policy.
    pub fn with_policy(mut self, policy: RefreshFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// In dry-run mode matches are logged but the cache is never refreshed.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// The trigger phrase being matched.
    pub fn trigger(&self) -> &str {
        &self.trigger
    }

    /// Runs the poll loop until a refresh failure stops it.
    ///
    /// Empty polls and poll errors do not stop the loop.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::Refresh` when a refresh fails under the
    /// `Abort` policy, or every attempt fails under `Retry`.
    pub async fn run(&self) -> Result<(), DispatchError> {
        info!(
            trigger = %self.trigger,
            policy = ?self.policy,
            dry_run = self.dry_run,
            "Starting poll loop"
        );

        loop {
            let batch = match self.source.poll_batch(POLL_TIMEOUT).await {
                Ok(batch) => batch,
                Err(e) => {
                    warn!(error = %e, "Poll failed");
                    continue;
                }
            };

            if batch.is_empty() {
                continue;
            }

            self.process_batch(&batch).await?;
        }
    }

    /// Handles one polled batch in delivery order.
    ///
    /// Returns the number of messages that triggered a refresh.
    pub async fn process_batch(&self, batch: &[ConsumedMessage]) -> Result<usize, DispatchError> {
        let mut refreshed = 0;

        for message in batch {
            let Some(payload) = message.payload.as_deref() else {
                continue;
            };

            if !matches_trigger(payload, &self.trigger) {
                continue;
            }

            info!(
                topic = %message.topic,
                partition = message.partition,
                offset = message.offset,
                "Trigger message received"
            );

            if self.dry_run {
                info!(offset = message.offset, "Dry run, skipping cache refresh");
                continue;
            }

            if self.refresh_for(message).await? {
                refreshed += 1;
            }
        }

        debug!(
            messages = batch.len(),
            refreshed = refreshed,
            "Processed batch"
        );
        Ok(refreshed)
    }

    /// Returns `Ok(false)` when the refresh failed and was skipped.
    async fn refresh_for(&self, message: &ConsumedMessage) -> Result<bool, DispatchError> {
        let max_attempts = self.policy.max_attempts();
        let mut attempt = 1;

        loop {
            let err = match self.refresher.refresh().await {
                Ok(()) => return Ok(true),
                Err(e) => e,
            };

            match self.policy {
                RefreshFailurePolicy::Skip => {
                    error!(
                        offset = message.offset,
                        error = %err,
                        "Cache refresh failed, continuing"
                    );
                    return Ok(false);
                }
                RefreshFailurePolicy::Retry { backoff, .. } if attempt < max_attempts => {
                    let delay = retry_delay(backoff, attempt);
                    warn!(
                        attempt = attempt,
                        max_attempts = max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Cache refresh failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                _ => {
                    return Err(DispatchError::Refresh {
                        topic: message.topic.clone(),
                        partition: message.partition,
                        offset: message.offset,
                        attempts: attempt,
                        source: err,
                    });
                }
            }
        }
    }
}

/// Linear backoff, saturating instead of overflowing.
fn retry_delay(backoff: Duration, attempt: u32) -> Duration {
    backoff.checked_mul(attempt).unwrap_or(Duration::MAX)
}
