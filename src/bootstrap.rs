//! Startup sequence
//!
//! Runs once, strictly in order, before the poll loop starts:
//! 1. Write the credential descriptor and export its location
//! 2. Make sure the topic exists through the admin API
//! 3. Build the consumer from the descriptor, connect, and subscribe
//!
//! Each step fails with its own [`BootstrapError`] variant, and a failed
//! step stops the sequence.
//!
//! Step 1 changes the process environment, so the binary runs
//! [`write_credentials`] on the main thread before the async runtime starts
//! and hands the path to [`bootstrap_from_descriptor`].

use std::future::Future;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::admin::{ensure_topic_exists, AdminClient, TopicAdmin, TopicStatus};
use crate::config::Config;
use crate::consumer::{ConsumerError, ConsumerSettings, KafkaMessageSource, MessageSource};
use crate::credentials::{install_descriptor, CredentialDescriptor};
use crate::error::BootstrapError;

/// Writes the credential descriptor for the configured Kafka user.
///
/// Must not run while other threads may read the environment.
///
/// # Errors
///
/// Returns `BootstrapError::CredentialWrite` if the file cannot be written.
pub fn write_credentials(config: &Config) -> Result<PathBuf, BootstrapError> {
    let descriptor = CredentialDescriptor::new(&config.kafka.username, &config.kafka.password);
    let path = install_descriptor(&descriptor, &config.credentials_path())?;
    Ok(path)
}

/// Ensures the configured topic exists using the given admin client.
///
/// # Errors
///
/// Returns `BootstrapError::TopicList` or `BootstrapError::TopicCreate`
/// depending on which admin call failed.
pub async fn provision_topic<A>(config: &Config, admin: &A) -> Result<TopicStatus, BootstrapError>
where
    A: TopicAdmin + ?Sized,
{
    Ok(ensure_topic_exists(admin, &config.topic).await?)
}

/// Runs the full startup sequence with injectable collaborators.
///
/// `connect` receives settings built from the descriptor written in step 1
/// and returns an unsubscribed source.
pub async fn bootstrap_with<A, S, F, Fut>(
    config: &Config,
    admin: &A,
    connect: F,
) -> Result<S, BootstrapError>
where
    A: TopicAdmin + ?Sized,
    S: MessageSource,
    F: FnOnce(ConsumerSettings) -> Fut,
    Fut: Future<Output = Result<S, ConsumerError>>,
{
    let descriptor_path = write_credentials(config)?;
    connect_with(config, &descriptor_path, admin, connect).await
}

/// Runs steps 2 and 3 against a descriptor that is already written.
pub async fn connect_with<A, S, F, Fut>(
    config: &Config,
    descriptor_path: &Path,
    admin: &A,
    connect: F,
) -> Result<S, BootstrapError>
where
    A: TopicAdmin + ?Sized,
    S: MessageSource,
    F: FnOnce(ConsumerSettings) -> Fut,
    Fut: Future<Output = Result<S, ConsumerError>>,
{
    let status = provision_topic(config, admin).await?;
    info!(topic = %config.topic, status = ?status, "Topic ready");

    let settings = ConsumerSettings::from_descriptor(&config.kafka, descriptor_path)?;
    let source = connect(settings).await?;
    source.subscribe(&config.topic)?;

    info!(topic = %config.topic, "Bootstrap complete");
    Ok(source)
}

/// Runs the startup sequence against the real admin API and Kafka cluster.
///
/// # Errors
///
/// Returns the [`BootstrapError`] of the first step that failed.
pub async fn bootstrap(config: &Config) -> Result<KafkaMessageSource, BootstrapError> {
    let descriptor_path = write_credentials(config)?;
    bootstrap_from_descriptor(config, &descriptor_path).await
}

/// Runs steps 2 and 3 against the real services once the descriptor at
/// `descriptor_path` has been written.
pub async fn bootstrap_from_descriptor(
    config: &Config,
    descriptor_path: &Path,
) -> Result<KafkaMessageSource, BootstrapError> {
    let admin = AdminClient::new(&config.admin)?;
    connect_with(config, descriptor_path, &admin, KafkaMessageSource::connect).await
}
