/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

It exposes three top-level command modules:

- `run`: Bootstrap, then consume trigger messages until stopped
- `provision`: Ensure the topic exists through the admin API
- `credentials`: Write the Kafka credential descriptor

Each handler validates only the configuration it needs, so `provision`
works without Kafka credentials and `credentials` without an admin URL.
*/

use crate::bootstrap;
use crate::config::Config;
use crate::error::{BootstrapError, Result};

// Consumer command handler
pub mod r#run {
    use super::*;
    use crate::cache::HttpCacheRefresher;
    use crate::dispatcher::{RefreshFailurePolicy, TriggerDispatcher};
    use std::path::PathBuf;

    /// Validate the configuration and write the credential descriptor.
    ///
    /// This exports the descriptor location into the process environment,
    /// so call it before the async runtime starts.
    pub fn prepare(config: &Config) -> Result<PathBuf> {
        tracing::info!(topic = %config.topic, "Preparing consumer");

        config.validate().map_err(BootstrapError::from)?;
        Ok(bootstrap::write_credentials(config)?)
    }

    /// Finish the startup sequence, then run the poll loop.
    ///
    /// Returns only when the loop stops on a refresh failure.
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    /// * `descriptor_path` - Descriptor written by [`prepare`]
    /// * `dry_run` - If true, trigger messages are logged but the cache is not refreshed
    pub async fn run_consumer(config: Config, descriptor_path: PathBuf, dry_run: bool) -> Result<()> {
        tracing::info!(topic = %config.topic, dry_run = dry_run, "Starting consumer");

        let source = bootstrap::bootstrap_from_descriptor(&config, &descriptor_path).await?;
        let refresher = HttpCacheRefresher::new(&config.cache)?;
        tracing::debug!(url = %refresher.refresh_url(), "Cache refresher ready");

        let dispatcher = TriggerDispatcher::new(source, refresher, config.trigger_message.clone())
            .with_policy(RefreshFailurePolicy::from_config(&config.cache))
            .with_dry_run(dry_run);

        dispatcher.run().await?;
        Ok(())
    }
}

// Topic provisioning handler
pub mod provision {
    use super::*;
    use crate::admin::{AdminClient, TopicStatus};

    /// Ensure the configured topic exists and report what happened.
    pub async fn provision_topic(config: Config) -> Result<()> {
        config.validate_admin().map_err(BootstrapError::from)?;

        let admin = AdminClient::new(&config.admin).map_err(BootstrapError::from)?;
        let status = bootstrap::provision_topic(&config, &admin).await?;

        match status {
            TopicStatus::AlreadyExists => println!("Topic '{}' already exists", config.topic),
            TopicStatus::Created => println!("Created topic '{}'", config.topic),
        }
        Ok(())
    }
}

// Credential descriptor handler
pub mod credentials {
    use super::*;

    /// Write the credential descriptor.
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    /// * `print_path` - If true, print the written path on stdout
    pub fn write_credentials(config: Config, print_path: bool) -> Result<()> {
        config.validate_credentials().map_err(BootstrapError::from)?;

        let path = bootstrap::write_credentials(&config)?;
        if print_path {
            println!("{}", path.display());
        }
        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::credentials::CredentialDescriptor;
        use crate::test_utils::valid_config;
        use serial_test::serial;

        #[test]
        #[serial]
        fn test_write_credentials_creates_descriptor() {
            let dir = tempfile::tempdir().expect("failed to create tempdir");
            let config = valid_config(dir.path());

            write_credentials(config, false).unwrap();

            let written = CredentialDescriptor::load(&dir.path().join("jaas.conf")).unwrap();
            assert_eq!(written, CredentialDescriptor::new("token", "s3cret"));
        }

        #[test]
        fn test_write_credentials_requires_password() {
            let dir = tempfile::tempdir().expect("failed to create tempdir");
            let mut config = valid_config(dir.path());
            config.kafka.password.clear();

            let err = write_credentials(config, false).unwrap_err();
            assert_eq!(crate::error::exit_code_for(&err), crate::error::EXIT_CONFIG);
            assert!(!dir.path().join("jaas.conf").exists());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::valid_config;

    #[test]
    fn test_run_rejects_invalid_config_before_bootstrap() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let mut config = valid_config(dir.path());
        config.kafka.brokers.clear();

        let err = run::prepare(&config).unwrap_err();
        assert_eq!(crate::error::exit_code_for(&err), crate::error::EXIT_CONFIG);
        assert!(!dir.path().join("jaas.conf").exists());
    }

    #[test]
    #[serial_test::serial]
    fn test_prepare_writes_descriptor() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let config = valid_config(dir.path());

        let path = run::prepare(&config).unwrap();

        assert_eq!(path, dir.path().join("jaas.conf"));
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_provision_requires_api_key() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let mut config = valid_config(dir.path());
        config.admin.api_key.clear();

        let err = provision::provision_topic(config).await.unwrap_err();
        assert_eq!(crate::error::exit_code_for(&err), crate::error::EXIT_CONFIG);
    }
}
