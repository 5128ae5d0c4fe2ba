//! Error types for cachetrigger
//!
//! Each component defines its own `thiserror` enum next to the code that
//! raises it. This module holds the process-level types: the bootstrap
//! error that tags which startup step failed, and the `Result` alias used
//! by the CLI plumbing.

use thiserror::Error;

use crate::admin::ProvisionError;
use crate::config::ConfigError;
use crate::consumer::ConsumerError;
use crate::credentials::CredentialError;
use crate::dispatcher::DispatchError;

/// Exit status for an invalid configuration (`EX_CONFIG`).
pub const EXIT_CONFIG: i32 = 78;
/// Exit status when the credential descriptor cannot be written (`EX_CANTCREAT`).
pub const EXIT_CREDENTIAL_WRITE: i32 = 73;
/// Exit status when the admin service cannot list topics (`EX_UNAVAILABLE`).
pub const EXIT_TOPIC_LIST: i32 = 69;
/// Exit status when topic creation fails (`EX_SOFTWARE`).
pub const EXIT_TOPIC_CREATE: i32 = 70;
/// Exit status when the Kafka client cannot connect (`EX_OSERR`).
pub const EXIT_CLIENT_CONNECT: i32 = 71;
/// Exit status when the poll loop stops on a refresh failure (`EX_TEMPFAIL`).
pub const EXIT_REFRESH: i32 = 75;

/// Failure of one of the one-time startup steps.
///
/// The variants follow the startup order. Every variant is fatal; the
/// caller picks the exit status through [`BootstrapError::exit_code`].
#[derive(Error, Debug)]
pub enum BootstrapError {
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The credential descriptor could not be written
    #[error("Credential write failed: {0}")]
    CredentialWrite(#[from] CredentialError),

    /// The admin service could not list topics
    #[error("Topic listing failed: {0}")]
    TopicList(#[source] ProvisionError),

    /// The admin service refused or failed to create the topic
    #[error("Topic creation failed: {0}")]
    TopicCreate(#[source] ProvisionError),

    /// The Kafka consumer could not be built, connected or subscribed
    #[error("Kafka client connection failed: {0}")]
    ClientConnect(#[source] ConsumerError),
}

impl BootstrapError {
    /// Process exit status for this failure kind.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => EXIT_CONFIG,
            Self::CredentialWrite(_) => EXIT_CREDENTIAL_WRITE,
            Self::TopicList(_) => EXIT_TOPIC_LIST,
            Self::TopicCreate(_) => EXIT_TOPIC_CREATE,
            Self::ClientConnect(_) => EXIT_CLIENT_CONNECT,
        }
    }

    /// Short name of the failing step, used as a structured log field.
    pub fn step(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::CredentialWrite(_) => "credential_write",
            Self::TopicList(_) => "topic_list",
            Self::TopicCreate(_) => "topic_create",
            Self::ClientConnect(_) => "client_connect",
        }
    }
}

impl From<ProvisionError> for BootstrapError {
    fn from(err: ProvisionError) -> Self {
        if err.is_listing_failure() {
            Self::TopicList(err)
        } else {
            Self::TopicCreate(err)
        }
    }
}

impl From<ConsumerError> for BootstrapError {
    /// A descriptor that cannot be read back belongs to the credential step.
    fn from(err: ConsumerError) -> Self {
        match err {
            ConsumerError::Credentials(source) => Self::CredentialWrite(source),
            other => Self::ClientConnect(other),
        }
    }
}

/// Maps any error surfaced by a command to its exit status.
///
/// Errors that are neither bootstrap nor dispatch failures exit with 1.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    if let Some(bootstrap) = err.downcast_ref::<BootstrapError>() {
        return bootstrap.exit_code();
    }
    if err.downcast_ref::<ConfigError>().is_some() {
        return EXIT_CONFIG;
    }
    if err.downcast_ref::<DispatchError>().is_some() {
        return EXIT_REFRESH;
    }
    1
}

/// Result type alias for cachetrigger operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn credential_error() -> CredentialError {
        CredentialError::Write {
            path: PathBuf::from("/nonexistent/jaas.conf"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        }
    }

    #[test]
    fn test_exit_codes_are_distinct_per_step() {
        let errors = [
            BootstrapError::Config(ConfigError::Invalid("x".to_string())),
            BootstrapError::CredentialWrite(credential_error()),
            BootstrapError::TopicList(ProvisionError::ListMalformed("bad".to_string())),
            BootstrapError::TopicCreate(ProvisionError::Rejected("taken".to_string())),
            BootstrapError::ClientConnect(ConsumerError::Connect("down".to_string())),
        ];

        let mut codes: Vec<i32> = errors.iter().map(|e| e.exit_code()).collect();
        assert!(codes.iter().all(|c| *c != 0));
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_provision_error_maps_to_step() {
        let listing: BootstrapError = ProvisionError::ListMalformed("not an array".to_string()).into();
        assert!(matches!(listing, BootstrapError::TopicList(_)));
        assert_eq!(listing.step(), "topic_list");

        let create: BootstrapError = ProvisionError::Rejected("quota exceeded".to_string()).into();
        assert!(matches!(create, BootstrapError::TopicCreate(_)));
        assert_eq!(create.exit_code(), EXIT_TOPIC_CREATE);
    }

    #[test]
    fn test_unreadable_descriptor_maps_to_credential_step() {
        let err: BootstrapError =
            ConsumerError::Credentials(CredentialError::MissingField("password")).into();
        assert!(matches!(err, BootstrapError::CredentialWrite(_)));
        assert_eq!(err.exit_code(), EXIT_CREDENTIAL_WRITE);

        let connect: BootstrapError = ConsumerError::Connect("timed out".to_string()).into();
        assert_eq!(connect.exit_code(), EXIT_CLIENT_CONNECT);
    }

    #[test]
    fn test_display_includes_cause() {
        let err = BootstrapError::TopicCreate(ProvisionError::Rejected("quota exceeded".to_string()));
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[test]
    fn test_exit_code_for_anyhow_chain() {
        let err: anyhow::Error = BootstrapError::CredentialWrite(credential_error()).into();
        assert_eq!(exit_code_for(&err), EXIT_CREDENTIAL_WRITE);

        let other = anyhow::anyhow!("something else");
        assert_eq!(exit_code_for(&other), 1);
    }

    #[test]
    fn test_exit_code_for_refresh_abort() {
        let err: anyhow::Error = DispatchError::Refresh {
            topic: "api".to_string(),
            partition: 0,
            offset: 12,
            attempts: 1,
            source: crate::cache::RefreshError::Other("down".to_string()),
        }
        .into();
        assert_eq!(exit_code_for(&err), EXIT_REFRESH);

        let config: anyhow::Error = ConfigError::Missing("kafka.brokers".to_string()).into();
        assert_eq!(exit_code_for(&config), EXIT_CONFIG);
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BootstrapError>();
    }
}
