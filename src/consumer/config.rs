//! Connection settings for the trigger consumer.
//!
//! Everything except the broker list and the SASL credentials is fixed:
//! SASL over TLS with the PLAIN mechanism, hostname verification on,
//! latest-offset start, auto commit, and a constant group/client identity.
//!
//! # Example
//!
//! ```rust
//! use cachetrigger::consumer::config::ConsumerSettings;
//! use cachetrigger::credentials::CredentialDescriptor;
//!
//! let settings = ConsumerSettings::new("broker-0:9093", CredentialDescriptor::new("user", "pass"));
//! let props: std::collections::HashMap<_, _> = settings.client_config().into_iter().collect();
//! assert_eq!(props["security.protocol"], "SASL_SSL");
//! assert_eq!(props["auto.offset.reset"], "latest");
//! ```

use std::path::Path;
use std::time::Duration;

use crate::config::KafkaConfig;
use crate::credentials::CredentialDescriptor;

use super::kafka::ConsumerError;

/// Consumer group shared by every instance.
pub const GROUP_ID: &str = "cachetrigger-group";

/// Client identity reported to the brokers.
pub const CLIENT_ID: &str = "cachetrigger-id";

/// SASL authentication with TLS encryption.
pub const SECURITY_PROTOCOL: &str = "SASL_SSL";

/// Username/password in the SASL exchange, protected by TLS.
pub const SASL_MECHANISM: &str = "PLAIN";

/// Verify the broker hostname against its certificate.
pub const ENDPOINT_IDENTIFICATION: &str = "https";

/// New consumer groups only see messages produced after they join.
pub const AUTO_OFFSET_RESET: &str = "latest";

/// Connection settings for [`super::KafkaMessageSource`].
#[derive(Debug, Clone)]
pub struct ConsumerSettings {
    /// Kafka broker addresses (comma-separated).
    pub brokers: String,

    /// SASL credentials.
    pub credentials: CredentialDescriptor,

    /// Upper bound on messages returned by one poll.
    pub max_batch_size: usize,

    /// Deadline for the startup connectivity check.
    pub connect_timeout: Duration,
}

impl ConsumerSettings {
    /// Creates settings with the default batch size and connect timeout.
    pub fn new(brokers: &str, credentials: CredentialDescriptor) -> Self {
        let defaults = KafkaConfig::default();
        Self {
            brokers: brokers.to_string(),
            credentials,
            max_batch_size: defaults.max_batch_size,
            connect_timeout: Duration::from_secs(defaults.connect_timeout_seconds),
        }
    }

    /// Builds settings whose credentials come from the descriptor file
    /// written at startup.
    ///
    /// # Errors
    ///
    /// Returns `ConsumerError::Credentials` if the descriptor cannot be read
    /// or parsed.
    pub fn from_descriptor(config: &KafkaConfig, descriptor_path: &Path) -> Result<Self, ConsumerError> {
        let credentials = CredentialDescriptor::load(descriptor_path)?;
        Ok(Self {
            brokers: config.brokers.clone(),
            credentials,
            max_batch_size: config.max_batch_size,
            connect_timeout: Duration::from_secs(config.connect_timeout_seconds),
        })
    }

    /// Returns the librdkafka properties for this consumer.
    pub fn client_config(&self) -> Vec<(String, String)> {
        vec![
            ("bootstrap.servers".to_string(), self.brokers.clone()),
            ("group.id".to_string(), GROUP_ID.to_string()),
            ("client.id".to_string(), CLIENT_ID.to_string()),
            ("security.protocol".to_string(), SECURITY_PROTOCOL.to_string()),
            ("sasl.mechanism".to_string(), SASL_MECHANISM.to_string()),
            ("sasl.username".to_string(), self.credentials.username.clone()),
            ("sasl.password".to_string(), self.credentials.password.clone()),
            (
                "ssl.endpoint.identification.algorithm".to_string(),
                ENDPOINT_IDENTIFICATION.to_string(),
            ),
            ("auto.offset.reset".to_string(), AUTO_OFFSET_RESET.to_string()),
            ("enable.auto.commit".to_string(), "true".to_string()),
            ("enable.partition.eof".to_string(), "false".to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn props(settings: &ConsumerSettings) -> HashMap<String, String> {
        settings.client_config().into_iter().collect()
    }

    #[test]
    fn test_fixed_connection_parameters() {
        let settings = ConsumerSettings::new("kafka:9093", CredentialDescriptor::new("u", "p"));
        let config = props(&settings);

        assert_eq!(config["bootstrap.servers"], "kafka:9093");
        assert_eq!(config["group.id"], "cachetrigger-group");
        assert_eq!(config["client.id"], "cachetrigger-id");
        assert_eq!(config["security.protocol"], "SASL_SSL");
        assert_eq!(config["sasl.mechanism"], "PLAIN");
        assert_eq!(config["ssl.endpoint.identification.algorithm"], "https");
        assert_eq!(config["auto.offset.reset"], "latest");
        assert_eq!(config["enable.auto.commit"], "true");
    }

    #[test]
    fn test_credentials_in_client_config() {
        let settings =
            ConsumerSettings::new("kafka:9093", CredentialDescriptor::new("token", "s3cret"));
        let config = props(&settings);

        assert_eq!(config["sasl.username"], "token");
        assert_eq!(config["sasl.password"], "s3cret");
    }

    #[test]
    fn test_new_uses_kafka_defaults() {
        let settings = ConsumerSettings::new("kafka:9093", CredentialDescriptor::new("u", "p"));
        assert_eq!(settings.max_batch_size, 500);
        assert_eq!(settings.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_from_descriptor_reads_written_file() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let path = dir.path().join("jaas.conf");
        let descriptor = CredentialDescriptor::new("svc", "pw=with;chars");
        crate::credentials::write_descriptor(&descriptor, &path).unwrap();

        let config = KafkaConfig {
            brokers: "b1:9093,b2:9093".to_string(),
            max_batch_size: 50,
            connect_timeout_seconds: 3,
            ..Default::default()
        };
        let settings = ConsumerSettings::from_descriptor(&config, &path).unwrap();

        assert_eq!(settings.brokers, "b1:9093,b2:9093");
        assert_eq!(settings.credentials, descriptor);
        assert_eq!(settings.max_batch_size, 50);
        assert_eq!(settings.connect_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_from_descriptor_missing_file() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let result =
            ConsumerSettings::from_descriptor(&KafkaConfig::default(), &dir.path().join("none"));
        assert!(matches!(result, Err(ConsumerError::Credentials(_))));
    }
}
