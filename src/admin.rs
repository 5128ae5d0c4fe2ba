//! Topic administration over the admin REST API.
//!
//! The consumer must never subscribe to a topic that does not exist, so
//! startup runs [`ensure_topic_exists`] first: list the topics, and create
//! the configured one only when it is missing.
//!
//! # Example
//!
//! ```rust,no_run
//! use cachetrigger::admin::{ensure_topic_exists, AdminClient};
//! use cachetrigger::config::AdminConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AdminConfig {
//!     url: "https://admin.example.com".to_string(),
//!     api_key: "key".to_string(),
//!     ..Default::default()
//! };
//! let admin = AdminClient::new(&config)?;
//! let status = ensure_topic_exists(&admin, "api").await?;
//! println!("{:?}", status);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::AdminConfig;

/// Header carrying the admin API key.
pub const API_KEY_HEADER: &str = "X-Auth-Token";

/// Path of the topic collection, relative to the admin base URL.
pub const TOPICS_PATH: &str = "/admin/topics";

/// Errors that can occur while provisioning the topic.
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// The HTTP client could not be built.
    #[error("Failed to build admin HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The list-topics request did not complete.
    #[error("List topics request failed: {0}")]
    ListRequest(#[source] reqwest::Error),

    /// The list-topics endpoint answered with a non-success status.
    #[error("List topics returned HTTP {status}: {body}")]
    ListApi {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The topic listing was not a JSON array of topic descriptors.
    #[error("Malformed topic listing: {0}")]
    ListMalformed(String),

    /// The create-topic request did not complete.
    #[error("Create topic request failed: {0}")]
    CreateRequest(#[source] reqwest::Error),

    /// The create-topic endpoint answered with a non-success status and no
    /// error message.
    #[error("Create topic returned HTTP {status}: {body}")]
    CreateApi {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The create-topic response was not valid JSON.
    #[error("Malformed create topic response: {0}")]
    CreateMalformed(String),

    /// The admin service reported an error creating the topic.
    #[error("{0}")]
    Rejected(String),
}

impl ProvisionError {
    /// Whether the failure happened before any create call was attempted.
    pub fn is_listing_failure(&self) -> bool {
        matches!(
            self,
            Self::Client(_) | Self::ListRequest(_) | Self::ListApi { .. } | Self::ListMalformed(_)
        )
    }
}

/// One entry of the topic listing. Fields other than `name` are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicDescriptor {
    /// Topic name.
    pub name: String,
}

/// Body sent to create a topic.
#[derive(Debug, Clone, Serialize)]
pub struct CreateTopicRequest {
    /// Topic name.
    pub name: String,
    /// Partition count.
    pub partitions: u32,
}

/// Response to a create-topic call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CreateTopicResponse {
    /// Error reported by the admin service; `null`, absent and `""` all
    /// mean success. Whitespace alone is still an error.
    #[serde(rename = "errorMessage", default)]
    pub error_message: Option<String>,
}

impl CreateTopicResponse {
    /// The reported error, only when present and non-empty.
    pub fn error(&self) -> Option<&str> {
        self.error_message
            .as_deref()
            .filter(|message| !message.is_empty())
    }
}

/// Outcome of [`ensure_topic_exists`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicStatus {
    /// The topic was already listed; nothing was created.
    AlreadyExists,
    /// The topic was missing and has been created.
    Created,
}

/// Operations the provisioner needs from the admin service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TopicAdmin: Send + Sync {
    /// Lists existing topics in the order returned by the service.
    async fn list_topics(&self) -> Result<Vec<TopicDescriptor>, ProvisionError>;

    /// Requests creation of `name`.
    ///
    /// A response carrying an error message is returned as `Ok`; judging it
    /// is the caller's job.
    async fn create_topic(&self, name: &str) -> Result<CreateTopicResponse, ProvisionError>;
}

/// Ensures `topic` exists, creating it when the listing lacks it.
///
/// Names are compared exactly (case-sensitive). At most one create call is
/// issued.
///
/// # Errors
///
/// Every error is fatal for startup: listing failures, create transport
/// failures, and a non-empty `errorMessage` (`ProvisionError::Rejected`).
pub async fn ensure_topic_exists<A>(admin: &A, topic: &str) -> Result<TopicStatus, ProvisionError>
where
    A: TopicAdmin + ?Sized,
{
    let topics = admin.list_topics().await?;
    debug!(count = topics.len(), "Admin API listed topics");

    if topics.iter().any(|t| t.name == topic) {
        info!(topic = %topic, "Topic already exists");
        return Ok(TopicStatus::AlreadyExists);
    }

    info!(topic = %topic, "Creating topic");
    let response = admin.create_topic(topic).await?;

    if let Some(message) = response.error() {
        return Err(ProvisionError::Rejected(message.trim().to_string()));
    }

    info!(topic = %topic, "Successfully created topic");
    Ok(TopicStatus::Created)
}

/// HTTP client for the admin REST API.
pub struct AdminClient {
    client: Client,
    base_url: String,
    api_key: String,
    partitions: u32,
}

impl AdminClient {
    /// Creates a client from the admin configuration.
    ///
    /// # Errors
    ///
    /// Returns `ProvisionError::Client` if the HTTP client cannot be built.
    pub fn new(config: &AdminConfig) -> Result<Self, ProvisionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(ProvisionError::Client)?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            partitions: config.partitions,
        })
    }

    fn build_request(&self, method: reqwest::Method) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, TOPICS_PATH);
        self.client
            .request(method, &url)
            .header(API_KEY_HEADER, &self.api_key)
            .header("Accept", "application/json")
    }
}

#[async_trait]
impl TopicAdmin for AdminClient {
    async fn list_topics(&self) -> Result<Vec<TopicDescriptor>, ProvisionError> {
        let response = self
            .build_request(reqwest::Method::GET)
            .send()
            .await
            .map_err(ProvisionError::ListRequest)?;

        let status = response.status();
        let body = response.text().await.map_err(ProvisionError::ListRequest)?;

        if !status.is_success() {
            return Err(ProvisionError::ListApi {
                status: status.as_u16(),
                body,
            });
        }

        debug!(body = %body, "Admin REST topic listing");
        serde_json::from_str(&body).map_err(|e| ProvisionError::ListMalformed(e.to_string()))
    }

    async fn create_topic(&self, name: &str) -> Result<CreateTopicResponse, ProvisionError> {
        let request = CreateTopicRequest {
            name: name.to_string(),
            partitions: self.partitions,
        };

        let response = self
            .build_request(reqwest::Method::POST)
            .json(&request)
            .send()
            .await
            .map_err(ProvisionError::CreateRequest)?;

        let status = response.status();
        let body = response.text().await.map_err(ProvisionError::CreateRequest)?;
        debug!(status = status.as_u16(), body = %body, "Admin REST create topic response");

        let parsed = if body.trim().is_empty() {
            Ok(CreateTopicResponse::default())
        } else {
            serde_json::from_str::<CreateTopicResponse>(&body)
        };

        match parsed {
            Ok(result) if status.is_success() || result.error().is_some() => Ok(result),
            Ok(_) => Err(ProvisionError::CreateApi {
                status: status.as_u16(),
                body,
            }),
            Err(_) if !status.is_success() => Err(ProvisionError::CreateApi {
                status: status.as_u16(),
                body,
            }),
            Err(e) => Err(ProvisionError::CreateMalformed(e.to_string())),
        }
    }
}
