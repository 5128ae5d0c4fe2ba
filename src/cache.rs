//! Downstream cache refresh.
//!
//! The poll loop only knows the [`CacheRefresher`] trait. The shipped
//! implementation POSTs to a configured refresh endpoint (for example a
//! search index `_refresh` URL) and treats any 2xx answer as done.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::CacheConfig;

/// Errors raised by a cache refresh.
#[derive(Error, Debug)]
pub enum RefreshError {
    /// The HTTP client could not be built.
    #[error("Failed to build cache HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The refresh request did not complete.
    #[error("Cache refresh request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The cache service answered with a non-success status.
    #[error("Cache refresh returned HTTP {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// Failure reported by a non-HTTP refresher.
    #[error("Cache refresh failed: {0}")]
    Other(String),
}

/// Refreshes the downstream cache. Takes no input and returns nothing.
#[async_trait]
pub trait CacheRefresher: Send + Sync {
    /// Refreshes the cache now.
    async fn refresh(&self) -> Result<(), RefreshError>;
}

/// [`CacheRefresher`] that POSTs to an HTTP endpoint.
pub struct HttpCacheRefresher {
    client: Client,
    refresh_url: String,
}

impl HttpCacheRefresher {
    /// Creates a refresher from the cache configuration.
    ///
    /// # Errors
    ///
    /// Returns `RefreshError::Client` if the HTTP client cannot be built.
    pub fn new(config: &CacheConfig) -> Result<Self, RefreshError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(RefreshError::Client)?;

        Ok(Self {
            client,
            refresh_url: config.refresh_url.clone(),
        })
    }

    /// The endpoint this refresher calls.
    pub fn refresh_url(&self) -> &str {
        &self.refresh_url
    }
}

#[async_trait]
impl CacheRefresher for HttpCacheRefresher {
    async fn refresh(&self) -> Result<(), RefreshError> {
        debug!(url = %self.refresh_url, "Sending cache refresh");

        let response = self.client.post(&self.refresh_url).send().await?;
        let status = response.status();

        if status.is_success() {
            info!(status = status.as_u16(), "Cache refreshed");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(RefreshError::Api {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn refresher_for(url: String) -> HttpCacheRefresher {
        HttpCacheRefresher::new(&CacheConfig {
            refresh_url: url,
            timeout_seconds: 5,
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_refresh_posts_to_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/inventory/_refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"_shards\":{}}"))
            .expect(1)
            .mount(&server)
            .await;

        let refresher = refresher_for(format!("{}/inventory/_refresh", server.uri()));
        refresher.refresh().await.unwrap();
    }

    #[tokio::test]
    async fn test_refresh_non_success_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("index unavailable"))
            .mount(&server)
            .await;

        let refresher = refresher_for(format!("{}/_refresh", server.uri()));
        let err = refresher.refresh().await.unwrap_err();
        match err {
            RefreshError::Api { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "index unavailable");
            }
            other => panic!("expected API error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_refresh_unreachable_is_request_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/_refresh", listener.local_addr().unwrap());
        drop(listener);

        let refresher = refresher_for(url);
        let err = refresher.refresh().await.unwrap_err();
        assert!(matches!(err, RefreshError::Request(_)));
    }
}
