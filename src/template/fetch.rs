//! Fetching remote template sources

use async_trait::async_trait;

use super::registry::TemplateError;

/// Retrieves template text from a remote locator
#[async_trait]
pub trait TemplateFetcher: Send + Sync {
    /// Fetch the body behind `locator` as text
    async fn fetch(&self, locator: &str) -> Result<String, TemplateError>;
}

/// Fetches templates over HTTP(S)
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher with a default client
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fetcher using an existing client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TemplateFetcher for HttpFetcher {
    async fn fetch(&self, locator: &str) -> Result<String, TemplateError> {
        let fetch_error = |e: reqwest::Error| TemplateError::Fetch {
            locator: locator.to_string(),
            message: e.to_string(),
        };

        tracing::debug!(%locator, "fetching remote template");
        let response = self.client.get(locator).send().await.map_err(fetch_error)?;
        // The body is taken as-is whatever the status, like a browser fetch
        response.text().await.map_err(fetch_error)
    }
}
