//! Upstream documentation source.
//!
//! Every call performs a fresh HTTP fetch: there is no caching and no retry.
//! Tools are invoked interactively, at human-scale frequency.

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::error::DocsError;
use super::model::{DocumentationPage, Route, TableOfContents};
use crate::core::config::DocsConfig;
use crate::core::{Error, Result};

/// Read-only access to a documentation site.
#[async_trait]
pub trait DocsSource: Send + Sync {
    /// Fetch and parse the documentation index.
    async fn list_contents(&self) -> std::result::Result<TableOfContents, DocsError>;

    /// Fetch a single page by route.
    async fn read_page(&self, route: &str) -> std::result::Result<DocumentationPage, DocsError>;
}

/// [`DocsSource`] backed by plain HTTP GETs against the documentation site.
#[derive(Debug, Clone)]
pub struct HttpDocsSource {
    client: reqwest::Client,
    base_url: String,
    index_path: String,
}

impl HttpDocsSource {
    /// Build a source from configuration.
    pub fn new(config: &DocsConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("text/plain, text/markdown"));

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| Error::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            index_path: Route::parse(&config.index_path)
                .map(|r| r.to_string())
                .map_err(|_| Error::config(format!("Invalid index path: {}", config.index_path)))?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET a URL and return its body as text.
    ///
    /// `404`/`410` map to `NotFound` when a page route is given; for the
    /// index they mean the site itself is broken.
    async fn fetch_text(
        &self,
        url: &str,
        route: Option<&Route>,
    ) -> std::result::Result<String, DocsError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            warn!("Request to {} failed: {}", url, e);
            DocsError::upstream(url, describe_request_error(&e))
        })?;

        let status = response.status();
        if matches!(status, StatusCode::NOT_FOUND | StatusCode::GONE) {
            if let Some(route) = route {
                debug!("Upstream reports {} for {}", status, route);
                return Err(DocsError::not_found(route.as_str()));
            }
        }
        if !status.is_success() {
            warn!("Upstream answered {} for {}", status, url);
            return Err(DocsError::upstream(url, format!("HTTP {}", status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| DocsError::upstream(url, describe_request_error(&e)))?;

        debug!("Fetched {} bytes from {}", body.len(), url);

        String::from_utf8(body.to_vec())
            .map_err(|_| DocsError::parse(format!("{} did not return UTF-8 text", url)))
    }
}

#[async_trait]
impl DocsSource for HttpDocsSource {
    #[instrument(skip(self))]
    async fn list_contents(&self) -> std::result::Result<TableOfContents, DocsError> {
        let url = self.url_for(&self.index_path);
        let raw = self.fetch_text(&url, None).await?;
        TableOfContents::parse(&raw)
    }

    #[instrument(skip(self))]
    async fn read_page(&self, route: &str) -> std::result::Result<DocumentationPage, DocsError> {
        let route = Route::parse(route)?;
        let url = self.url_for(route.as_str());
        let content = self.fetch_text(&url, Some(&route)).await?;
        Ok(DocumentationPage { route, content })
    }
}

fn describe_request_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "request timed out".to_string()
    } else if e.is_connect() {
        "connection failed".to_string()
    } else {
        e.to_string()
    }
}
