//! Page source providers
//!
//! A page source hides how directory pages are obtained (HTTP, a browser
//! driver, recorded fixtures) behind four operations: load a partition, read
//! the current page, check for a next-page control, and activate it.

use crate::config::{SourceConfig, UserAgentConfig};
use crate::records::Partition;
use crate::{ConfigError, HarvestError, Result};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// Abstract provider of directory pages
///
/// Implementations are acquired once per orchestration run and released with
/// `close` when the run ends.
#[async_trait]
pub trait PageSource: Send {
    /// Navigates to the first page of a partition
    async fn load(&mut self, partition: &Partition) -> Result<()>;

    /// Returns the markup of the current page
    async fn current_content(&mut self) -> Result<String>;

    /// Returns true if the current page offers a next-page control
    async fn has_next(&mut self) -> Result<bool>;

    /// Activates the next-page control
    async fn advance(&mut self) -> Result<()>;

    /// Address of the current page, used to resolve relative references
    fn page_url(&self) -> Option<&Url> {
        None
    }

    /// Releases the underlying handle
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Builds an HTTP client with the crawler's user agent
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> std::result::Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Page source that follows next-page anchors over plain HTTP
pub struct HttpPageSource {
    client: Client,
    url_template: String,
    next_selector: String,
    partition: Option<Partition>,
    current_url: Option<Url>,
    current_body: Option<String>,
}

impl HttpPageSource {
    pub fn new(client: Client, config: &SourceConfig) -> std::result::Result<Self, ConfigError> {
        Selector::parse(&config.next_selector).map_err(|e| {
            ConfigError::InvalidSelector(format!("'{}': {:?}", config.next_selector, e))
        })?;

        Ok(Self {
            client,
            url_template: config.url_template.clone(),
            next_selector: config.next_selector.clone(),
            partition: None,
            current_url: None,
            current_body: None,
        })
    }

    fn page_load_error(&self, message: impl Into<String>) -> HarvestError {
        HarvestError::PageLoad {
            partition: self
                .partition
                .as_ref()
                .map(|p| p.label().to_string())
                .unwrap_or_default(),
            message: message.into(),
        }
    }

    async fn navigate(&mut self, url: Url) -> Result<()> {
        tracing::debug!(url = %url, "Loading directory page");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.page_load_error(format!("GET {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.page_load_error(format!("GET {} returned HTTP {}", url, status)));
        }

        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| self.page_load_error(format!("Reading {} failed: {}", url, e)))?;

        self.current_url = Some(final_url);
        self.current_body = Some(body);
        Ok(())
    }

    /// Resolved target of the next-page anchor on the current page
    fn next_link(&self) -> Result<Option<Url>> {
        let (Some(base), Some(body)) = (&self.current_url, &self.current_body) else {
            return Err(self.page_load_error("no page loaded"));
        };

        let selector = Selector::parse(&self.next_selector)
            .map_err(|e| self.page_load_error(format!("bad next selector: {:?}", e)))?;
        let document = Html::parse_document(body);

        let controls: Vec<_> = document.select(&selector).collect();
        let next = controls
            .iter()
            .filter_map(|el| el.value().attr("href"))
            .map(str::trim)
            .filter(|href| !href.is_empty() && !href.starts_with("javascript:"))
            .find_map(|href| base.join(href).ok());

        if next.is_none() && !controls.is_empty() {
            // Postback pagers need a scripted page source
            tracing::warn!(
                partition = self.partition.as_ref().map(|p| p.label()).unwrap_or_default(),
                url = %base,
                controls = controls.len(),
                "Next-page control has no followable href; treating page as the last"
            );
        }

        Ok(next)
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn load(&mut self, partition: &Partition) -> Result<()> {
        self.partition = Some(partition.clone());
        self.current_url = None;
        self.current_body = None;

        let raw = self.url_template.replace("{partition}", partition.label());
        let url = Url::parse(&raw)?;
        self.navigate(url).await
    }

    async fn current_content(&mut self) -> Result<String> {
        self.current_body
            .clone()
            .ok_or_else(|| self.page_load_error("no page loaded"))
    }

    async fn has_next(&mut self) -> Result<bool> {
        Ok(self.next_link()?.is_some())
    }

    async fn advance(&mut self) -> Result<()> {
        let next = self
            .next_link()?
            .ok_or_else(|| self.page_load_error("no next page control"))?;
        self.navigate(next).await
    }

    fn page_url(&self) -> Option<&Url> {
        self.current_url.as_ref()
    }
}

/// Deterministic page source backed by recorded pages
///
/// Each partition maps to an ordered list of page bodies; the last page has no
/// next-page control unless `wrap_around` is set, in which case advancing past
/// it returns to the first page the way a stale pager does.
#[derive(Debug, Default)]
pub struct FixturePageSource {
    pages: HashMap<String, Vec<String>>,
    failures: HashMap<String, usize>,
    wrap_around: bool,
    current: Option<(String, usize)>,
    closed: bool,
    pages_served: usize,
}

impl FixturePageSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the pages of a partition
    pub fn with_partition<I, S>(mut self, label: &str, pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pages
            .insert(label.to_string(), pages.into_iter().map(Into::into).collect());
        self
    }

    /// Makes reading page `index` (0-based) of a partition fail
    pub fn failing_at(mut self, label: &str, index: usize) -> Self {
        self.failures.insert(label.to_string(), index);
        self
    }

    /// Keeps the next-page control active on the last page
    pub fn wrapping(mut self) -> Self {
        self.wrap_around = true;
        self
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn pages_served(&self) -> usize {
        self.pages_served
    }

    fn error(label: &str, message: impl Into<String>) -> HarvestError {
        HarvestError::PageLoad {
            partition: label.to_string(),
            message: message.into(),
        }
    }

    fn position(&self) -> Result<(&str, usize, &[String])> {
        let (label, index) = self
            .current
            .as_ref()
            .ok_or_else(|| Self::error("", "no partition loaded"))?;
        let pages = self
            .pages
            .get(label)
            .ok_or_else(|| Self::error(label, "unknown partition"))?;
        Ok((label.as_str(), *index, pages.as_slice()))
    }
}

#[async_trait]
impl PageSource for FixturePageSource {
    async fn load(&mut self, partition: &Partition) -> Result<()> {
        if self.closed {
            return Err(Self::error(partition.label(), "source already closed"));
        }
        if !self.pages.contains_key(partition.label()) {
            return Err(Self::error(partition.label(), "unknown partition"));
        }
        self.current = Some((partition.label().to_string(), 0));
        Ok(())
    }

    async fn current_content(&mut self) -> Result<String> {
        let (label, index, pages) = self.position()?;
        if self.failures.get(label) == Some(&index) {
            return Err(Self::error(label, format!("page {} failed to render", index)));
        }
        let body = pages.get(index).cloned().unwrap_or_default();
        self.pages_served += 1;
        Ok(body)
    }

    async fn has_next(&mut self) -> Result<bool> {
        let (_, index, pages) = self.position()?;
        Ok(self.wrap_around || index + 1 < pages.len())
    }

    async fn advance(&mut self) -> Result<()> {
        let (label, index, pages) = self.position()?;
        let next = if index + 1 < pages.len() {
            index + 1
        } else if self.wrap_around {
            0
        } else {
            return Err(Self::error(label, "no next page control"));
        };
        let label = label.to_string();
        self.current = Some((label, next));
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.current = None;
        Ok(())
    }
}
