use std::sync::Arc;

use crate::{
    config::ScrapingConfig,
    error::{Result, ScrapeError},
    italian_date::ItalianDateParser,
    requests::{Fetch, RequestClient},
    urls::UrlBuilder,
};

/// Everything a scrape needs, built once and passed around explicitly.
///
/// Cloning is cheap: the fetcher is shared, the rest is small.
#[derive(Clone)]
pub struct ScrapingContext {
    pub urls: UrlBuilder,
    pub date_parser: ItalianDateParser,
    pub fetcher: Arc<dyn Fetch>,
    pub exam_page_size: usize,
}

impl ScrapingContext {
    /// Context configured from `UNIBO_*` env vars, talking to the real website.
    pub fn new() -> anyhow::Result<Self> {
        let scraping_config = ScrapingConfig::from_env()?;
        Ok(Self::from_config(&scraping_config)?)
    }

    pub fn from_config(config: &ScrapingConfig) -> Result<Self> {
        let request_client = RequestClient::new(config.request_timeout)?;
        Self::with_fetcher(config, Arc::new(request_client))
    }

    /// Same as [`ScrapingContext::from_config`] but with a custom fetcher.
    pub fn with_fetcher(config: &ScrapingConfig, fetcher: Arc<dyn Fetch>) -> Result<Self> {
        let date_parser = ItalianDateParser::new(&config.timezone)?;
        Ok(ScrapingContext {
            urls: UrlBuilder::new(config),
            date_parser,
            fetcher,
            exam_page_size: config.exam_page_size.max(1),
        })
    }

    pub(crate) async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.fetcher.fetch_bytes(url).await
    }

    /// Fetches `url` and decodes its body as JSON.
    pub(crate) async fn fetch_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let body = self.fetch(url).await?;
        serde_json::from_slice(&body).map_err(|e| ScrapeError::parse(url, e))
    }

    /// Fetches `url` as text, for the pages scraped by regex.
    pub(crate) async fn fetch_text(&self, url: &str) -> Result<String> {
        let body = self.fetch(url).await?;
        String::from_utf8(body).map_err(|e| ScrapeError::parse(url, e))
    }
}
