use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;
use crate::crawler::model::{FetchBatchReq, FetchBatchResp};
use crate::model::FetchedArticle;

pub mod model;

const FETCH_PATH: &str = "news/batch";

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("invalid batch: {0}")]
    InvalidBatch(&'static str),
    #[error("invalid crawler URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("request to crawler failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("crawler returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("invalid crawler response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Fetches full articles for a batch of links from one source.
///
/// Implementations give no guarantee that every requested link appears in
/// the returned map.
#[async_trait]
pub trait CrawlService: Send + Sync {
    async fn fetch_batch(
        &self,
        source: &str,
        links: &[String],
    ) -> Result<HashMap<String, FetchedArticle>, CrawlError>;
}

#[derive(Clone)]
pub struct CrawlClient {
    http: Client,
    base_url: Url,
    max_batch: usize,
}

impl fmt::Debug for CrawlClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrawlClient")
            .field("base_url", &self.base_url)
            .field("max_batch", &self.max_batch)
            .finish_non_exhaustive()
    }
}

impl CrawlClient {
    pub fn new(base_url: Url, max_batch: usize, timeout: Option<Duration>) -> Result<Self, CrawlError> {
        let mut builder = Client::builder()
            .user_agent(concat!("news-collector/", env!("CARGO_PKG_VERSION")))
            .no_proxy();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            base_url: with_trailing_slash(base_url),
            max_batch,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self, CrawlError> {
        let base_url = Url::parse(&cfg.news_crawler.base_url)?;
        let timeout = cfg.news_crawler.timeout_secs.map(Duration::from_secs);
        Self::new(base_url, cfg.pipeline.batch_size, timeout)
    }

    pub fn build_request(&self, source: &str, links: &[String]) -> Result<reqwest::Request, CrawlError> {
        let endpoint = self.base_url.join(FETCH_PATH)?;
        let request = self
            .http
            .post(endpoint)
            .json(&FetchBatchReq { source, links })
            .build()?;
        Ok(request)
    }
}

#[async_trait]
impl CrawlService for CrawlClient {
    async fn fetch_batch(
        &self,
        source: &str,
        links: &[String],
    ) -> Result<HashMap<String, FetchedArticle>, CrawlError> {
        if links.is_empty() {
            return Err(CrawlError::InvalidBatch("links must be non-empty"));
        }
        if links.len() > self.max_batch {
            return Err(CrawlError::InvalidBatch("batch exceeds configured size"));
        }

        let request = self.build_request(source, links)?;
        debug!(url = %request.url(), source, links = links.len(), "requesting batch");
        let res = self.http.execute(request).await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            warn!(%status, source, "crawler error response");
            return Err(CrawlError::Status { status, body });
        }

        let body = res.text().await?;
        let payload: FetchBatchResp = serde_json::from_str(&body)?;
        Ok(payload.articles)
    }
}

/// `Url::join` drops the last path segment unless the base ends in `/`.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
