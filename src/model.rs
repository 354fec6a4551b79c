use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Self-contained item ready to be stored as short news.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CleanedNews {
    pub source: String,
    pub content: String,
    pub published_date: DateTime<Utc>,
}

/// Article body returned by the crawl service for a single link.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FetchedArticle {
    pub title: String,
    pub body: String,
}
