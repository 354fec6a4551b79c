//! Database entity models used by repositories.
//!
//! Keep these structs focused on the data returned by queries. Business logic
//! should live in higher layers.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Row of the upstream `raw_news` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct RawNewsRecord {
    pub id: i64,
    pub source: String,
    pub content: String,
    pub published_date: DateTime<Utc>,
    pub has_processed: bool,
}

/// Row of the `short_news` destination table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct ShortNewsRow {
    pub id: i64,
    pub source: String,
    pub timestamp: DateTime<Utc>,
    pub body: String,
}

/// Row of the `long_news` destination table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct LongNewsRow {
    pub id: i64,
    pub source: String,
    pub timestamp: DateTime<Utc>,
    pub news_link: String,
    pub title: String,
    pub body: String,
}
