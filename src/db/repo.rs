use super::model::{LongNewsRow, RawNewsRecord, ShortNewsRow};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, instrument};

pub type Pool = SqlitePool;

/// Errors raised by the write path for cleaned news.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("validation error: {0}")]
    Validation(&'static str),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

const CREATE_SHORT_NEWS: &str = r#"
CREATE TABLE IF NOT EXISTS short_news (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source VARCHAR(255),
    timestamp TIMESTAMP,
    body TEXT
)"#;

const CREATE_LONG_NEWS: &str = r#"
CREATE TABLE IF NOT EXISTS long_news (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source VARCHAR(255),
    timestamp TIMESTAMP,
    news_link TEXT,
    title TEXT,
    body TEXT
)"#;

/// Open the single shared connection used for a whole run.
pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect(&normalized)
        .await
        .with_context(|| format!("failed to connect to {}", normalized))?;
    Ok(pool)
}

/// For a file-backed SQLite URL, ensure the parent directory exists and ask
/// for the file to be created when missing. Other URLs pass through untouched.
fn prepare_sqlite_url(url: &str) -> String {
    if !url.starts_with("sqlite:") {
        return url.to_string();
    }

    // In-memory URLs like sqlite::memory: or sqlite::memory:?cache=shared
    if url.starts_with("sqlite::memory") {
        return url.to_string();
    }

    let rest = &url["sqlite:".len()..];
    let path_with_query = rest.strip_prefix("//").unwrap_or(rest);

    let (path_part, query_part) = match path_with_query.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path_with_query, None),
    };

    if path_part.is_empty() {
        return url.to_string();
    }

    if let Some(parent) = std::path::Path::new(path_part).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    // The database file itself is created on first connect.
    let mut query = query_part.map(str::to_string).unwrap_or_default();
    if !query.split('&').any(|kv| kv.starts_with("mode=")) {
        if !query.is_empty() {
            query.push('&');
        }
        query.push_str("mode=rwc");
    }

    format!("sqlite://{}?{}", path_part, query)
}

/// Create the `short_news` and `long_news` tables if they do not exist.
/// `raw_news` belongs to the upstream ingester and is never created here.
#[instrument(skip_all)]
pub async fn ensure_schema(pool: &Pool) -> Result<()> {
    let mut tx = pool.begin().await?;
    for ddl in [CREATE_SHORT_NEWS, CREATE_LONG_NEWS] {
        sqlx::query(ddl).execute(&mut *tx).await?;
    }
    tx.commit().await.context("failed to create destination tables")?;
    Ok(())
}

/// All raw records that have not been processed yet, in id order.
#[instrument(skip_all)]
pub async fn fetch_unprocessed(pool: &Pool) -> Result<Vec<RawNewsRecord>> {
    let rows = sqlx::query_as::<_, RawNewsRecord>(
        "SELECT id, source, content, published_date, has_processed FROM raw_news WHERE has_processed = FALSE ORDER BY id",
    )
    .fetch_all(pool)
    .await
    .context("failed to read raw_news")?;
    Ok(rows)
}

/// Flag exactly the given records as processed in a single statement.
/// Returns the number of rows updated; an empty input touches nothing.
#[instrument(skip_all, fields(count = ids.len()))]
pub async fn mark_processed(pool: &Pool, ids: &[i64]) -> Result<u64> {
    let unique: BTreeSet<i64> = ids.iter().copied().collect();
    if unique.is_empty() {
        return Ok(0);
    }

    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new("UPDATE raw_news SET has_processed = TRUE WHERE id IN (");
    let mut separated = qb.separated(", ");
    for id in &unique {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let res = qb.build().execute(pool).await?;
    debug!(updated = res.rows_affected(), "marked raw news processed");
    Ok(res.rows_affected())
}

/// Insert a news item without a link.
#[instrument(skip_all)]
pub async fn insert_short_news(
    pool: &Pool,
    source: &str,
    timestamp: DateTime<Utc>,
    body: &str,
) -> Result<i64, StoreError> {
    let rec = sqlx::query(
        "INSERT INTO short_news (source, timestamp, body) VALUES (?, ?, ?) RETURNING id",
    )
    .bind(source)
    .bind(timestamp)
    .bind(body)
    .fetch_one(pool)
    .await?;
    Ok(rec.get::<i64, _>("id"))
}

/// Insert a fetched article. A long entry must carry a non-empty title.
#[instrument(skip_all)]
pub async fn insert_long_news(
    pool: &Pool,
    source: &str,
    timestamp: DateTime<Utc>,
    title: &str,
    body: &str,
    news_link: &str,
) -> Result<i64, StoreError> {
    if title.trim().is_empty() {
        return Err(StoreError::Validation("title is required for long news"));
    }
    let rec = sqlx::query(
        "INSERT INTO long_news (source, timestamp, news_link, title, body) VALUES (?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(source)
    .bind(timestamp)
    .bind(news_link)
    .bind(title)
    .bind(body)
    .fetch_one(pool)
    .await?;
    Ok(rec.get::<i64, _>("id"))
}

/// Create a news entry: long news when a non-empty link is given, short news otherwise.
pub async fn create_news(
    pool: &Pool,
    source: &str,
    timestamp: DateTime<Utc>,
    body: &str,
    news_link: Option<&str>,
    title: Option<&str>,
) -> Result<i64, StoreError> {
    match news_link.filter(|l| !l.is_empty()) {
        Some(link) => {
            let title = title.unwrap_or_default();
            insert_long_news(pool, source, timestamp, title, body, link).await
        }
        None => insert_short_news(pool, source, timestamp, body).await,
    }
}

pub async fn list_short_news(pool: &Pool) -> Result<Vec<ShortNewsRow>> {
    let rows = sqlx::query_as::<_, ShortNewsRow>(
        "SELECT id, source, timestamp, body FROM short_news ORDER BY id",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn list_long_news(pool: &Pool) -> Result<Vec<LongNewsRow>> {
    let rows = sqlx::query_as::<_, LongNewsRow>(
        "SELECT id, source, timestamp, news_link, title, body FROM long_news ORDER BY id",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn close(pool: Pool) {
    pool.close().await;
}
