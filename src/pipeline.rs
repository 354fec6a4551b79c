//! One pass over the unprocessed raw news.
//!
//! Records are split into self-contained items and stubs that point at a
//! full article. Stub links are deduplicated per source, fetched from the
//! crawl service in fixed-size batches, and stored as long news; everything
//! else is normalized and stored as short news. Every loaded record is
//! marked processed at the end, whether or not its links resolved.

use crate::config::{Config, DEFAULT_BATCH_SIZE};
use crate::crawler::{CrawlClient, CrawlError, CrawlService};
use crate::db::{self, Pool, RawNewsRecord, StoreError};
use crate::model::{CleanedNews, FetchedArticle};
use crate::text::{LinkExtractor, PersianNormalizer, SourceLinkExtractor, TextNormalizer};
use anyhow::{Context, Result};
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Recognized sources in dispatch priority order.
    pub sources: Vec<String>,
    pub batch_size: usize,
}

impl PipelineSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            sources: cfg.source_names(),
            batch_size: cfg.pipeline.batch_size,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            sources: ["IRNA", "ISNA", "FARS", "JAHAN_FOURI"]
                .into_iter()
                .map(String::from)
                .collect(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Deduplicated links for one source, kept in first-seen order.
#[derive(Debug, Default, Clone)]
pub struct LinkSet {
    seen: HashSet<String>,
    ordered: Vec<String>,
}

impl LinkSet {
    pub fn insert(&mut self, link: String) -> bool {
        if self.seen.contains(&link) {
            return false;
        }
        self.seen.insert(link.clone());
        self.ordered.push(link);
        true
    }

    pub fn as_slice(&self) -> &[String] {
        &self.ordered
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

/// Records split by shape, grouped by their declared source.
#[derive(Debug, Default)]
pub struct Classified {
    pub short: BTreeMap<String, Vec<CleanedNews>>,
    pub links: HashMap<String, LinkSet>,
}

/// Result of dispatching a single batch.
#[derive(Debug)]
pub enum BatchOutcome {
    Fetched {
        source: String,
        index: usize,
        articles: HashMap<String, FetchedArticle>,
    },
    Failed {
        source: String,
        index: usize,
        links: usize,
        error: CrawlError,
    },
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub loaded: usize,
    pub short_saved: usize,
    pub long_saved: usize,
    pub batches_ok: usize,
    pub batches_failed: usize,
    /// Requested links for which no long entry was created.
    pub unresolved_links: usize,
    /// Sources that had links but are not in the recognized list.
    pub skipped_sources: Vec<String>,
}

pub fn classify(
    records: &[RawNewsRecord],
    extractor: &dyn LinkExtractor,
    normalizer: &dyn TextNormalizer,
) -> Classified {
    let mut out = Classified::default();
    for item in records {
        let links = extractor.extract(&item.content, &item.source);
        if links.is_empty() {
            out.short
                .entry(item.source.clone())
                .or_default()
                .push(CleanedNews {
                    source: item.source.clone(),
                    content: normalizer.normalize(&item.content),
                    published_date: item.published_date,
                });
        } else {
            let set = out.links.entry(item.source.clone()).or_default();
            for link in links {
                set.insert(link);
            }
        }
    }
    out
}

/// Consecutive, non-overlapping slices of at most `size` links.
pub fn plan_batches(links: &[String], size: usize) -> Vec<&[String]> {
    links.chunks(size.max(1)).collect()
}

pub async fn dispatch_batch(
    crawler: &dyn CrawlService,
    source: &str,
    index: usize,
    batch: &[String],
) -> BatchOutcome {
    match crawler.fetch_batch(source, batch).await {
        Ok(articles) => BatchOutcome::Fetched {
            source: source.to_string(),
            index,
            articles,
        },
        Err(error) => BatchOutcome::Failed {
            source: source.to_string(),
            index,
            links: batch.len(),
            error,
        },
    }
}

#[instrument(skip_all)]
pub async fn process_news(
    pool: &Pool,
    crawler: &dyn CrawlService,
    extractor: &dyn LinkExtractor,
    normalizer: &dyn TextNormalizer,
    settings: &PipelineSettings,
) -> Result<RunReport> {
    let mut report = RunReport::default();

    let unprocessed = db::fetch_unprocessed(pool).await?;
    if unprocessed.is_empty() {
        info!("no unprocessed news found");
        return Ok(report);
    }
    report.loaded = unprocessed.len();
    info!(count = unprocessed.len(), "loaded unprocessed news");

    let classified = classify(&unprocessed, extractor, normalizer);

    let mut skipped: Vec<String> = classified
        .links
        .keys()
        .filter(|s| !settings.sources.contains(s))
        .cloned()
        .collect();
    skipped.sort();
    for source in &skipped {
        warn!(source = %source, "source not recognized; links skipped");
    }
    report.skipped_sources = skipped;

    for source in &settings.sources {
        let Some(links) = classified.links.get(source) else {
            continue;
        };
        for (index, batch) in plan_batches(links.as_slice(), settings.batch_size)
            .into_iter()
            .enumerate()
        {
            match dispatch_batch(crawler, source, index, batch).await {
                BatchOutcome::Fetched {
                    source,
                    index,
                    articles,
                } => {
                    info!(source = %source, batch = index, fetched = articles.len(), "fetched news items");
                    report.batches_ok += 1;
                    persist_long(pool, &source, batch, &articles, &mut report).await?;
                }
                BatchOutcome::Failed {
                    source,
                    index,
                    links,
                    error,
                } => {
                    error!(source = %source, batch = index, links, %error, "failed to fetch news batch");
                    report.batches_failed += 1;
                    report.unresolved_links += links;
                }
            }
        }
    }

    for items in classified.short.values() {
        for item in items {
            db::insert_short_news(pool, &item.source, item.published_date, &item.content)
                .await
                .context("failed to store short news")?;
            report.short_saved += 1;
        }
    }

    let ids: Vec<i64> = unprocessed.iter().map(|r| r.id).collect();
    db::mark_processed(pool, &ids).await?;

    info!(
        loaded = report.loaded,
        short = report.short_saved,
        long = report.long_saved,
        batches_ok = report.batches_ok,
        batches_failed = report.batches_failed,
        unresolved = report.unresolved_links,
        "news run complete"
    );
    Ok(report)
}

/// Run once against the configured database and crawl service. The
/// connection is opened last and closed on every path after that.
pub async fn run(cfg: &Config) -> Result<RunReport> {
    let crawler = CrawlClient::from_config(cfg).context("failed to build crawl client")?;
    let extractor = SourceLinkExtractor::new(&cfg.sources);
    let settings = PipelineSettings::from_config(cfg);

    let pool = db::init_pool(&cfg.database_url()).await?;
    info!(sources = settings.sources.len(), batch_size = settings.batch_size, "starting news run");
    let result = async {
        db::ensure_schema(&pool).await?;
        process_news(&pool, &crawler, &extractor, &PersianNormalizer, &settings).await
    }
    .await;

    db::close(pool).await;
    result
}

/// Store every article returned for one batch, sorted by link. Requested
/// links with no returned entry count as unresolved.
async fn persist_long(
    pool: &Pool,
    source: &str,
    batch: &[String],
    articles: &HashMap<String, FetchedArticle>,
    report: &mut RunReport,
) -> Result<()> {
    let fetched_at = Utc::now();
    let mut entries: Vec<(&String, &FetchedArticle)> = articles.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    for (link, article) in entries {
        if !batch.contains(link) {
            debug!(source, link = %link, "crawler returned a link that was not requested");
        }
        match db::create_news(
            pool,
            source,
            fetched_at,
            &article.body,
            Some(link),
            Some(&article.title),
        )
        .await
        {
            Ok(_) => report.long_saved += 1,
            Err(StoreError::Validation(reason)) => {
                warn!(source, link = %link, reason, "fetched article rejected");
                if batch.contains(link) {
                    report.unresolved_links += 1;
                }
            }
            Err(err) => return Err(err).context("failed to store long news"),
        }
    }

    let missing = batch.iter().filter(|l| !articles.contains_key(*l)).count();
    if missing > 0 {
        debug!(source, missing, "links missing from crawler response");
        report.unresolved_links += missing;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    struct WordLinks;

    impl LinkExtractor for WordLinks {
        fn extract(&self, content: &str, _source: &str) -> Vec<String> {
            content
                .split_whitespace()
                .filter(|w| w.starts_with("http"))
                .map(String::from)
                .collect()
        }
    }

    fn record(id: i64, source: &str, content: &str) -> RawNewsRecord {
        RawNewsRecord {
            id,
            source: source.into(),
            content: content.into(),
            published_date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            has_processed: false,
        }
    }

    #[test]
    fn classify_splits_short_and_stub_records() {
        let records = vec![
            record(1, "IRNA", "كوتاه"),
            record(2, "IRNA", "see http://irna.ir/1"),
            record(3, "IRNA", "again http://irna.ir/1 http://irna.ir/2"),
            record(4, "ISNA", "خبر"),
        ];
        let c = classify(&records, &WordLinks, &PersianNormalizer);

        assert_eq!(c.short["IRNA"].len(), 1);
        assert_eq!(c.short["IRNA"][0].content, "کوتاه");
        assert_eq!(c.short["ISNA"].len(), 1);
        assert_eq!(
            c.links["IRNA"].as_slice(),
            &["http://irna.ir/1".to_string(), "http://irna.ir/2".to_string()]
        );
        assert!(!c.links.contains_key("ISNA"));
    }

    #[test]
    fn batches_cover_links_exactly_once() {
        let links: Vec<String> = (0..65).map(|i| format!("http://x/{}", i)).collect();
        let batches = plan_batches(&links, 30);
        assert_eq!(batches.len(), 3);
        assert!(batches.iter().all(|b| !b.is_empty() && b.len() <= 30));
        assert_eq!(batches[2].len(), 5);
        let joined: Vec<String> = batches.concat();
        assert_eq!(joined, links);
    }

    #[test]
    fn batch_count_is_ceiling() {
        for n in [1usize, 29, 30, 31, 60, 61] {
            let links: Vec<String> = (0..n).map(|i| i.to_string()).collect();
            assert_eq!(plan_batches(&links, 30).len(), (n + 29) / 30);
        }
        assert!(plan_batches(&[], 30).is_empty());
    }

    #[test]
    fn link_set_dedups() {
        let mut set = LinkSet::default();
        assert!(set.insert("a".into()));
        assert!(set.insert("b".into()));
        assert!(!set.insert("a".into()));
        assert_eq!(set.len(), 2);
        assert_eq!(set.as_slice(), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn settings_from_config_keep_priority_order() {
        let cfg: Config = serde_yaml::from_str(crate::config::example()).unwrap();
        let settings = PipelineSettings::from_config(&cfg);
        assert_eq!(settings, PipelineSettings::default());
    }

    #[tokio::test]
    async fn run_rejects_bad_crawler_before_touching_database() {
        let td = tempfile::tempdir().unwrap();
        let db_path = td.path().join("data").join("news.db");
        let mut cfg: Config = serde_yaml::from_str(crate::config::example()).unwrap();
        cfg.database.url = format!("sqlite://{}", db_path.display());
        cfg.news_crawler.base_url = "not a url".into();

        assert!(run(&cfg).await.is_err());
        assert!(!db_path.exists());
    }
}
