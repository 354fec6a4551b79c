//! Configuration loader and validator for the news collector.
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_BATCH_SIZE: usize = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub database: Database,
    pub news_crawler: NewsCrawler,
    #[serde(default)]
    pub pipeline: Pipeline,
    pub sources: Vec<Source>,
}

/// Relational store settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Database {
    pub url: String,
}

/// Crawl service settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct NewsCrawler {
    pub base_url: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Pipeline {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

/// A recognized news source. `domains` lists the hosts whose links are
/// treated as full-article references for this source; empty accepts any host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Source {
    pub name: String,
    #[serde(default)]
    pub domains: Vec<String>,
}

impl Config {
    /// Database URL, preferring `DATABASE_URL` from the environment.
    pub fn database_url(&self) -> String {
        std::env::var("DATABASE_URL").unwrap_or_else(|_| self.database.url.clone())
    }

    /// Source names in dispatch priority order.
    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name.clone()).collect()
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.database.url.trim().is_empty() {
        return Err(ConfigError::Invalid("database.url must be non-empty"));
    }

    let base = cfg.news_crawler.base_url.trim();
    if base.is_empty() {
        return Err(ConfigError::Invalid("news_crawler.base_url must be non-empty"));
    }
    if reqwest::Url::parse(base).is_err() {
        return Err(ConfigError::Invalid("news_crawler.base_url must be a valid URL"));
    }
    if cfg.news_crawler.timeout_secs == Some(0) {
        return Err(ConfigError::Invalid("news_crawler.timeout_secs must be > 0"));
    }

    if cfg.pipeline.batch_size == 0 {
        return Err(ConfigError::Invalid("pipeline.batch_size must be > 0"));
    }

    if cfg.sources.is_empty() {
        return Err(ConfigError::Invalid("sources must list at least one source"));
    }
    let mut seen = HashSet::new();
    for source in &cfg.sources {
        if source.name.trim().is_empty() {
            return Err(ConfigError::Invalid("sources[].name must be non-empty"));
        }
        if !seen.insert(source.name.as_str()) {
            return Err(ConfigError::Invalid("sources[].name must be unique"));
        }
        if source.domains.iter().any(|d| d.trim().is_empty()) {
            return Err(ConfigError::Invalid("sources[].domains must not contain empty entries"));
        }
    }

    Ok(())
}

/// Returns the example YAML content shipped as `config.yaml`.
pub fn example() -> &'static str {
    r#"database:
  url: "sqlite://./data/news.db"

news_crawler:
  base_url: "http://localhost:8000/"
  timeout_secs: 120

pipeline:
  batch_size: 30

sources:
  - name: "IRNA"
    domains: ["irna.ir"]
  - name: "ISNA"
    domains: ["isna.ir"]
  - name: "FARS"
    domains: ["farsnews.ir"]
  - name: "JAHAN_FOURI"
    domains: []
"#
}
