use super::LinkExtractor;
use crate::config::Source;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use std::collections::{HashMap, HashSet};

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://[^\s<>"'()\[\]{}«»]+"#).expect("valid url regex"));

/// Punctuation that commonly trails a link in running text.
const TRAILING: &[char] = &['.', ',', ';', ':', '!', '?', '،', '؛', '؟', '…'];

/// Extracts article links whose host belongs to the record's source.
#[derive(Debug, Clone, Default)]
pub struct SourceLinkExtractor {
    domains: HashMap<String, Vec<String>>,
}

impl SourceLinkExtractor {
    pub fn new(sources: &[Source]) -> Self {
        let domains = sources
            .iter()
            .map(|s| {
                let hosts = s
                    .domains
                    .iter()
                    .map(|d| d.trim().trim_start_matches("www.").to_lowercase())
                    .collect();
                (s.name.clone(), hosts)
            })
            .collect();
        Self { domains }
    }

    fn host_allowed(&self, source: &str, host: &str) -> bool {
        let Some(allowed) = self.domains.get(source) else {
            return true;
        };
        if allowed.is_empty() {
            return true;
        }
        let host = host.to_lowercase();
        allowed
            .iter()
            .any(|d| host == *d || host.ends_with(&format!(".{}", d)))
    }
}

impl LinkExtractor for SourceLinkExtractor {
    fn extract(&self, content: &str, source: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for m in URL_RE.find_iter(content) {
            let candidate = m.as_str().trim_end_matches(TRAILING);
            let Ok(url) = Url::parse(candidate) else {
                continue;
            };
            let Some(host) = url.host_str() else {
                continue;
            };
            if !self.host_allowed(source, host) {
                continue;
            }
            if seen.insert(candidate.to_string()) {
                out.push(candidate.to_string());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> SourceLinkExtractor {
        SourceLinkExtractor::new(&[
            Source {
                name: "IRNA".into(),
                domains: vec!["irna.ir".into()],
            },
            Source {
                name: "JAHAN_FOURI".into(),
                domains: vec![],
            },
        ])
    }

    #[test]
    fn no_links_in_plain_text() {
        let ex = extractor();
        assert!(ex.extract("خبر کوتاه بدون لینک", "IRNA").is_empty());
    }

    #[test]
    fn keeps_source_domain_and_subdomains() {
        let ex = extractor();
        let text = "متن خبر https://www.irna.ir/news/85012345/ و https://example.com/x";
        assert_eq!(
            ex.extract(text, "IRNA"),
            vec!["https://www.irna.ir/news/85012345/".to_string()]
        );
    }

    #[test]
    fn trims_trailing_punctuation_and_dedups() {
        let ex = extractor();
        let text = "see http://irna.ir/a1. again http://irna.ir/a1، and (http://irna.ir/a2)";
        assert_eq!(
            ex.extract(text, "IRNA"),
            vec!["http://irna.ir/a1".to_string(), "http://irna.ir/a2".to_string()]
        );
    }

    #[test]
    fn open_sources_accept_any_host() {
        let ex = extractor();
        let text = "https://t.me/jahanfouri/1234 https://other.example/b";
        assert_eq!(ex.extract(text, "JAHAN_FOURI").len(), 2);
        // unknown sources are not filtered either
        assert_eq!(ex.extract(text, "UNKNOWN").len(), 2);
    }

    #[test]
    fn lookalike_hosts_rejected() {
        let ex = extractor();
        assert!(ex.extract("https://notirna.ir/x", "IRNA").is_empty());
    }
}
