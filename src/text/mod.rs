//! Pure text helpers applied to raw news content before storage.
//!
//! Both helpers sit behind traits so the pipeline can be driven with
//! source-specific rules or test doubles.

pub mod links;
pub mod normalize;

pub use links::SourceLinkExtractor;
pub use normalize::PersianNormalizer;

/// Finds references to full articles hosted elsewhere.
pub trait LinkExtractor: Send + Sync {
    /// Links embedded in `content` that belong to `source`, deduplicated in
    /// first-seen order. Empty when the record is self-contained.
    fn extract(&self, content: &str, source: &str) -> Vec<String>;
}

/// Language-specific cleanup applied to self-contained items.
pub trait TextNormalizer: Send + Sync {
    fn normalize(&self, text: &str) -> String;
}
