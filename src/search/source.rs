use crate::types::{Result, SearchQuery, SearchResultItem};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

/// An article as scraped from a source, before normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawArticle {
    pub title: String,
    /// Comma-separated author list as printed by the source.
    pub authors: String,
    pub summary: String,
    pub link: String,
    pub published: Option<String>,
    pub main_topics: Vec<String>,
    /// Optional fields passed through verbatim (doi, comment, journal_ref, ...).
    pub extra: BTreeMap<String, Value>,
}

/// A searchable article source.
///
/// Implementations own the request and parse steps and return normalized
/// items; the supervisor only bounds them in time and reports progress.
#[async_trait]
pub trait SearchSource: Send + Sync {
    /// Identifier used as the `source` of progress events.
    fn name(&self) -> &str;

    async fn fetch(&self, query: &SearchQuery) -> Result<Vec<SearchResultItem>>;
}
