//! Mock search sources and progress sinks.

use alejandria::search::EventSink;
use alejandria::types::{AppError, ProgressEvent, ProgressKind, Result, SearchQuery, SearchResultItem};
use alejandria::SearchSource;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;

/// How a [`MockSource`] answers a fetch.
#[derive(Debug, Clone)]
pub enum SourceBehavior {
    /// Return this many items titled after the query.
    Items(usize),
    /// Fail with a connectivity error.
    Fail,
    /// Never answer within any reasonable deadline.
    Hang,
    /// Answer with `n` items after a delay.
    Slow(Duration, usize),
}

pub struct MockSource {
    name: String,
    behavior: SourceBehavior,
}

impl MockSource {
    pub fn new(name: &str, behavior: SourceBehavior) -> Self {
        Self {
            name: name.to_string(),
            behavior,
        }
    }
}

pub fn item(id: &str, title: &str) -> SearchResultItem {
    SearchResultItem {
        id: id.to_string(),
        title: title.to_string(),
        abstract_text: format!("An abstract about {title}."),
        authors: vec![],
        published: Some("2024-01-31".to_string()),
        categories: vec!["cs.CL".to_string()],
        primary_category: "cs.CL".to_string(),
        pdf_url: format!("https://example.org/pdf/{id}"),
        url: format!("https://example.org/abs/{id}"),
        source: "Mock".to_string(),
        relevance: 1.0,
        extra: Default::default(),
    }
}

fn items(query: &SearchQuery, n: usize) -> Vec<SearchResultItem> {
    (0..n)
        .map(|i| item(&format!("mock-{i}"), &query.query))
        .collect()
}

#[async_trait]
impl SearchSource for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, query: &SearchQuery) -> Result<Vec<SearchResultItem>> {
        match &self.behavior {
            SourceBehavior::Items(n) => Ok(items(query, *n)),
            SourceBehavior::Fail => Err(AppError::Connectivity("connection refused".to_string())),
            SourceBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Vec::new())
            }
            SourceBehavior::Slow(delay, n) => {
                tokio::time::sleep(*delay).await;
                Ok(items(query, *n))
            }
        }
    }
}

/// Sink that records every progress event it receives.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().clone()
    }

    /// `(source, kind)` pairs in emission order.
    pub fn trace(&self) -> Vec<(String, ProgressKind)> {
        self.events
            .lock()
            .iter()
            .map(|e| (e.source.clone(), e.kind()))
            .collect()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn emit(&self, event: ProgressEvent) {
        self.events.lock().push(event);
    }
}
