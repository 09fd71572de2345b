//! Query supervisor: time-bounded, cancellable source fetches with progress.
//!
//! Per source the emitted events follow
//! `started -> (results)? -> (timeout | error)? -> completed`, and one
//! `summary` closes the whole run. A timeout or error is a soft failure for
//! that source: it contributes an empty result set and the run goes on.
//!
//! Cancellation on timeout is best-effort. The fetch task is aborted and no
//! longer awaited, so whatever it produces afterwards is discarded.

use super::source::SearchSource;
use crate::api::protocol::ServerMessage;
use crate::session::ChannelHandle;
use crate::types::{ProgressDetail, ProgressEvent, SearchQuery, SearchResultItem};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// `source` field of the closing summary event.
pub const SUMMARY_SOURCE: &str = "all";

/// Destination of progress events.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: ProgressEvent);
}

#[async_trait]
impl EventSink for ChannelHandle {
    async fn emit(&self, event: ProgressEvent) {
        let message = ServerMessage::from(event);
        if let Err(e) = self.send(message).await {
            tracing::debug!(error = %e, "progress event dropped");
        }
    }
}

/// Outcome of one supervised run across all registered sources.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOutcome {
    pub results: BTreeMap<String, Vec<SearchResultItem>>,
    pub sources_searched: usize,
    pub total_results: usize,
    pub elapsed: Duration,
}

pub struct QuerySupervisor {
    sources: Vec<Arc<dyn SearchSource>>,
    deadline: Duration,
}

impl QuerySupervisor {
    pub fn new(deadline: Duration) -> Self {
        Self {
            sources: Vec::new(),
            deadline,
        }
    }

    pub fn register(&mut self, source: Arc<dyn SearchSource>) {
        self.sources.push(source);
    }

    pub fn with_source(mut self, source: Arc<dyn SearchSource>) -> Self {
        self.register(source);
        self
    }

    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Run `query` against every registered source, then emit one summary.
    ///
    /// A missing sink makes every emission a no-op.
    pub async fn run(&self, query: &SearchQuery, sink: Option<&dyn EventSink>) -> SearchOutcome {
        let start = Instant::now();
        let mut outcome = SearchOutcome::default();

        for source in &self.sources {
            let items = run_source(query, Arc::clone(source), self.deadline, sink).await;
            outcome.total_results += items.len();
            outcome.sources_searched += 1;
            outcome.results.insert(source.name().to_string(), items);
        }

        outcome.elapsed = start.elapsed();
        emit(
            sink,
            ProgressDetail::Summary {
                sources_searched: outcome.sources_searched,
                total_results: outcome.total_results,
                elapsed: outcome.elapsed,
            },
            SUMMARY_SOURCE,
        )
        .await;

        tracing::info!(
            query = %query.query,
            total_results = outcome.total_results,
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "search completed"
        );
        outcome
    }
}

async fn emit(sink: Option<&dyn EventSink>, detail: ProgressDetail, source: &str) {
    if let Some(sink) = sink {
        sink.emit(ProgressEvent::new(source, detail)).await;
    }
}

/// Fetch from one source within `deadline`, emitting its progress events.
///
/// Returns the fetched items, or an empty set on timeout or failure.
pub async fn run_source(
    query: &SearchQuery,
    source: Arc<dyn SearchSource>,
    deadline: Duration,
    sink: Option<&dyn EventSink>,
) -> Vec<SearchResultItem> {
    let name = source.name().to_string();
    let started = Instant::now();
    emit(sink, ProgressDetail::Started, &name).await;

    let task_query = query.clone();
    let mut task = tokio::spawn(async move { source.fetch(&task_query).await });

    let items = match tokio::time::timeout(deadline, &mut task).await {
        Ok(Ok(Ok(items))) => {
            if !items.is_empty() {
                emit(
                    sink,
                    ProgressDetail::Results {
                        items: items.clone(),
                    },
                    &name,
                )
                .await;
            }
            items
        }
        Ok(Ok(Err(e))) => {
            tracing::warn!(source = %name, error = %e, "source fetch failed");
            let message = format!("Error processing {}: {}", name, e);
            emit(sink, ProgressDetail::Error { message }, &name).await;
            Vec::new()
        }
        Ok(Err(join_err)) => {
            tracing::error!(source = %name, error = %join_err, "source fetch task failed");
            let message = format!("Error processing {}: {}", name, join_err);
            emit(sink, ProgressDetail::Error { message }, &name).await;
            Vec::new()
        }
        Err(_) => {
            task.abort();
            tracing::warn!(source = %name, deadline_ms = deadline.as_millis() as u64, "source fetch timed out");
            let message = format!("Timed out waiting for {} after {:?}", name, deadline);
            emit(sink, ProgressDetail::Timeout { message }, &name).await;
            Vec::new()
        }
    };

    emit(
        sink,
        ProgressDetail::Completed { count: items.len() },
        &name,
    )
    .await;

    tracing::debug!(
        source = %name,
        count = items.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "source finished"
    );
    items
}
