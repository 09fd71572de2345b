//! WebSocket protocol types for client-server communication.
//!
//! Every frame is one JSON object discriminated by its `type` field.

use crate::types::{
    ProgressDetail, ProgressEvent, ProgressKind, SearchQuery, SearchResultItem, StreamFragment,
    StructuredResult,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;

/// Messages from client to server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Run a search; unspecified paging/ordering fields take their defaults.
    Search(SearchQuery),
    /// Any other `type`; acknowledged and otherwise ignored.
    #[serde(other)]
    Unknown,
}

/// Messages from server to client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Session token issued once when the connection opens.
    WsId { ws_id: String },
    /// Receipt for every inbound frame.
    Acknowledge {
        message: String,
        timestamp: DateTime<Utc>,
    },
    SearchStarted {
        message: String,
        timestamp: DateTime<Utc>,
    },
    ProcessingStarted {
        message: String,
        sources: Vec<String>,
        timestamp: DateTime<Utc>,
    },
    SearchCompleted {
        query: String,
        total_results: usize,
        sources_searched: usize,
        results: BTreeMap<String, Vec<SearchResultItem>>,
        timestamp: DateTime<Utc>,
    },
    Error {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ws_id: Option<String>,
        timestamp: DateTime<Utc>,
    },
    /// Per-source progress from the query supervisor.
    Update {
        source: String,
        status: ProgressKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        results: Option<Vec<SearchResultItem>>,
        timestamp: DateTime<Utc>,
    },
    Summary {
        sources_searched: usize,
        total_results: usize,
        time_elapsed: String,
    },
    LlmStream {
        ws_id: String,
        content: String,
        full_output: String,
    },
    LlmStreamDone { ws_id: String },
    /// Structured extraction of a finished background summarization.
    LlmResult {
        ws_id: String,
        result: StructuredResult,
    },
}

impl ServerMessage {
    pub fn acknowledge() -> Self {
        ServerMessage::Acknowledge {
            message: "Message received".to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        ServerMessage::Error {
            error: error.into(),
            ws_id: None,
            timestamp: Utc::now(),
        }
    }

    pub fn session_error(ws_id: impl Into<String>, error: impl Into<String>) -> Self {
        ServerMessage::Error {
            error: error.into(),
            ws_id: Some(ws_id.into()),
            timestamp: Utc::now(),
        }
    }

    /// The wire `type` tag of this message.
    pub fn type_name(&self) -> &'static str {
        match self {
            ServerMessage::WsId { .. } => "ws_id",
            ServerMessage::Acknowledge { .. } => "acknowledge",
            ServerMessage::SearchStarted { .. } => "search_started",
            ServerMessage::ProcessingStarted { .. } => "processing_started",
            ServerMessage::SearchCompleted { .. } => "search_completed",
            ServerMessage::Error { .. } => "error",
            ServerMessage::Update { .. } => "update",
            ServerMessage::Summary { .. } => "summary",
            ServerMessage::LlmStream { .. } => "llm_stream",
            ServerMessage::LlmStreamDone { .. } => "llm_stream_done",
            ServerMessage::LlmResult { .. } => "llm_result",
        }
    }
}

impl From<ProgressEvent> for ServerMessage {
    fn from(event: ProgressEvent) -> Self {
        let status = event.kind();
        let update = |data: Option<Value>, error: Option<String>, results| ServerMessage::Update {
            source: event.source.clone(),
            status,
            data,
            error,
            results,
            timestamp: event.timestamp,
        };

        match event.detail.clone() {
            ProgressDetail::Started | ProgressDetail::Processing => update(None, None, None),
            ProgressDetail::Results { items } => {
                update(Some(json!({ "count": items.len() })), None, Some(items))
            }
            ProgressDetail::Timeout { message } | ProgressDetail::Error { message } => {
                update(None, Some(message), None)
            }
            ProgressDetail::Completed { count } => {
                update(Some(json!({ "count": count })), None, None)
            }
            ProgressDetail::Summary {
                sources_searched,
                total_results,
                elapsed,
            } => ServerMessage::Summary {
                sources_searched,
                total_results,
                time_elapsed: format!("{:.2}s", elapsed.as_secs_f64()),
            },
        }
    }
}

impl From<StreamFragment> for ServerMessage {
    fn from(fragment: StreamFragment) -> Self {
        ServerMessage::LlmStream {
            ws_id: fragment.session_token,
            content: fragment.content,
            full_output: fragment.accumulated,
        }
    }
}
