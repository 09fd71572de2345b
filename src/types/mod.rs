use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

// ============= Search Types =============

/// Parameters of one search request, as received from the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchQuery {
    pub query: String,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_sortby")]
    pub sortby: String,
    #[serde(default = "default_type_query")]
    pub type_query: String,
    #[serde(default)]
    pub start: usize,
    #[serde(default = "default_sortorder")]
    pub sortorder: String,
}

fn default_max_results() -> usize {
    10
}

fn default_sortby() -> String {
    "relevance".to_string()
}

fn default_type_query() -> String {
    "all".to_string()
}

fn default_sortorder() -> String {
    "descending".to_string()
}

impl SearchQuery {
    /// Build a query with the default paging and ordering parameters.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            max_results: default_max_results(),
            sortby: default_sortby(),
            type_query: default_type_query(),
            start: 0,
            sortorder: default_sortorder(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Author {
    pub name: String,
}

/// A normalized search hit, independent of the source it came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResultItem {
    pub id: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub authors: Vec<Author>,
    pub published: Option<String>,
    pub categories: Vec<String>,
    pub primary_category: String,
    pub pdf_url: String,
    pub url: String,
    pub source: String,
    /// Query relevance in `[0, 1]`, rounded to two decimals.
    pub relevance: f64,
    /// Source-specific optional fields (doi, comment, journal_ref, ...).
    #[serde(flatten, default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

// ============= Progress Events =============

/// Discriminant of a [`ProgressEvent`], used on the wire as the `status` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressKind {
    Started,
    Processing,
    Results,
    Timeout,
    Error,
    Completed,
    Summary,
}

impl ProgressKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressKind::Started => "started",
            ProgressKind::Processing => "processing",
            ProgressKind::Results => "results",
            ProgressKind::Timeout => "timeout",
            ProgressKind::Error => "error",
            ProgressKind::Completed => "completed",
            ProgressKind::Summary => "summary",
        }
    }
}

/// Payload carried by each kind of progress event.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressDetail {
    Started,
    Processing,
    Results { items: Vec<SearchResultItem> },
    Timeout { message: String },
    Error { message: String },
    Completed { count: usize },
    Summary {
        sources_searched: usize,
        total_results: usize,
        elapsed: Duration,
    },
}

/// One step of a supervised search, emitted in order to the client channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub source: String,
    pub detail: ProgressDetail,
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn new(source: impl Into<String>, detail: ProgressDetail) -> Self {
        Self {
            source: source.into(),
            detail,
            timestamp: Utc::now(),
        }
    }

    pub fn kind(&self) -> ProgressKind {
        match self.detail {
            ProgressDetail::Started => ProgressKind::Started,
            ProgressDetail::Processing => ProgressKind::Processing,
            ProgressDetail::Results { .. } => ProgressKind::Results,
            ProgressDetail::Timeout { .. } => ProgressKind::Timeout,
            ProgressDetail::Error { .. } => ProgressKind::Error,
            ProgressDetail::Completed { .. } => ProgressKind::Completed,
            ProgressDetail::Summary { .. } => ProgressKind::Summary,
        }
    }
}

// ============= Summarization Types =============

/// One incremental piece of generated text plus the running total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFragment {
    pub session_token: String,
    pub content: String,
    pub accumulated: String,
}

/// The five-category extraction of a document's pedagogical content.
///
/// All five lists are always present, even when extraction failed.
/// Keys the model returns beyond the five categories are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredResult {
    #[serde(default)]
    pub main_ideas: Vec<String>,
    #[serde(default)]
    pub methods: Vec<String>,
    #[serde(default)]
    pub comparisons: Vec<String>,
    #[serde(default)]
    pub algorithms: Vec<String>,
    #[serde(default)]
    pub other: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten, default)]
    pub extra: BTreeMap<String, Value>,
}

impl StructuredResult {
    pub const CATEGORIES: [&'static str; 5] =
        ["main_ideas", "methods", "comparisons", "algorithms", "other"];

    /// The all-empty result.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The all-empty result annotated with an error message.
    pub fn with_error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn category(&self, name: &str) -> Option<&[String]> {
        match name {
            "main_ideas" => Some(&self.main_ideas),
            "methods" => Some(&self.methods),
            "comparisons" => Some(&self.comparisons),
            "algorithms" => Some(&self.algorithms),
            "other" => Some(&self.other),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        Self::CATEGORIES
            .iter()
            .all(|c| self.category(c).is_none_or(|v| v.is_empty()))
            && self.extra.is_empty()
    }
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Network failure or timeout reaching a search source or the generative service.
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// Malformed frame from an upstream protocol.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The generative service answered with a non-success status.
    #[error("Upstream call failed with status {status}: {body}")]
    UpstreamCallFailed { status: u16, body: String },

    /// Session token absent from the registry or its channel already closed.
    #[error("Channel unavailable: {0}")]
    ChannelUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Connectivity(err.to_string())
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let status = match &self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Connectivity(_)
            | AppError::Protocol(_)
            | AppError::UpstreamCallFailed { .. } => StatusCode::BAD_GATEWAY,
            AppError::ChannelUnavailable(_) => StatusCode::CONFLICT,
            AppError::Config(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({
            "error": self.to_string()
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
