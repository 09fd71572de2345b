//! Document text retrieval for summarization.

use crate::types::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What to summarize: inline text, or a link the store can fetch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DocumentRef {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub pdf_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    /// Inline document text; when present no fetch happens.
    #[serde(default)]
    pub text: Option<String>,
}

impl DocumentRef {
    /// The link to fetch, preferring the PDF.
    pub fn link(&self) -> Option<&str> {
        self.pdf_url
            .as_deref()
            .or(self.url.as_deref())
            .map(str::trim)
            .filter(|l| !l.is_empty())
    }

    pub fn inline_text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.trim().is_empty())
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn load_text(&self, doc: &DocumentRef) -> Result<String>;
}

/// Fetches documents over HTTP, extracting text from PDFs.
pub struct HttpDocumentStore {
    client: reqwest::Client,
}

impl HttpDocumentStore {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn load_text(&self, doc: &DocumentRef) -> Result<String> {
        let link = doc
            .link()
            .ok_or_else(|| AppError::InvalidInput("No document text or link provided".to_string()))?;

        tracing::debug!(%link, "fetching document");
        let response = self.client.get(link).send().await?;
        if !response.status().is_success() {
            return Err(AppError::Connectivity(format!(
                "Document fetch returned status {}",
                response.status()
            )));
        }

        let is_pdf = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("application/pdf"));
        let bytes = response.bytes().await?;

        let text = if is_pdf || bytes.starts_with(b"%PDF") {
            // CPU-bound; keep it off the async executor.
            tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
                .await
                .map_err(|e| AppError::Internal(format!("PDF extraction task failed: {}", e)))?
                .map_err(|e| AppError::InvalidInput(format!("PDF extraction failed: {}", e)))?
        } else {
            String::from_utf8_lossy(&bytes).into_owned()
        };

        if text.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "No text could be extracted from the document".to_string(),
            ));
        }
        Ok(text)
    }
}

/// Inline text if present, otherwise whatever `store` loads.
pub async fn resolve_text(store: &dyn DocumentStore, doc: &DocumentRef) -> Result<String> {
    match doc.inline_text() {
        Some(text) => Ok(text.to_string()),
        None => store.load_text(doc).await,
    }
}

/// Keep at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
