//! Summarization trigger.
//!
//! A request that names a live session is accepted immediately and the
//! relay runs in the background, reporting only through that session's
//! channel. Any other request streams the upstream text straight back in
//! the response body, followed by the extracted JSON result.

use super::documents::{DocumentRef, DocumentStore, resolve_text, truncate_chars};
use super::relay::{body_stream, notify, notify_from_worker, relay_async, relay_blocking};
use crate::api::protocol::ServerMessage;
use crate::llm::GenerativeClient;
use crate::session::SessionRegistry;
use crate::types::{AppError, Result};
use crate::utils::toml_config::{DispatchMode, SummarizerConfig};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::io::BufReader;
use std::pin::Pin;
use std::sync::Arc;
use tokio::runtime::Handle;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an expert in the pedagogical analysis of research papers. \
Given the text of a scientific article, extract its key content: main ideas, methodologies, \
comparisons, algorithms, and anything else worth teaching. Return only a JSON object with the keys \
{\"main_ideas\": [...], \"methods\": [...], \"comparisons\": [...], \"algorithms\": [...], \"other\": [...]} \
and nothing else.";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SummarizeRequest {
    #[serde(flatten)]
    pub document: DocumentRef,
    /// Session to report progress to.
    #[serde(default)]
    pub ws_id: Option<String>,
}

pub type BodyStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

pub enum Dispatch {
    /// Running in the background; output goes to the session's channel.
    Accepted { ws_id: String },
    /// Upstream text followed by the result sentinel and JSON.
    Streaming(BodyStream),
}

impl std::fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dispatch::Accepted { ws_id } => f.debug_struct("Accepted").field("ws_id", ws_id).finish(),
            Dispatch::Streaming(_) => f.write_str("Streaming(..)"),
        }
    }
}

pub struct Summarizer {
    client: Arc<GenerativeClient>,
    documents: Arc<dyn DocumentStore>,
    sessions: SessionRegistry,
    dispatch: DispatchMode,
    system_prompt: String,
    max_document_chars: usize,
}

impl Summarizer {
    pub fn new(
        client: Arc<GenerativeClient>,
        documents: Arc<dyn DocumentStore>,
        sessions: SessionRegistry,
        config: &SummarizerConfig,
    ) -> Self {
        Self {
            client,
            documents,
            sessions,
            dispatch: config.dispatch,
            system_prompt: config
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            max_document_chars: config.max_document_chars,
        }
    }

    pub fn dispatch_mode(&self) -> DispatchMode {
        self.dispatch
    }

    /// Dispatch one summarization.
    ///
    /// With a live session the document is loaded and summarized in the
    /// background and this returns at once; load and upstream failures are
    /// reported on the session's channel.
    pub async fn summarize(&self, request: SummarizeRequest) -> Result<Dispatch> {
        let SummarizeRequest { document, ws_id } = request;
        if document.inline_text().is_none() && document.link().is_none() {
            return Err(AppError::InvalidInput(
                "No document text or link provided".to_string(),
            ));
        }

        let token = ws_id.as_deref().map(str::trim).filter(|t| !t.is_empty());

        match token {
            Some(token) if self.sessions.lookup(token).is_some() => {
                self.spawn_background(token.to_string(), document)?;
                Ok(Dispatch::Accepted {
                    ws_id: token.to_string(),
                })
            }
            _ => {
                if let Some(token) = token {
                    tracing::warn!(ws_id = %token, "session not found; streaming response directly");
                }
                let text = load_text(self.documents.as_ref(), &document, self.max_document_chars).await?;
                let response = self.client.open_stream(&self.system_prompt, &text).await?;
                Ok(Dispatch::Streaming(Box::pin(body_stream(
                    response.bytes_stream(),
                ))))
            }
        }
    }

    fn spawn_background(&self, token: String, document: DocumentRef) -> Result<()> {
        let job = BackgroundJob {
            client: Arc::clone(&self.client),
            documents: Arc::clone(&self.documents),
            sessions: self.sessions.clone(),
            system_prompt: self.system_prompt.clone(),
            max_document_chars: self.max_document_chars,
            token,
            document,
        };

        tracing::info!(ws_id = %job.token, mode = ?self.dispatch, "dispatching background summarization");
        match self.dispatch {
            DispatchMode::WorkerThread => {
                // Document loading is async; the worker drives it on this runtime.
                let runtime = Handle::try_current()
                    .map_err(|e| AppError::Internal(format!("No runtime for document loading: {}", e)))?;
                std::thread::Builder::new()
                    .name("summarizer-worker".to_string())
                    .spawn(move || job.run_blocking(runtime))
                    .map_err(|e| AppError::Internal(format!("Failed to spawn worker: {}", e)))?;
            }
            DispatchMode::Task => {
                tokio::spawn(job.run());
            }
        }
        Ok(())
    }
}

/// Resolve a document's text and cut it to `max_chars` characters.
async fn load_text(documents: &dyn DocumentStore, document: &DocumentRef, max_chars: usize) -> Result<String> {
    let text = resolve_text(documents, document).await?;
    Ok(truncate_chars(&text, max_chars).to_string())
}

struct BackgroundJob {
    client: Arc<GenerativeClient>,
    documents: Arc<dyn DocumentStore>,
    sessions: SessionRegistry,
    system_prompt: String,
    max_document_chars: usize,
    token: String,
    document: DocumentRef,
}

impl BackgroundJob {
    async fn run(self) {
        let outcome = async {
            let text = load_text(self.documents.as_ref(), &self.document, self.max_document_chars).await?;
            let response = self.client.open_stream(&self.system_prompt, &text).await?;
            Ok::<_, AppError>(relay_async(response.bytes_stream(), &self.token, &self.sessions).await)
        }
        .await;

        let message = match outcome {
            Ok(outcome) => ServerMessage::LlmResult {
                ws_id: self.token.clone(),
                result: outcome.result,
            },
            Err(e) => self.failure(e),
        };
        notify(&self.sessions, &self.token, message).await;
    }

    fn run_blocking(self, runtime: Handle) {
        let outcome = runtime
            .block_on(load_text(self.documents.as_ref(), &self.document, self.max_document_chars))
            .and_then(|text| self.client.open_stream_blocking(&self.system_prompt, &text))
            .map(|response| relay_blocking(BufReader::new(response), &self.token, &self.sessions));

        let message = match outcome {
            Ok(outcome) => ServerMessage::LlmResult {
                ws_id: self.token.clone(),
                result: outcome.result,
            },
            Err(e) => self.failure(e),
        };
        notify_from_worker(&self.sessions, &self.token, message);
    }

    fn failure(&self, error: AppError) -> ServerMessage {
        tracing::warn!(ws_id = %self.token, error = %error, "summarization failed");
        ServerMessage::session_error(&self.token, error.to_string())
    }
}

