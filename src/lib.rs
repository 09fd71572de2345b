//! # Alejandria - research search and summarization relay
//!
//! A server that lets a client search research papers and summarize them
//! with an LLM, streaming progress over a WebSocket as it happens.
//!
//! ## Overview
//!
//! A client opens `GET /ws/search` and receives a session token (`ws_id`).
//! Search requests sent over the socket run through the [`QuerySupervisor`],
//! which bounds each source fetch by a deadline and reports every step as a
//! progress event. A separate `POST /extract-ideas` call summarizes one
//! document; given the `ws_id` it runs in the background and relays the
//! model's output to that socket token by token, even from a worker thread
//! that owns no async runtime.
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use alejandria::{AppState, ConfigManager, api::routes::app};
//! use std::sync::Arc;
//!
//! let config_manager = Arc::new(ConfigManager::new("alejandria.toml")?);
//! let state = AppState::from_config_manager(config_manager)?;
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8100").await?;
//! axum::serve(listener, app(state)).await?;
//! ```
//!
//! ## Modules
//!
//! - [`session`] - session token registry and cross-context channel handles
//! - [`search`] - query supervisor, sources, relevance scoring
//! - [`summarize`] - upstream relay, extraction, summarization dispatch
//! - [`consolidate`] - merging summarized documents
//! - [`llm`] - upstream generative service client
//! - [`api`] - HTTP and WebSocket surface
//! - [`types`] - shared data model and errors

/// HTTP and WebSocket API.
pub mod api;
/// Command-line interface.
pub mod cli;
/// Multi-document consolidation.
pub mod consolidate;
/// Generative service client.
pub mod llm;
/// Research-topic search.
pub mod search;
/// Session token registry.
pub mod session;
/// Document summarization.
pub mod summarize;
/// Core types and errors.
pub mod types;
/// Configuration utilities.
pub mod utils;

pub use search::{ArxivSource, QuerySupervisor, SearchSource};
pub use session::{ChannelHandle, SessionRegistry};
pub use summarize::{HttpDocumentStore, Summarizer};
pub use types::{AppError, Result};
pub use utils::toml_config::{AppConfig, ConfigManager};

use crate::llm::GenerativeClient;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// TOML configuration with hot-reload support
    pub config_manager: Arc<ConfigManager>,
    /// Live WebSocket sessions by token
    pub sessions: SessionRegistry,
    /// Search supervisor with its registered sources
    pub supervisor: Arc<QuerySupervisor>,
    /// Summarization dispatcher
    pub summarizer: Arc<Summarizer>,
}

impl AppState {
    /// Wire the default ArXiv source, HTTP document store and LLM client from config.
    pub fn from_config_manager(config_manager: Arc<ConfigManager>) -> Result<Self> {
        let config = config_manager.config();
        let sessions = SessionRegistry::new();

        let supervisor = QuerySupervisor::new(config.search.timeout())
            .with_source(Arc::new(ArxivSource::from_config(&config.search)?));

        let client = GenerativeClient::from_config(&config.llm)?;
        if config.llm.api_key().is_none() {
            tracing::warn!(
                env = %config.llm.api_key_env,
                "no LLM API key set; requests are sent without authorization"
            );
        }

        let documents = HttpDocumentStore::new(
            &config.search.user_agent,
            std::time::Duration::from_secs(config.llm.request_timeout_secs),
        )?;
        let summarizer = Summarizer::new(
            Arc::new(client),
            Arc::new(documents),
            sessions.clone(),
            &config.summarizer,
        );

        Ok(Self {
            config_manager,
            sessions,
            supervisor: Arc::new(supervisor),
            summarizer: Arc::new(summarizer),
        })
    }
}
