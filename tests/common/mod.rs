//! Shared fixtures for the integration tests.

#![allow(dead_code)]

pub mod mocks;

use alejandria::llm::GenerativeClient;
use alejandria::utils::toml_config::DispatchMode;
use alejandria::{AppConfig, AppState, ConfigManager, HttpDocumentStore, QuerySupervisor, SessionRegistry, Summarizer};
use mocks::{MockSource, SourceBehavior};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Render text deltas as an upstream event stream, terminated by `[DONE]`.
pub fn sse_body(deltas: &[&str]) -> String {
    let mut body = String::new();
    for delta in deltas {
        let chunk = json!({"choices": [{"delta": {"content": delta}}]});
        body.push_str(&format!("data: {chunk}\n\n"));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

/// Mount a streaming chat-completions endpoint on `server`.
pub async fn mount_stream(server: &MockServer, deltas: &[&str]) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse_body(deltas), "text/event-stream"),
        )
        .mount(server)
        .await;
}

/// Mount a failing chat-completions endpoint on `server`.
pub async fn mount_failure(server: &MockServer, status: u16, body: &str) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

/// Config pointing the generative client at `llm_base_url`.
pub fn test_config(llm_base_url: &str, dispatch: DispatchMode) -> AppConfig {
    let mut config = AppConfig::default();
    config.llm.base_url = llm_base_url.to_string();
    config.llm.request_timeout_secs = 10;
    config.summarizer.dispatch = dispatch;
    config
}

/// Application state with a mock search source and a real client
/// talking to `llm_base_url`.
pub fn test_state(
    llm_base_url: &str,
    dispatch: DispatchMode,
    source: SourceBehavior,
    deadline: Duration,
) -> AppState {
    let config = test_config(llm_base_url, dispatch);
    let sessions = SessionRegistry::new();

    let supervisor =
        QuerySupervisor::new(deadline).with_source(Arc::new(MockSource::new("arxiv", source)));
    let client = GenerativeClient::new(&config.llm, None).expect("client builds");
    let documents =
        HttpDocumentStore::new("alejandria-tests", Duration::from_secs(5)).expect("store builds");
    let summarizer = Summarizer::new(
        Arc::new(client),
        Arc::new(documents),
        sessions.clone(),
        &config.summarizer,
    );

    AppState {
        config_manager: Arc::new(ConfigManager::from_config(config)),
        sessions,
        supervisor: Arc::new(supervisor),
        summarizer: Arc::new(summarizer),
    }
}
