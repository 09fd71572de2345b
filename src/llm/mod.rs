//! Upstream generative service client.
//!
//! Speaks the OpenAI-compatible streaming chat completions protocol: the
//! request carries `stream: true` and the response is a sequence of
//! `data: <json>` lines closed by `data: [DONE]`. Line decoding lives in
//! [`crate::summarize::frame`].

/// Streaming chat completion client.
pub mod client;

pub use client::{ChatMessage, ChatRequest, GenerativeClient};
