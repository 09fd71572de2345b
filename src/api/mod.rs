//! HTTP and WebSocket API
//!
//! # Endpoints
//!
//! - `GET /` - service banner
//! - `GET /health` - health check
//! - `GET /ws/search` - search WebSocket (see [`protocol`])
//! - `POST /extract-ideas` - document summarization
//! - `POST /consolidate` - merge summarized documents into one artifact

/// Request and response handlers for all API endpoints.
pub mod handlers;
/// WebSocket message types.
pub mod protocol;
/// Router configuration and route definitions.
pub mod routes;
