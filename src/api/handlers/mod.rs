//! API request handlers.

/// Document consolidation handler.
pub mod consolidate;
/// Banner and health handlers.
pub mod health;
/// WebSocket search handler.
pub mod search;
/// Summarization trigger handler.
pub mod summarize;
