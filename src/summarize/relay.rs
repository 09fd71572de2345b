//! Token-by-token relay from the upstream stream to a client channel.
//!
//! Two drivers share one [`Accumulator`]:
//!
//! - [`relay_async`] runs on the runtime and awaits each channel send.
//! - [`relay_blocking`] runs on a thread with no runtime and delivers each
//!   frame through [`ChannelHandle::send_from_worker`], which picks a
//!   delivery strategy for the calling context.
//!
//! The channel is looked up by session token for every frame, so a client
//! that disconnects mid-stream simply stops receiving. Delivery failures are
//! logged and the loop moves on to the next frame. Exactly one
//! `llm_stream_done` is sent per relay, on the terminator or at end of input.
//!
//! [`ChannelHandle::send_from_worker`]: crate::session::ChannelHandle::send_from_worker

use super::extract::extract;
use super::frame::{Frame, LineSplitter, decode_line};
use crate::api::protocol::ServerMessage;
use crate::session::SessionRegistry;
use crate::types::{Result, StreamFragment, StructuredResult};
use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::io::BufRead;

/// Separates streamed text from the trailing JSON result in a synchronous response body.
pub const RESULT_SENTINEL: &str = "\n---JSON_RESULT---\n";

/// Final state of one relay run.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayOutcome {
    pub full_output: String,
    pub result: StructuredResult,
    pub fragments: usize,
    /// Whether the upstream terminator was seen.
    pub completed: bool,
}

/// Running buffer for one upstream stream.
#[derive(Debug)]
pub struct Accumulator {
    session_token: String,
    accumulated: String,
    fragments: usize,
    done: bool,
}

impl Accumulator {
    pub fn new(session_token: impl Into<String>) -> Self {
        Self {
            session_token: session_token.into(),
            accumulated: String::new(),
            fragments: 0,
            done: false,
        }
    }

    /// Consume one protocol line, returning the fragment to forward, if any.
    ///
    /// Lines after the terminator are ignored.
    pub fn feed(&mut self, line: &str) -> Option<StreamFragment> {
        if self.done {
            return None;
        }
        match decode_line(line) {
            Frame::Delta(content) if !content.is_empty() => {
                self.accumulated.push_str(&content);
                self.fragments += 1;
                Some(StreamFragment {
                    session_token: self.session_token.clone(),
                    content,
                    accumulated: self.accumulated.clone(),
                })
            }
            Frame::Done => {
                self.done = true;
                None
            }
            Frame::Delta(_) | Frame::Skip => None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn accumulated(&self) -> &str {
        &self.accumulated
    }

    pub fn finish(self) -> RelayOutcome {
        RelayOutcome {
            result: extract(&self.accumulated),
            full_output: self.accumulated,
            fragments: self.fragments,
            completed: self.done,
        }
    }
}

/// Deliver `message` to the session's channel from async code.
pub async fn notify(sessions: &SessionRegistry, token: &str, message: ServerMessage) {
    let Some(channel) = sessions.lookup(token) else {
        tracing::debug!(ws_id = %token, kind = message.type_name(), "no channel for session");
        return;
    };
    if let Err(e) = channel.send(message).await {
        tracing::warn!(ws_id = %token, error = %e, "relay send failed");
    }
}

/// Deliver `message` to the session's channel from synchronous code.
pub fn notify_from_worker(sessions: &SessionRegistry, token: &str, message: ServerMessage) {
    let Some(channel) = sessions.lookup(token) else {
        tracing::debug!(ws_id = %token, kind = message.type_name(), "no channel for session");
        return;
    };
    if let Err(e) = channel.send_from_worker(message) {
        tracing::warn!(ws_id = %token, error = %e, "relay send failed");
    }
}

/// Relay an upstream byte stream to the channel registered under `token`.
pub async fn relay_async<S, B, E>(chunks: S, token: &str, sessions: &SessionRegistry) -> RelayOutcome
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    let mut chunks = std::pin::pin!(chunks);
    let mut acc = Accumulator::new(token);
    let mut splitter = LineSplitter::new();

    'read: while let Some(chunk) = chunks.next().await {
        let bytes = match chunk {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(ws_id = %token, error = %e, "upstream stream interrupted");
                break;
            }
        };
        for line in splitter.push(bytes.as_ref()) {
            if let Some(fragment) = acc.feed(&line) {
                notify(sessions, token, fragment.into()).await;
            }
            if acc.is_done() {
                break 'read;
            }
        }
    }

    if !acc.is_done() {
        if let Some(fragment) = splitter.finish().and_then(|line| acc.feed(&line)) {
            notify(sessions, token, fragment.into()).await;
        }
    }

    notify(
        sessions,
        token,
        ServerMessage::LlmStreamDone {
            ws_id: token.to_string(),
        },
    )
    .await;

    let outcome = acc.finish();
    tracing::info!(ws_id = %token, fragments = outcome.fragments, completed = outcome.completed, "relay finished");
    outcome
}

/// Relay a blocking line reader to the channel registered under `token`.
///
/// Intended for detached worker threads.
pub fn relay_blocking<R: BufRead>(reader: R, token: &str, sessions: &SessionRegistry) -> RelayOutcome {
    let mut acc = Accumulator::new(token);

    // Split on raw bytes so a non-UTF-8 frame is skipped like any other malformed one.
    for line in reader.split(b'\n') {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(ws_id = %token, error = %e, "upstream stream interrupted");
                break;
            }
        };
        if let Some(fragment) = acc.feed(&String::from_utf8_lossy(&line)) {
            notify_from_worker(sessions, token, fragment.into());
        }
        if acc.is_done() {
            break;
        }
    }

    notify_from_worker(
        sessions,
        token,
        ServerMessage::LlmStreamDone {
            ws_id: token.to_string(),
        },
    );

    let outcome = acc.finish();
    tracing::info!(ws_id = %token, fragments = outcome.fragments, completed = outcome.completed, "relay finished");
    outcome
}

/// Re-stream the upstream text to a direct caller, then the JSON result.
///
/// The body is every text delta in order, followed by [`RESULT_SENTINEL`]
/// and the extracted result serialized as JSON.
pub fn body_stream<S, B, E>(chunks: S) -> impl Stream<Item = Result<String>> + Send
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    async_stream::stream! {
        let mut chunks = std::pin::pin!(chunks);
        let mut acc = Accumulator::new("");
        let mut splitter = LineSplitter::new();
        let mut interrupted = None;

        'read: while let Some(chunk) = chunks.next().await {
            let bytes = match chunk {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(error = %e, "upstream stream interrupted");
                    interrupted = Some(e.to_string());
                    break;
                }
            };
            for line in splitter.push(bytes.as_ref()) {
                if let Some(fragment) = acc.feed(&line) {
                    yield Ok(fragment.content);
                }
                if acc.is_done() {
                    break 'read;
                }
            }
        }

        if !acc.is_done() {
            if let Some(fragment) = splitter.finish().and_then(|line| acc.feed(&line)) {
                yield Ok(fragment.content);
            }
        }

        let mut outcome = acc.finish();
        if let Some(reason) = interrupted {
            outcome.result.error = Some(format!("Upstream stream interrupted: {}", reason));
        }
        let json = serde_json::to_string(&outcome.result).unwrap_or_else(|_| "{}".to_string());
        yield Ok(format!("{RESULT_SENTINEL}{json}"));
    }
}
