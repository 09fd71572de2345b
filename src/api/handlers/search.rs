//! WebSocket search endpoint.
//!
//! Each connection gets a session token, announced first as `ws_id`, and an
//! outbound queue drained by a dedicated writer task. Every other producer
//! (this read loop, the query supervisor, background summarization relays)
//! only ever enqueues into that queue.

use crate::AppState;
use crate::api::protocol::{ClientMessage, ServerMessage};
use crate::search::EventSink;
use crate::session::{ChannelHandle, OUTBOUND_CAPACITY};
use crate::types::{Result, SearchQuery};
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use chrono::Utc;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};

/// GET /ws/search - WebSocket upgrade handler.
pub async fn ws_search(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (sender, mut receiver) = socket.split();
    let (channel, outbound) = ChannelHandle::open(OUTBOUND_CAPACITY);
    let connection_id = channel.connection_id();

    let session = state.sessions.open_session(channel.clone());
    let ws_id = session.token().to_string();
    tracing::info!(%connection_id, %ws_id, "WebSocket connection established");

    let writer = tokio::spawn(write_outbound(sender, outbound));

    if channel
        .send(ServerMessage::WsId {
            ws_id: ws_id.clone(),
        })
        .await
        .is_err()
    {
        writer.abort();
        return;
    }

    while let Some(frame) = receiver.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text.to_string(),
            Ok(Message::Binary(data)) => match String::from_utf8(data.to_vec()) {
                Ok(text) => text,
                Err(_) => {
                    let _ = channel
                        .send(ServerMessage::error("Binary frames must be UTF-8 JSON"))
                        .await;
                    continue;
                }
            },
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Ok(Message::Close(_)) => break,
            Err(e) => {
                tracing::warn!(%connection_id, error = %e, "WebSocket error");
                break;
            }
        };

        if handle_text(&text, &channel, &state).await.is_err() {
            break;
        }
    }

    drop(session);
    writer.abort();
    tracing::info!(%connection_id, %ws_id, "WebSocket connection closed");
}

/// Process one inbound frame. An error means the connection is gone.
async fn handle_text(text: &str, channel: &ChannelHandle, state: &AppState) -> Result<()> {
    channel.send(ServerMessage::acknowledge()).await?;

    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!(error = %e, "invalid client message");
            return channel
                .send(ServerMessage::error(
                    "Invalid message format. A JSON object with a known shape is expected.",
                ))
                .await;
        }
    };

    match message {
        ClientMessage::Search(query) => run_search(query, channel, state).await,
        ClientMessage::Unknown => {
            tracing::debug!("ignoring message of unknown type");
            Ok(())
        }
    }
}

async fn run_search(mut query: SearchQuery, channel: &ChannelHandle, state: &AppState) -> Result<()> {
    query.query = query.query.trim().to_string();
    if query.query.is_empty() {
        return channel.send(ServerMessage::error("Query must not be empty")).await;
    }
    let cap = state.config_manager.config().search.max_results;
    query.max_results = query.max_results.min(cap);

    tracing::info!(
        query = %query.query,
        max_results = query.max_results,
        sortby = %query.sortby,
        type_query = %query.type_query,
        start = query.start,
        sortorder = %query.sortorder,
        "search requested"
    );

    let sources = state.supervisor.source_names();
    channel
        .send(ServerMessage::SearchStarted {
            message: format!("Searching for: {}", query.query),
            timestamp: Utc::now(),
        })
        .await?;
    channel
        .send(ServerMessage::ProcessingStarted {
            message: format!("Processing {}...", sources.join(", ")),
            sources,
            timestamp: Utc::now(),
        })
        .await?;

    let outcome = state
        .supervisor
        .run(&query, Some(channel as &dyn EventSink))
        .await;

    channel
        .send(ServerMessage::SearchCompleted {
            query: query.query,
            total_results: outcome.total_results,
            sources_searched: outcome.sources_searched,
            results: outcome.results,
            timestamp: Utc::now(),
        })
        .await
}

async fn write_outbound(
    mut sender: SplitSink<WebSocket, Message>,
    mut outbound: tokio::sync::mpsc::Receiver<ServerMessage>,
) {
    while let Some(message) = outbound.recv().await {
        let json = match serde_json::to_string(&message) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "failed to encode server message");
                continue;
            }
        };
        if sender.send(Message::Text(json.into())).await.is_err() {
            break;
        }
    }
    let _ = sender.close().await;
}
