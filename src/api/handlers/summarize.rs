use crate::AppState;
use crate::summarize::{Dispatch, SummarizeRequest};
use crate::types::Result;
use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// POST /extract-ideas
///
/// With a live `ws_id` the work is accepted and runs in the background;
/// progress and the result arrive on that session's WebSocket. Otherwise
/// the generated text is streamed back in this response, followed by
/// `---JSON_RESULT---` and the structured result.
pub async fn extract_ideas(
    State(state): State<AppState>,
    Json(request): Json<SummarizeRequest>,
) -> Result<Response> {
    match state.summarizer.summarize(request).await? {
        Dispatch::Accepted { ws_id } => Ok(Json(json!({
            "status": "processing",
            "ws_id": ws_id,
        }))
        .into_response()),
        Dispatch::Streaming(stream) => Ok((
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            Body::from_stream(stream),
        )
            .into_response()),
    }
}
