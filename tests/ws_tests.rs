//! End-to-end WebSocket tests against a live listener.

mod common;

use alejandria::AppState;
use alejandria::api::routes::app;
use alejandria::utils::toml_config::DispatchMode;
use common::mocks::SourceBehavior;
use common::{mount_stream, test_state};
use futures::{SinkExt, StreamExt};
use rstest::rstest;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use wiremock::MockServer;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn spawn_server(state: AppState) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app(state)).await.unwrap();
    });
    addr
}

async fn connect(addr: SocketAddr) -> (Client, String) {
    let (mut ws, _) = connect_async(format!("ws://{addr}/ws/search")).await.unwrap();
    let first = recv_json(&mut ws).await;
    assert_eq!(first["type"], "ws_id");
    let ws_id = first["ws_id"].as_str().unwrap().to_string();
    (ws, ws_id)
}

async fn recv_json(ws: &mut Client) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(10), ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("connection ended")
            .unwrap();
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

async fn send_json(ws: &mut Client, value: Value) {
    ws.send(Message::Text(value.to_string().into())).await.unwrap();
}

/// Read messages until one of type `last` arrives, inclusive.
async fn recv_until(ws: &mut Client, last: &str) -> Vec<Value> {
    let mut messages = Vec::new();
    loop {
        let message = recv_json(ws).await;
        let done = message["type"] == last;
        messages.push(message);
        if done {
            return messages;
        }
    }
}

fn state(source: SourceBehavior) -> AppState {
    test_state(
        "http://127.0.0.1:9",
        DispatchMode::Task,
        source,
        Duration::from_millis(300),
    )
}

#[tokio::test]
async fn test_search_streams_progress_then_completion() {
    let addr = spawn_server(state(SourceBehavior::Items(3))).await;
    let (mut ws, _) = connect(addr).await;

    send_json(&mut ws, json!({"type": "search", "query": "RAPTOR"})).await;
    let messages = recv_until(&mut ws, "search_completed").await;
    let types: Vec<&str> = messages.iter().map(|m| m["type"].as_str().unwrap()).collect();

    assert_eq!(
        types,
        vec![
            "acknowledge",
            "search_started",
            "processing_started",
            "update",
            "update",
            "update",
            "summary",
            "search_completed",
        ]
    );

    let statuses: Vec<&str> = messages
        .iter()
        .filter(|m| m["type"] == "update")
        .map(|m| m["status"].as_str().unwrap())
        .collect();
    assert_eq!(statuses, vec!["started", "results", "completed"]);

    assert_eq!(messages[4]["data"]["count"], 3);
    assert_eq!(messages[4]["results"].as_array().unwrap().len(), 3);
    assert_eq!(messages[6]["total_results"], 3);
    assert!(messages[6]["time_elapsed"].as_str().unwrap().ends_with('s'));

    let completed = &messages[7];
    assert_eq!(completed["query"], "RAPTOR");
    assert_eq!(completed["total_results"], 3);
    assert_eq!(completed["results"]["arxiv"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_timeout_reported_as_update() {
    let addr = spawn_server(state(SourceBehavior::Hang)).await;
    let (mut ws, _) = connect(addr).await;

    send_json(&mut ws, json!({"type": "search", "query": "slow"})).await;
    let messages = recv_until(&mut ws, "search_completed").await;

    let timeout = messages
        .iter()
        .find(|m| m["type"] == "update" && m["status"] == "timeout")
        .expect("timeout update");
    assert_eq!(timeout["source"], "arxiv");
    assert!(timeout["error"].is_string());
    assert_eq!(messages.last().unwrap()["total_results"], 0);
}

#[tokio::test]
async fn test_empty_query_is_rejected() {
    let addr = spawn_server(state(SourceBehavior::Items(1))).await;
    let (mut ws, _) = connect(addr).await;

    send_json(&mut ws, json!({"type": "search", "query": "   "})).await;
    assert_eq!(recv_json(&mut ws).await["type"], "acknowledge");
    let error = recv_json(&mut ws).await;
    assert_eq!(error["type"], "error");
    assert_eq!(error["error"], "Query must not be empty");
}

#[tokio::test]
async fn test_malformed_frame_keeps_connection_open() {
    let addr = spawn_server(state(SourceBehavior::Items(1))).await;
    let (mut ws, _) = connect(addr).await;

    ws.send(Message::Text("not json".into())).await.unwrap();
    assert_eq!(recv_json(&mut ws).await["type"], "acknowledge");
    assert_eq!(recv_json(&mut ws).await["type"], "error");

    // Unknown message types are acknowledged and otherwise ignored.
    send_json(&mut ws, json!({"type": "ping"})).await;
    assert_eq!(recv_json(&mut ws).await["type"], "acknowledge");

    send_json(&mut ws, json!({"type": "search", "query": "still here"})).await;
    let messages = recv_until(&mut ws, "search_completed").await;
    assert_eq!(messages[0]["type"], "acknowledge");
}

#[tokio::test]
async fn test_session_removed_on_disconnect() {
    let state = state(SourceBehavior::Items(1));
    let sessions = state.sessions.clone();
    let addr = spawn_server(state).await;

    let (mut ws, ws_id) = connect(addr).await;
    assert!(sessions.contains(&ws_id));

    ws.close(None).await.unwrap();
    drop(ws);

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while sessions.contains(&ws_id) {
        assert!(tokio::time::Instant::now() < deadline, "session never unregistered");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[rstest]
#[case::worker_thread(DispatchMode::WorkerThread)]
#[case::task(DispatchMode::Task)]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_background_summary_relayed_to_session(#[case] dispatch: DispatchMode) {
    let llm = MockServer::start().await;
    mount_stream(&llm, &["{\"main_ideas\": ", "[\"tree-structured ", "retrieval\"]}"]).await;

    let state = test_state(
        &llm.uri(),
        dispatch,
        SourceBehavior::Items(1),
        Duration::from_secs(5),
    );
    let addr = spawn_server(state).await;
    let (mut ws, ws_id) = connect(addr).await;

    let response: Value = reqwest::Client::new()
        .post(format!("http://{addr}/extract-ideas"))
        .json(&json!({"text": "RAPTOR builds a tree of summaries.", "ws_id": ws_id}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(response, json!({"status": "processing", "ws_id": ws_id}));

    let messages = recv_until(&mut ws, "llm_result").await;
    let streamed: Vec<&Value> = messages.iter().filter(|m| m["type"] == "llm_stream").collect();
    assert_eq!(streamed.len(), 3);
    assert!(streamed.iter().all(|m| m["ws_id"] == ws_id.as_str()));
    assert_eq!(
        streamed.last().unwrap()["full_output"],
        "{\"main_ideas\": [\"tree-structured retrieval\"]}"
    );

    let done = messages.iter().filter(|m| m["type"] == "llm_stream_done").count();
    assert_eq!(done, 1);
    assert_eq!(messages[messages.len() - 2]["type"], "llm_stream_done");

    let result = &messages.last().unwrap()["result"];
    assert_eq!(result["main_ideas"], json!(["tree-structured retrieval"]));
    assert_eq!(result["methods"], json!([]));
}
