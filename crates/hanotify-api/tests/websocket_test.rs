// Handshake tests for `ConnectionClient` against a local WebSocket hub.
#![allow(clippy::unwrap_used)]

use std::future::Future;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use hanotify_api::{ConnectionClient, ConnectionState, Error};

type HubSocket = WebSocketStream<TcpStream>;

// ── Helpers ─────────────────────────────────────────────────────────

/// Start a one-shot hub that runs `script` against the first client.
async fn spawn_hub<F, Fut>(script: F) -> Url
where
    F: FnOnce(HubSocket) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        script(ws).await;
    });

    Url::parse(&format!("ws://{addr}/api/websocket")).unwrap()
}

/// Read the next text frame as JSON.
async fn next_json(ws: &mut HubSocket) -> Value {
    loop {
        match ws.next().await.unwrap().unwrap() {
            Message::Text(text) => return serde_json::from_str(text.as_str()).unwrap(),
            Message::Ping(_) | Message::Pong(_) => {}
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

async fn send_json(ws: &mut HubSocket, value: Value) {
    ws.send(Message::text(value.to_string())).await.unwrap();
}

fn token(value: &str) -> Option<SecretString> {
    Some(SecretString::from(value.to_string()))
}

fn event(data: Value) -> Value {
    json!({
        "id": 1,
        "type": "event",
        "event": { "event_type": "app_notify", "data": data, "origin": "REMOTE" }
    })
}

/// Keep the server side open until the client goes away.
async fn drain(ws: &mut HubSocket) {
    while let Some(Ok(msg)) = ws.next().await {
        if msg.is_close() {
            break;
        }
    }
}

const WAIT: Duration = Duration::from_secs(5);

// ── Handshake ───────────────────────────────────────────────────────

#[tokio::test]
async fn auth_then_subscribe_then_forward_events() {
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();

    let url = spawn_hub(move |mut ws| async move {
        send_json(&mut ws, json!({"type": "auth_required", "ha_version": "2024.6.0"})).await;

        let auth = next_json(&mut ws).await;
        seen_tx.send(auth).unwrap();
        send_json(&mut ws, json!({"type": "auth_ok"})).await;

        let subscribe = next_json(&mut ws).await;
        seen_tx.send(subscribe).unwrap();
        send_json(&mut ws, json!({"id": 1, "type": "result", "success": true, "result": null})).await;

        send_json(&mut ws, event(json!({"title": "Leak", "body": "Basement"}))).await;
        ws.send(Message::text("not json at all")).await.unwrap();
        send_json(&mut ws, json!({"type": "event", "event": {"event_type": "app_notify"}})).await;
        send_json(&mut ws, event(json!({"title": "Door", "body": "Open"}))).await;

        drain(&mut ws).await;
    })
    .await;

    let (tx, mut rx) = mpsc::channel(16);
    let (handle, disconnected) = ConnectionClient::new(url, token("secret")).connect(tx);

    let auth = tokio::time::timeout(WAIT, seen_rx.recv()).await.unwrap().unwrap();
    assert_eq!(auth, json!({"type": "auth", "access_token": "secret"}));

    let subscribe = tokio::time::timeout(WAIT, seen_rx.recv()).await.unwrap().unwrap();
    assert_eq!(
        subscribe,
        json!({"id": 1, "type": "subscribe_events", "event_type": "app_notify"})
    );

    let first = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    let second = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(first["title"], "Leak");
    assert_eq!(second["title"], "Door");
    assert_eq!(handle.state(), ConnectionState::Subscribed);

    handle.close();
    handle.close();
    assert_eq!(handle.state(), ConnectionState::Closed);
    assert!(handle.is_closed());

    let cause = tokio::time::timeout(WAIT, disconnected).await.unwrap().unwrap();
    assert!(cause.is_none(), "local close reports no cause");
}

#[tokio::test]
async fn tokenless_connection_subscribes_immediately() {
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();

    let url = spawn_hub(move |mut ws| async move {
        let first = next_json(&mut ws).await;
        seen_tx.send(first).unwrap();
        send_json(&mut ws, event(json!({"title": "Hi", "body": ""}))).await;
        drain(&mut ws).await;
    })
    .await;

    let (tx, mut rx) = mpsc::channel(16);
    let (handle, _disconnected) = ConnectionClient::new(url, None).connect(tx);

    let first = tokio::time::timeout(WAIT, seen_rx.recv()).await.unwrap().unwrap();
    assert_eq!(first["type"], "subscribe_events");
    assert_eq!(first["id"], 1);

    let data = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(data["title"], "Hi");

    handle.close();
}

#[tokio::test]
async fn state_watch_follows_handshake() {
    let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

    let url = spawn_hub(move |mut ws| async move {
        let auth = next_json(&mut ws).await;
        assert_eq!(auth["type"], "auth");
        release_rx.await.unwrap();
        send_json(&mut ws, json!({"type": "auth_ok"})).await;
        let subscribe = next_json(&mut ws).await;
        assert_eq!(subscribe["type"], "subscribe_events");
        drain(&mut ws).await;
    })
    .await;

    let (tx, _rx) = mpsc::channel(16);
    let (handle, _disconnected) = ConnectionClient::new(url, token("secret")).connect(tx);
    let mut states = handle.subscribe_state();

    let seen = tokio::time::timeout(WAIT, states.wait_for(|s| *s == ConnectionState::Authenticating))
        .await
        .unwrap()
        .map(|s| *s)
        .unwrap();
    assert_eq!(seen, ConnectionState::Authenticating);

    release_tx.send(()).unwrap();
    let seen = tokio::time::timeout(WAIT, states.wait_for(|s| *s == ConnectionState::Subscribed))
        .await
        .unwrap()
        .map(|s| *s)
        .unwrap();
    assert_eq!(seen, ConnectionState::Subscribed);

    handle.close();
    let seen = tokio::time::timeout(WAIT, states.wait_for(|s| s.is_terminal()))
        .await
        .unwrap()
        .map(|s| *s)
        .unwrap();
    assert_eq!(seen, ConnectionState::Closed);
}

// ── Disconnects ─────────────────────────────────────────────────────

#[tokio::test]
async fn peer_close_fires_single_clean_disconnect() {
    let url = spawn_hub(|mut ws| async move {
        let _auth = next_json(&mut ws).await;
        ws.close(None).await.unwrap();
        drain(&mut ws).await;
    })
    .await;

    let (tx, _rx) = mpsc::channel(16);
    let (handle, disconnected) = ConnectionClient::new(url, token("t")).connect(tx);

    let cause = tokio::time::timeout(WAIT, disconnected).await.unwrap().unwrap();
    assert!(cause.is_none());
    assert_eq!(handle.state(), ConnectionState::Closed);

    // Closing afterwards is a no-op.
    handle.close();
    assert_eq!(handle.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn auth_invalid_is_reported_as_failure() {
    let url = spawn_hub(|mut ws| async move {
        let _auth = next_json(&mut ws).await;
        send_json(&mut ws, json!({"type": "auth_invalid", "message": "Invalid password"})).await;
        drain(&mut ws).await;
    })
    .await;

    let (tx, _rx) = mpsc::channel(16);
    let (handle, disconnected) = ConnectionClient::new(url, token("wrong")).connect(tx);

    let cause = tokio::time::timeout(WAIT, disconnected).await.unwrap().unwrap();
    match cause {
        Some(Error::Authentication { message }) => assert_eq!(message, "Invalid password"),
        other => panic!("expected auth failure, got {other:?}"),
    }
    assert_eq!(handle.state(), ConnectionState::Failed);
}

#[tokio::test]
async fn unreachable_hub_fails_once() {
    // Grab a free port, then release it so nothing is listening.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let url = Url::parse(&format!("ws://{addr}/api/websocket")).unwrap();
    let (tx, _rx) = mpsc::channel(16);
    let (handle, disconnected) = ConnectionClient::new(url, None).connect(tx);

    let cause = tokio::time::timeout(WAIT, disconnected).await.unwrap().unwrap();
    assert!(matches!(cause, Some(Error::WebSocketConnect(_))));
    assert_eq!(handle.state(), ConnectionState::Failed);

    handle.close();
    assert_eq!(handle.state(), ConnectionState::Failed);
}
