//! WebSocket endpoint - handshake and per-connection transport
//!
//! 1. Register the connection (unauthenticated) and greet it
//! 2. Wait for `{"type":"auth","token":...}`; other messages are ignored
//! 3. On success promote the entry; on failure send `auth_error` and close
//! 4. Remove the entry when the transport closes

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{stream::SplitStream, SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{timeout, timeout_at, Duration, Instant};

use super::{BroadcastEvent, ClientMessage, ConnectionId, Outbound, OUTBOUND_BUFFER};
use crate::error::{AppError, AuthError};
use crate::state::AppState;

/// Upper bound for flushing the last frames (e.g. `auth_error`) on close
const WRITER_DRAIN: Duration = Duration::from_secs(5);

/// Handle WebSocket upgrade request on `/ws`
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Arc<str>>(OUTBOUND_BUFFER);

    let id = state.registry.register(tx.clone()).await;
    tracing::info!(
        connection_id = %id,
        "WebSocket client connected ({} open)",
        state.registry.len().await
    );

    let mut writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if let Err(e) = sink.send(Message::Text(frame.to_string())).await {
                tracing::debug!("WebSocket send error: {}", e);
                return;
            }
        }
        let _ = sink.close().await;
    });

    enqueue(&tx, &BroadcastEvent::connected());

    let reason = read_loop(&mut stream, &tx, &id, &state).await;

    state.registry.remove(&id).await;
    drop(tx);

    // The writer stops once every sender is gone and the queue is drained
    if timeout(WRITER_DRAIN, &mut writer).await.is_err() {
        tracing::debug!(connection_id = %id, "WebSocket writer did not drain, aborting");
        writer.abort();
    }

    tracing::info!(connection_id = %id, "WebSocket client disconnected ({})", reason);
}

async fn read_loop(
    stream: &mut SplitStream<WebSocket>,
    tx: &Outbound,
    id: &ConnectionId,
    state: &AppState,
) -> &'static str {
    let deadline = Instant::now() + state.handshake_timeout;
    let mut authenticated = false;

    loop {
        let next = if authenticated {
            stream.next().await
        } else {
            match timeout_at(deadline, stream.next()).await {
                Ok(next) => next,
                Err(_) => {
                    enqueue(tx, &BroadcastEvent::auth_error("Tiempo de autenticación agotado"));
                    return "handshake timeout";
                }
            }
        };

        let text = match next {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Close(_))) | None => return "closed by client",
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                tracing::debug!(connection_id = %id, "WebSocket receive error: {}", e);
                return "receive error";
            }
        };

        let Some(parsed) = ClientMessage::parse(&text) else {
            tracing::debug!(connection_id = %id, "Ignoring message: {}", text);
            continue;
        };

        if authenticated {
            enqueue(tx, &BroadcastEvent::auth_error("La conexión ya está autenticada"));
            continue;
        }

        let result = match parsed {
            Ok(ClientMessage::Auth { token }) => state.auth.authenticate(&token).await,
            Err(e) => {
                tracing::debug!(connection_id = %id, "Malformed auth message: {}", e);
                Err(AuthError::InvalidToken.into())
            }
        };

        match result {
            Ok(identity) => {
                // Queue auth_success before the entry becomes visible to broadcasts
                enqueue(
                    tx,
                    &BroadcastEvent::AuthSuccess {
                        identity: identity.clone(),
                    },
                );
                let username = identity.username.clone();
                if let Err(e) = state.registry.promote(id, identity).await {
                    tracing::warn!(connection_id = %id, "Promotion rejected: {}", e);
                    return "registry rejected promotion";
                }
                tracing::info!(
                    connection_id = %id,
                    "WebSocket authenticated as {} ({} authenticated)",
                    username,
                    state.registry.authenticated_count().await
                );
                authenticated = true;
            }
            Err(e) => {
                let message = match &e {
                    AppError::Auth(auth) => auth.to_string(),
                    other => {
                        tracing::error!("WebSocket authentication error: {}", other);
                        "Error de autenticación".to_string()
                    }
                };
                enqueue(tx, &BroadcastEvent::auth_error(message));
                return "authentication failed";
            }
        }
    }
}

/// Queue a direct (non-broadcast) message for this connection only
fn enqueue(tx: &Outbound, event: &BroadcastEvent) {
    match serde_json::to_string(event) {
        Ok(json) => {
            if tx.try_send(json.into()).is_err() {
                tracing::debug!("Dropping {} message, outbound queue unavailable", event.kind());
            }
        }
        Err(e) => tracing::error!("Failed to serialize {} message: {}", event.kind(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::testing::{issue_token, serve, test_state, FakeDevice, TEST_SECRET};
    use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};

    type Client = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    async fn connect(addr: std::net::SocketAddr) -> Client {
        let (client, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
        client
    }

    /// Next text frame as JSON, or None once the server closed the socket
    async fn recv_json(client: &mut Client) -> Option<serde_json::Value> {
        loop {
            let msg = timeout(Duration::from_secs(5), client.next())
                .await
                .expect("timed out waiting for server frame");
            match msg {
                Some(Ok(WsMessage::Text(text))) => {
                    return Some(serde_json::from_str(&text).unwrap())
                }
                Some(Ok(WsMessage::Close(_))) | None | Some(Err(_)) => return None,
                Some(Ok(_)) => continue,
            }
        }
    }

    async fn send_json(client: &mut Client, value: serde_json::Value) {
        client.send(WsMessage::Text(value.to_string())).await.unwrap();
    }

    async fn wait_for_authenticated(state: &AppState, count: usize) {
        for _ in 0..100 {
            if state.registry.authenticated_count().await == count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("registry never reached {} authenticated connections", count);
    }

    #[tokio::test]
    async fn test_handshake_success_then_broadcast() {
        let state = test_state(Arc::new(FakeDevice::online()));
        let addr = serve(state.clone()).await;
        let mut client = connect(addr).await;

        assert_eq!(recv_json(&mut client).await.unwrap()["type"], "connected");

        let token = issue_token(TEST_SECRET, "u-alice", "alice", Role::User, 3600);
        send_json(&mut client, serde_json::json!({ "type": "auth", "token": token })).await;

        let reply = recv_json(&mut client).await.unwrap();
        assert_eq!(reply["type"], "auth_success");
        assert_eq!(reply["identity"]["username"], "alice");

        wait_for_authenticated(&state, 1).await;
        state
            .broadcaster
            .publish(&BroadcastEvent::device_offline())
            .await;
        assert_eq!(recv_json(&mut client).await.unwrap()["type"], "esp32_offline");
    }

    #[tokio::test]
    async fn test_non_auth_messages_are_ignored_and_receive_nothing() {
        let state = test_state(Arc::new(FakeDevice::online()));
        let addr = serve(state.clone()).await;
        let mut client = connect(addr).await;
        assert_eq!(recv_json(&mut client).await.unwrap()["type"], "connected");

        send_json(&mut client, serde_json::json!({ "type": "hello" })).await;
        client.send(WsMessage::Text("not json".to_string())).await.unwrap();

        // Unauthenticated connections never see broadcasts
        state
            .broadcaster
            .publish(&BroadcastEvent::status_update(serde_json::json!({ "lux": 1 })))
            .await;

        let token = issue_token(TEST_SECRET, "u-alice", "alice", Role::User, 3600);
        send_json(&mut client, serde_json::json!({ "type": "auth", "token": token })).await;
        assert_eq!(recv_json(&mut client).await.unwrap()["type"], "auth_success");
    }

    #[tokio::test]
    async fn test_bad_token_gets_auth_error_and_close() {
        let state = test_state(Arc::new(FakeDevice::online()));
        let addr = serve(state.clone()).await;
        let mut client = connect(addr).await;
        assert_eq!(recv_json(&mut client).await.unwrap()["type"], "connected");

        let token = issue_token(TEST_SECRET, "u-alice", "alice", Role::User, -7200);
        send_json(&mut client, serde_json::json!({ "type": "auth", "token": token })).await;

        let reply = recv_json(&mut client).await.unwrap();
        assert_eq!(reply["type"], "auth_error");
        assert!(recv_json(&mut client).await.is_none());

        wait_for_empty_registry(&state).await;
    }

    async fn wait_for_empty_registry(state: &AppState) {
        for _ in 0..100 {
            if state.registry.len().await == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("closed connection left a registry entry behind");
    }

    #[tokio::test]
    async fn test_silent_client_is_closed_after_handshake_timeout() {
        let mut state = test_state(Arc::new(FakeDevice::online()));
        state.handshake_timeout = Duration::from_millis(300);
        let addr = serve(state.clone()).await;
        let mut client = connect(addr).await;

        assert_eq!(recv_json(&mut client).await.unwrap()["type"], "connected");

        let reply = recv_json(&mut client).await.unwrap();
        assert_eq!(reply["type"], "auth_error");
        assert!(recv_json(&mut client).await.is_none());

        wait_for_empty_registry(&state).await;
    }

    #[tokio::test]
    async fn test_malformed_auth_gets_auth_error_and_close() {
        let state = test_state(Arc::new(FakeDevice::online()));
        let addr = serve(state.clone()).await;
        let mut client = connect(addr).await;
        assert_eq!(recv_json(&mut client).await.unwrap()["type"], "connected");

        send_json(&mut client, serde_json::json!({ "type": "auth", "token": 123 })).await;

        let reply = recv_json(&mut client).await.unwrap();
        assert_eq!(reply["type"], "auth_error");
        assert_eq!(reply["message"], "El token proporcionado no es válido");
        assert!(recv_json(&mut client).await.is_none());

        wait_for_empty_registry(&state).await;
    }

    #[tokio::test]
    async fn test_second_auth_is_rejected_without_closing() {
        let state = test_state(Arc::new(FakeDevice::online()));
        let addr = serve(state.clone()).await;
        let mut client = connect(addr).await;
        recv_json(&mut client).await.unwrap();

        let alice = issue_token(TEST_SECRET, "u-alice", "alice", Role::User, 3600);
        send_json(&mut client, serde_json::json!({ "type": "auth", "token": alice })).await;
        assert_eq!(recv_json(&mut client).await.unwrap()["type"], "auth_success");

        let admin = issue_token(TEST_SECRET, "u-admin", "admin", Role::Admin, 3600);
        send_json(&mut client, serde_json::json!({ "type": "auth", "token": admin })).await;
        assert_eq!(recv_json(&mut client).await.unwrap()["type"], "auth_error");

        wait_for_authenticated(&state, 1).await;
        let summaries = state.registry.summaries().await;
        assert_eq!(summaries[0].username.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_disconnect_removes_entry() {
        let state = test_state(Arc::new(FakeDevice::online()));
        let addr = serve(state.clone()).await;
        let mut client = connect(addr).await;
        recv_json(&mut client).await.unwrap();
        assert_eq!(state.registry.len().await, 1);

        client.close(None).await.unwrap();

        wait_for_empty_registry(&state).await;
    }
}
