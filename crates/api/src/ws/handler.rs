use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use beacon_core::notification::Notification;
use beacon_core::roles::ROLE_ADMIN;
use futures::{SinkExt, StreamExt};

use crate::auth::jwt::validate_token;
use crate::state::AppState;
use crate::ws::manager::{SessionUser, Transport};
use crate::ws::protocol::{ClientEvent, ServerEvent};

/// HTTP handler that upgrades the connection to WebSocket.
///
/// The transport is taken from `X-Forwarded-Proto` as set by the TLS
/// terminating proxy.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let transport = transport_from_headers(&headers);
    ws.on_upgrade(move |socket| handle_socket(socket, transport, state))
}

fn transport_from_headers(headers: &HeaderMap) -> Transport {
    let secure = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|proto| proto.eq_ignore_ascii_case("https"));
    if secure {
        Transport::Secure
    } else {
        Transport::Plain
    }
}

/// Manage a single WebSocket connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Registers the session with `SessionRegistry`.
///   2. Spawns a sender task that forwards messages from the registry channel.
///   3. Dispatches inbound events on the current task.
///   4. Cleans up on disconnect.
async fn handle_socket(socket: WebSocket, transport: Transport, state: AppState) {
    let socket_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %socket_id, ?transport, "WebSocket connected");

    let mut rx = state.sessions.add(socket_id.clone(), transport).await;

    let (mut sink, mut stream) = socket.split();

    let sender_socket_id = socket_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_socket_id, "WebSocket sink closed");
                break;
            }
        }
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => dispatch(&state, &socket_id, text.as_str()).await,
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %socket_id, "Pong received");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %socket_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    state.sessions.remove(&socket_id).await;
    send_task.abort();
    tracing::info!(conn_id = %socket_id, "WebSocket disconnected");
}

/// Handle one inbound text frame.
async fn dispatch(state: &AppState, socket_id: &str, text: &str) {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!(conn_id = %socket_id, error = %e, "Malformed WebSocket event");
            reply(
                state,
                socket_id,
                ServerEvent::Error {
                    message: format!("Malformed event: {e}"),
                },
            )
            .await;
            return;
        }
    };

    match event {
        ClientEvent::Token(token) => authenticate(state, socket_id, &token).await,
        ClientEvent::Notification(notification) => {
            let ok = submit_notification(state, socket_id, notification).await;
            reply(state, socket_id, ServerEvent::NotificationAck { ok }).await;
        }
    }
}

async fn authenticate(state: &AppState, socket_id: &str, token: &str) {
    match validate_token(token, &state.config.jwt) {
        Ok(claims) => {
            let user = SessionUser {
                user_id: claims.sub,
                role: claims.role,
            };
            tracing::info!(
                conn_id = %socket_id,
                user_id = user.user_id,
                role = %user.role,
                "WebSocket authenticated"
            );
            state.sessions.attach_user(socket_id, user).await;
        }
        Err(e) => {
            tracing::debug!(conn_id = %socket_id, error = %e, "Rejected WebSocket token");
            reply(
                state,
                socket_id,
                ServerEvent::Error {
                    message: "Invalid or expired token".into(),
                },
            )
            .await;
        }
    }
}

/// Returns whether the notification was accepted.
async fn submit_notification(
    state: &AppState,
    socket_id: &str,
    notification: Notification,
) -> bool {
    let user = state.sessions.user_of(socket_id).await;
    match user {
        Some(user) if user.role == ROLE_ADMIN => {
            match state.notifications.submit(&notification).await {
                Ok(submitted) => {
                    tracing::info!(
                        conn_id = %socket_id,
                        user_id = user.user_id,
                        ?submitted,
                        "Notification submitted"
                    );
                    true
                }
                Err(e) => {
                    tracing::warn!(conn_id = %socket_id, error = %e, "Notification rejected");
                    false
                }
            }
        }
        _ => {
            tracing::warn!(conn_id = %socket_id, "Notification from non-admin session ignored");
            false
        }
    }
}

async fn reply(state: &AppState, socket_id: &str, event: ServerEvent) {
    match event.to_message() {
        Ok(message) => {
            state.sessions.send_to(socket_id, message).await;
        }
        Err(e) => tracing::error!(error = %e, "Failed to encode WebSocket event"),
    }
}
