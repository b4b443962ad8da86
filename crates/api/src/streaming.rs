//! WebSocket streaming API.
//!
//! Moderators connect here for live vote and comment notifications. On
//! connect the unread backlog is replayed oldest first and marked read;
//! after that the connection only carries live pushes, so the ledger and
//! the socket never hand the same event over twice.

#![allow(missing_docs)]

use axum::{
    extract::{
        Query, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use futures::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use civica_db::entities::notification;

use crate::middleware::AppState;

/// Streaming query parameters.
#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    /// Access token for authentication.
    #[serde(rename = "i")]
    pub token: Option<String>,
}

/// Server-to-client message.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// A moderator notification, replayed from the backlog or pushed live.
    #[serde(rename_all = "camelCase")]
    Notification {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        body: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        created_at: Option<String>,
    },
}

impl ServerMessage {
    fn live(body: String) -> Self {
        Self::Notification {
            id: None,
            body,
            created_at: None,
        }
    }

    fn replay(n: &notification::Model) -> Self {
        Self::Notification {
            id: Some(n.id.clone()),
            body: n.body.clone(),
            created_at: Some(n.created_at.to_rfc3339()),
        }
    }

    fn to_frame(&self) -> Message {
        Message::Text(serde_json::to_string(self).unwrap_or_default().into())
    }
}

/// WebSocket handler for the notification stream.
pub async fn streaming_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<StreamQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, query, state))
}

/// Handle a WebSocket connection.
async fn handle_socket(socket: WebSocket, query: StreamQuery, state: AppState) {
    let (mut sender, receiver) = socket.split();

    // Authenticate before registering anything
    let user = match &query.token {
        Some(token) => match state.user_service.authenticate_by_token(token).await {
            Ok(user) => user,
            Err(e) => {
                warn!("Streaming auth failed: {}", e);
                close(&mut sender, close_code::POLICY, "Authentication failed").await;
                return;
            }
        },
        None => {
            close(&mut sender, close_code::POLICY, "Missing access token").await;
            return;
        }
    };

    let (tx, rx) = mpsc::unbounded_channel();

    // Guard keeps the registry entry alive exactly as long as this task
    let guard = Arc::clone(&state.registry).register(&user.id, user.role, tx);

    info!(user_id = %user.id, connection_id = ?guard.id(), "Streaming connection established");

    // Replay the unread backlog before any live push is forwarded
    if user.role.is_moderator() {
        let backlog = match state.notification_service.drain_unread(&user.id).await {
            Ok(backlog) => backlog,
            Err(e) => {
                warn!(user_id = %user.id, "Backlog replay failed: {}", e);
                close(&mut sender, close_code::ERROR, "Backlog replay failed").await;
                return;
            }
        };

        for notification in &backlog {
            if sender
                .send(ServerMessage::replay(notification).to_frame())
                .await
                .is_err()
            {
                return;
            }
        }
    }

    pump(sender, receiver, rx).await;

    info!(user_id = %user.id, "Streaming connection closed");
}

/// Forward live pushes and answer pings until either side goes away.
async fn pump(
    mut sender: SplitSink<WebSocket, Message>,
    mut receiver: SplitStream<WebSocket>,
    mut rx: mpsc::UnboundedReceiver<String>,
) {
    loop {
        tokio::select! {
            inbound = receiver.next() => {
                match inbound {
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("WebSocket error: {}", e);
                        break;
                    }
                }
            }

            pushed = rx.recv() => {
                match pushed {
                    Some(body) => {
                        if sender
                            .send(ServerMessage::live(body).to_frame())
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    // Registry pruned this connection
                    None => break,
                }
            }
        }
    }
}

async fn close(sender: &mut SplitSink<WebSocket, Message>, code: u16, reason: &'static str) {
    let frame = CloseFrame {
        code,
        reason: reason.into(),
    };
    let _ = sender.send(Message::Close(Some(frame))).await;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn replay_frames_carry_id_and_timestamp() {
        let n = notification::Model {
            id: "01abc".to_string(),
            recipient_id: "mod1".to_string(),
            body: "alice voted for Bill C-330".to_string(),
            is_read: false,
            created_at: Utc::now().into(),
        };

        let json = serde_json::to_string(&ServerMessage::replay(&n)).unwrap();

        assert!(json.contains(r#""type":"notification""#));
        assert!(json.contains(r#""id":"01abc""#));
        assert!(json.contains("createdAt"));
    }

    #[test]
    fn live_frames_omit_ledger_fields() {
        let json =
            serde_json::to_string(&ServerMessage::live("bob commented on Bill C-12".to_string()))
                .unwrap();

        assert!(json.contains(r#""type":"notification""#));
        assert!(!json.contains(r#""id""#));
        assert!(!json.contains("createdAt"));
    }
}
