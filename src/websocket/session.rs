use crate::error::AppError;
use crate::middleware::auth::auth_user_from_token;
use crate::websocket::hub::{SessionEvent, SessionHub};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, WebSocketUpgrade,
    },
    response::IntoResponse,
    Extension,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionEventMessage {
    pub event: SessionEvent,
    pub has_session: bool,
}

impl From<SessionEvent> for SessionEventMessage {
    fn from(event: SessionEvent) -> Self {
        Self {
            event,
            has_session: event.has_session(),
        }
    }
}

/// Session change feed for one open view. The subscription lives exactly
/// as long as the socket.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    Extension(hub): Extension<SessionHub>,
) -> Result<impl IntoResponse, AppError> {
    let auth_user = query
        .token
        .as_deref()
        .and_then(auth_user_from_token)
        .ok_or(AppError::Unauthorized)?;
    let user_id = auth_user.user_id;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, user_id, hub)))
}

async fn handle_socket(socket: WebSocket, user_id: Uuid, hub: SessionHub) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let mut subscription = hub.subscribe(user_id);

    tracing::info!("Session feed connected for user {}", user_id);

    let mut send_task = tokio::spawn(async move {
        while let Some(event) = subscription.recv().await {
            let payload = match serde_json::to_string(&SessionEventMessage::from(event)) {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::error!("Failed to encode session event: {}", e);
                    break;
                }
            };
            if ws_sender.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
            if !event.has_session() {
                let _ = ws_sender.send(Message::Close(None)).await;
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    // Whichever side ends first takes the other down, which drops the
    // subscription.
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    tracing::info!("Session feed disconnected for user {}", user_id);
}
