//! WebSocket subscription endpoint.
//!
//! A client subscribes to one task's progress by connecting to
//! `/ws/{task_id}`. Every broadcast event for that task is forwarded as a
//! JSON text frame; the connection ends when the task finishes (its channel
//! closes) or the client goes away. There is no event replay for late
//! subscribers.

use crate::AppState;
use axum::{
    extract::{
        Path, State, WebSocketUpgrade,
        ws::{Message as WsMessage, WebSocket},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

pub async fn subscribe(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, task_id))
}

async fn handle_socket(socket: WebSocket, state: AppState, task_id: Uuid) {
    tracing::debug!(%task_id, "client subscribed");
    let mut events = state.broadcaster.subscribe(task_id);
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let json = match serde_json::to_string(&event) {
                        Ok(json) => json,
                        Err(err) => {
                            tracing::warn!(%task_id, error = %err, "event serialization failed");
                            continue;
                        }
                    };
                    if sink.send(WsMessage::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                // task finished, nothing more will be emitted
                Err(RecvError::Closed) => break,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(%task_id, skipped, "subscriber lagged, events dropped");
                }
            },
            incoming = stream.next() => match incoming {
                // inbound frames are ignored; Close / connection loss ends the session
                Some(Ok(WsMessage::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(_)) => break,
            },
        }
    }

    // drop our receiver first, then reap the channel if we were the last
    // subscriber - a connection to a finished task must not leave an entry
    drop(events);
    state.broadcaster.release(task_id);
    tracing::debug!(%task_id, "client unsubscribed");
}
