// src/api/ws.rs — Duplex telemetry channel
//
// One WebSocket connection owns one session coordinator, which in turn owns
// one process supervisor. The connection task multiplexes inbound control
// messages and supervisor events onto the coordinator; a writer task drains
// the outbound channel. Any exit from the loop (close frame, socket error,
// disconnect) runs the same teardown path.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::api::ApiState;
use crate::core::coordinator::{ServerMessage, SessionCoordinator};
use crate::core::supervisor::ProcessSupervisor;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<ApiState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: ApiState) {
    tracing::info!("Client connected");

    let (mut ws_tx, mut ws_rx) = socket.split();

    // Writer task: serialize outbound messages onto the socket.
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<ServerMessage>(64);
    let send_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            let json = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!("Failed to serialize outbound message: {e}");
                    continue;
                }
            };
            if ws_tx.send(Message::Text(json.into())).await.is_err() {
                tracing::debug!("WebSocket send failed, client disconnected");
                break;
            }
        }
    });

    let (event_tx, mut event_rx) = mpsc::channel(state.simulation.event_buffer.max(1));
    let supervisor = ProcessSupervisor::new(&state.simulation, event_tx);
    let mut coordinator =
        SessionCoordinator::new(supervisor, state.reports.clone(), outbound_tx);

    loop {
        tokio::select! {
            inbound = ws_rx.next() => match inbound {
                Some(Ok(Message::Text(text))) => coordinator.handle_control(text.as_str()).await,
                Some(Ok(Message::Close(_))) => {
                    tracing::debug!("Client sent close frame");
                    break;
                }
                Some(Ok(_)) => {} // ping/pong/binary: nothing to do
                Some(Err(e)) => {
                    tracing::warn!("WebSocket error: {e}");
                    break;
                }
                None => break,
            },
            Some(event) = event_rx.recv() => coordinator.handle_event(event).await,
        }
    }

    // Same teardown on every exit path; nothing is sent back.
    coordinator.shutdown();
    send_task.abort();
    tracing::info!("Client disconnected");
}
