//! Socket plumbing for one viewer: a writer task draining the outbound queue
//! with a periodic ping, and a reader task decoding control frames.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};
use waypoint_core::{InboundMessage, OutboundMessage};
use waypoint_engine::SessionState;

/// Serve a connected viewer until the socket closes or the session ends.
pub async fn serve_viewer(
    socket: WebSocket,
    state: Arc<SessionState>,
    mut outbound: mpsc::Receiver<OutboundMessage>,
    heartbeat: Duration,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let writer = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(heartbeat);
        ping_interval.tick().await; // first tick is immediate

        loop {
            tokio::select! {
                msg = outbound.recv() => {
                    let Some(msg) = msg else { break };
                    let text = match serde_json::to_string(&msg) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!(event = msg.event_name(), error = %e, "failed to encode frame");
                            continue;
                        }
                    };
                    if ws_tx.send(WsMessage::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                _ = ping_interval.tick() => {
                    if ws_tx.send(WsMessage::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                    trace!("sent ping");
                }
            }
        }
        let _ = ws_tx.close().await;
    });

    let reader_state = Arc::clone(&state);
    let reader = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_rx.next().await {
            match msg {
                WsMessage::Text(text) => handle_control(&reader_state, text.as_str()),
                WsMessage::Close(_) => break,
                _ => {}
            }
        }
    });

    let writer_abort = writer.abort_handle();
    let reader_abort = reader.abort_handle();
    tokio::select! {
        _ = writer => {},
        _ = reader => {},
        _ = state.cancelled() => {},
    }
    writer_abort.abort();
    reader_abort.abort();
}

fn handle_control(state: &SessionState, raw: &str) {
    match InboundMessage::parse(raw) {
        Some(InboundMessage::DoneReading) => {
            debug!(session_id = %state.id(), "viewer done reading");
            state.done_reading();
        }
        None => {
            warn!(session_id = %state.id(), frame_len = raw.len(), "ignoring unknown frame");
        }
    }
}
