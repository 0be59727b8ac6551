//! WebSocket connection handlers
//!
//! One task per channel. `/event` consumes pushed events forever;
//! `/find` and `/live` expect a filter JSON as the first inbound message
//! and stream events back. A malformed handshake gets one error message
//! before the close; mid-stream write failures or timeouts abandon the
//! session.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use tracing::{debug, error, warn};

use theia_filter::{Filter, FilterSpec};
use theia_protocol::{serialize_to_string, Event};

use crate::error::HandshakeError;
use crate::state::AppState;

/// Per-message write timeout; a client that cannot take a message within
/// this window loses its session
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Liveness probe
pub async fn health() -> &'static str {
    "ok"
}

/// Upgrade handler for the push path
pub async fn event_ws(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_event(socket, state))
}

/// Upgrade handler for historical queries
pub async fn find_ws(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_find(socket, state))
}

/// Upgrade handler for live subscriptions
pub async fn live_ws(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_live(socket, state))
}

/// `/event`: parse and relay every inbound message until the client goes
/// away. Parse failures skip the message; store failures end the session.
async fn handle_event(mut socket: WebSocket, state: Arc<AppState>) {
    debug!("push channel open");
    while let Some(msg) = socket.recv().await {
        let outcome = match msg {
            Ok(Message::Text(text)) => state.ingest(text.as_bytes()).await,
            Ok(Message::Binary(data)) => state.ingest(&data).await,
            Ok(Message::Ping(data)) => {
                let _ = socket.send(Message::Pong(data)).await;
                continue;
            }
            Ok(Message::Pong(_)) => continue,
            Ok(Message::Close(_)) | Err(_) => break,
        };
        if let Err(e) = outcome {
            error!(error = %e, "store rejected push, closing channel");
            break;
        }
    }
    debug!("push channel closed");
}

/// `/find`: one filter in, the matching history out, then a server-side
/// close. A client disconnect mid-stream abandons the scan.
async fn handle_find(mut socket: WebSocket, state: Arc<AppState>) {
    let Some((spec, _)) = await_filter(&mut socket).await else {
        return;
    };

    let mut results = match state.store().search(&spec).await {
        Ok(results) => results,
        Err(e) => {
            send_error(&mut socket, &e.to_string()).await;
            return;
        }
    };

    loop {
        tokio::select! {
            item = results.recv() => match item {
                Some(Ok(event)) => {
                    if send_event(&mut socket, &event).await.is_err() {
                        // Dropping `results` stops the scan.
                        return;
                    }
                }
                Some(Err(e)) => {
                    warn!(error = %e, "search failed mid-stream");
                    break;
                }
                None => break, // history exhausted
            },
            msg = socket.recv() => match msg {
                Some(Ok(Message::Ping(data))) => {
                    let _ = socket.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
                Some(Ok(_)) => {} // ignored
            },
        }
    }

    let _ = socket.send(Message::Close(None)).await;
}

/// `/live`: one filter in, matching events out until the client leaves or
/// the broker evicts the subscription. Further inbound messages are
/// ignored; there is no server-side idle timeout.
async fn handle_live(mut socket: WebSocket, state: Arc<AppState>) {
    let Some((_, filter)) = await_filter(&mut socket).await else {
        return;
    };

    let (id, mut deliveries) = match state.broker().subscribe(filter) {
        Ok(subscription) => subscription,
        Err(e) => {
            send_error(&mut socket, &e.to_string()).await;
            return;
        }
    };
    debug!(id, "live subscriber connected");

    loop {
        tokio::select! {
            delivery = deliveries.recv() => match delivery {
                Some(payload) => {
                    let send = socket.send(Message::Text(payload.to_string()));
                    match tokio::time::timeout(WRITE_TIMEOUT, send).await {
                        Ok(Ok(())) => {}
                        Ok(Err(_)) => break,
                        Err(_) => {
                            warn!(id, "live write timed out, dropping subscriber");
                            break;
                        }
                    }
                }
                None => break, // evicted by the broker
            },
            msg = socket.recv() => match msg {
                Some(Ok(Message::Ping(data))) => {
                    let _ = socket.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {} // inbound after the filter is ignored
            },
        }
    }

    let _ = state.broker().unsubscribe(id);
    debug!(id, "live subscriber disconnected");
}

/// Decode and compile the handshake filter message.
pub(crate) fn decode_filter(text: &str) -> Result<(FilterSpec, Filter), HandshakeError> {
    let spec = FilterSpec::from_json(text)?;
    let filter = Filter::compile(&spec)?;
    Ok((spec, filter))
}

/// Wait for the first filter message of a `/find` or `/live` session.
///
/// On a malformed handshake the client gets one error message and the
/// channel closes; `None` means the session is over either way.
async fn await_filter(socket: &mut WebSocket) -> Option<(FilterSpec, Filter)> {
    loop {
        let text = match socket.recv().await? {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(data)) => match String::from_utf8(data) {
                Ok(text) => text,
                Err(_) => {
                    send_error(socket, &HandshakeError::NotUtf8.to_string()).await;
                    return None;
                }
            },
            Ok(Message::Ping(data)) => {
                let _ = socket.send(Message::Pong(data)).await;
                continue;
            }
            Ok(Message::Pong(_)) => continue,
            Ok(Message::Close(_)) | Err(_) => return None,
        };

        match decode_filter(&text) {
            Ok(compiled) => return Some(compiled),
            Err(e) => {
                debug!(error = %e, "rejecting filter handshake");
                send_error(socket, &e.to_string()).await;
                return None;
            }
        }
    }
}

/// The one-line error payload sent before closing a channel.
///
/// JSON-encoding keeps multi-line causes (regex errors render with a
/// caret line) on a single physical line.
pub(crate) fn error_body(message: &str) -> String {
    serde_json::json!({ "error": true, "message": message }).to_string()
}

/// Send a one-line error message, then close the channel.
async fn send_error(socket: &mut WebSocket, message: &str) {
    let _ = socket.send(Message::Text(error_body(message))).await;
    let _ = socket.send(Message::Close(None)).await;
}

/// Send one event as one message, bounded by the write timeout.
async fn send_event(socket: &mut WebSocket, event: &Event) -> Result<(), ()> {
    let payload = serialize_to_string(event);
    match tokio::time::timeout(WRITE_TIMEOUT, socket.send(Message::Text(payload))).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(_)) => Err(()),
        Err(_) => {
            warn!("find write timed out, abandoning stream");
            Err(())
        }
    }
}

#[cfg(test)]
#[path = "handlers_test.rs"]
mod tests;
