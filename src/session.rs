//! Per-connection websocket session loop.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt, TryFutureExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use warp::ws::{Message, WebSocket};

use crate::protocol::{ClientIntent, Reject};
use crate::registry::ConnectionId;
use crate::relay::RoomRelay;

/// Drive one upgraded websocket against the relay until the peer goes away.
///
/// The socket is split: a spawned writer task drains an unbounded channel
/// through the sink, so the relay can fan out without ever awaiting a slow
/// socket. The read half is consumed here, alongside a keepalive ping so
/// silently dead peers are reaped instead of lingering in their room.
pub async fn client_connected(ws: WebSocket, relay: Arc<RoomRelay>, ping_interval: Duration) {
    let (mut ws_tx, mut ws_rx) = ws.split();

    let (tx, rx) = mpsc::unbounded_channel();
    let mut rx = UnboundedReceiverStream::new(rx);

    tokio::task::spawn(async move {
        while let Some(frame) = rx.next().await {
            ws_tx
                .send(frame)
                .unwrap_or_else(|e| {
                    log::debug!("websocket send error: {}", e);
                })
                .await;
        }
    });

    let conn_id = relay.connect(tx.clone()).await;

    let mut keepalive = tokio::time::interval(ping_interval);
    keepalive.tick().await; // the first tick completes immediately

    loop {
        tokio::select! {
            _ = keepalive.tick() => {
                if tx.send(Message::ping(Vec::new())).is_err() {
                    break;
                }
            }
            inbound = ws_rx.next() => {
                let frame = match inbound {
                    Some(Ok(frame)) => frame,
                    Some(Err(e)) => {
                        log::debug!("websocket error (connection={}): {}", conn_id, e);
                        break;
                    }
                    None => break,
                };
                if frame.is_close() {
                    break;
                }
                if let Some(intent) = parse_intent(conn_id, &frame, &relay).await {
                    // rejections already went back over the wire
                    let _ = relay.handle_intent(conn_id, intent).await;
                }
            }
        }
    }

    relay.disconnect(conn_id).await;
}

/// Decode a frame into an intent. Control frames are skipped; anything else
/// that is not valid intent JSON earns the sender a `rejected` event rather
/// than a silent drop.
async fn parse_intent(
    conn_id: ConnectionId,
    frame: &Message,
    relay: &RoomRelay,
) -> Option<ClientIntent> {
    if frame.is_ping() || frame.is_pong() {
        return None;
    }
    let text = match frame.to_str() {
        Ok(text) => text,
        Err(()) => {
            relay.reject(conn_id, Reject::Malformed).await;
            return None;
        }
    };
    match serde_json::from_str(text) {
        Ok(intent) => Some(intent),
        Err(err) => {
            log::debug!("connection {} sent unparseable intent: {}", conn_id, err);
            relay.reject(conn_id, Reject::Malformed).await;
            None
        }
    }
}
