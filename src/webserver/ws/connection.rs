/// WebSocket observer connection
///
/// Each connection registers with the broadcast hub and forwards every event
/// as a JSON text frame. The stream is push-only: client frames are ignored
/// apart from proving the client is still there.
use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;

use crate::broadcast::{BroadcastHub, DeviceEvent};
use crate::logger::{self, LogTag};

use super::keepalive::{CloseReason, KeepAlive, Liveness, Verdict};

type WsSink = futures::stream::SplitSink<WebSocket, Message>;

/// Why the connection loop ended
#[derive(Debug)]
enum Exit {
    ClientClosed,
    HubClosed,
    SendFailed(axum::Error),
    SocketError(axum::Error),
    TimedOut(CloseReason),
}

pub async fn handle_connection(
    socket: WebSocket,
    hub: Arc<BroadcastHub>,
    keep_alive: KeepAlive,
    login: String,
) {
    let (observer_id, mut hub_rx) = hub.register().await;
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut liveness = Liveness::new(keep_alive);
    let mut check = tokio::time::interval(keep_alive.check_period());
    let mut forwarded = 0u64;

    logger::debug(
        LogTag::Webserver,
        &format!("Observer {} connected ({})", observer_id, login),
    );

    let exit = loop {
        tokio::select! {
            biased;

            event = hub_rx.recv() => match event {
                Some(event) => {
                    if let Err(e) = forward_to_client(&mut ws_tx, &event).await {
                        break Exit::SendFailed(e);
                    }
                    forwarded += 1;
                }
                None => {
                    let _ = ws_tx.send(close_frame(close_code::AWAY, "server shutting down")).await;
                    break Exit::HubClosed;
                }
            },

            msg = ws_rx.next() => match msg {
                Some(Ok(Message::Close(_))) | None => break Exit::ClientClosed,
                Some(Ok(_)) => liveness.heard_from_client(),
                Some(Err(e)) => break Exit::SocketError(e),
            },

            _ = check.tick() => match liveness.verdict() {
                Verdict::Healthy => {}
                Verdict::SendPing => {
                    if let Err(e) = ws_tx.send(Message::Ping(Vec::new())).await {
                        break Exit::SendFailed(e);
                    }
                    liveness.ping_sent();
                }
                Verdict::Close(reason) => {
                    let _ = ws_tx.send(close_frame(close_code::POLICY, reason.as_str())).await;
                    break Exit::TimedOut(reason);
                }
            },
        }
    };

    hub.unregister(observer_id).await;

    match &exit {
        Exit::TimedOut(reason) => {
            hub.metrics().observer_timed_out();
            logger::info(
                LogTag::Webserver,
                &format!(
                    "Observer {} closed: {} (silent {}s)",
                    observer_id,
                    reason.as_str(),
                    liveness.silent_for().as_secs()
                ),
            );
        }
        Exit::SendFailed(e) | Exit::SocketError(e) => {
            logger::debug(
                LogTag::Webserver,
                &format!("Observer {}: websocket error: {}", observer_id, e),
            );
        }
        Exit::ClientClosed | Exit::HubClosed => {}
    }

    logger::debug(
        LogTag::Webserver,
        &format!(
            "Observer {} disconnected ({:?}, forwarded={})",
            observer_id, exit, forwarded
        ),
    );
}

fn close_frame(code: u16, reason: &'static str) -> Message {
    Message::Close(Some(CloseFrame {
        code,
        reason: reason.into(),
    }))
}

async fn forward_to_client(ws_tx: &mut WsSink, event: &DeviceEvent) -> Result<(), axum::Error> {
    match event.to_json() {
        Ok(json) => ws_tx.send(Message::Text(json)).await,
        Err(e) => {
            // skip the event, keep the connection
            logger::error(
                LogTag::Webserver,
                &format!("Failed to serialize {}: {}", event.event_type(), e),
            );
            Ok(())
        }
    }
}
