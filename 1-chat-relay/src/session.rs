//! One task per client: the reader runs inline, the writer is spawned.
//!
//! Whichever side finishes first ends the session and unregisters the
//! connection. Unregistering closes the outbox, which lets a still-running
//! writer send a close frame and exit.

use std::{borrow::Cow, time::Duration};

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use tokio::{
    select,
    sync::mpsc,
    time::{interval_at, timeout, Instant},
};
use tracing::{debug, info, warn};

use crate::{
    frame::{self, Inbound},
    registry::{ConnectionId, Liveness, Registration},
    relay::{Relay, SessionLimits},
};

pub(crate) async fn run(mut socket: WebSocket, relay: Relay) {
    let registration = match relay.on_connect().await {
        Ok(registration) => registration,
        Err(err) => {
            warn!(error = %err, "rejecting connection");
            let refusal = close_frame(close_code::AGAIN, "connection limit reached");
            if let Err(err) = socket.send(refusal).await {
                debug!(error = ?err, "failed to send refusal");
            }
            return;
        }
    };

    let liveness = registration.liveness();
    let Registration { id, outbox, .. } = registration;
    let limits = relay.session_limits();
    let (sink, stream) = socket.split();

    let mut writer = tokio::spawn(write_outbound(sink, outbox, id, limits));

    select! {
        _ = &mut writer => {
            debug!(%id, "writer finished first");
        }
        _ = read_inbound(stream, &relay, id, liveness, limits) => {
            debug!(%id, "reader finished first");
        }
    }

    relay.on_disconnect(id).await;
}

async fn read_inbound(
    mut stream: SplitStream<WebSocket>,
    relay: &Relay,
    id: ConnectionId,
    liveness: Liveness,
    limits: SessionLimits,
) {
    loop {
        if !liveness.is_live() {
            debug!(%id, "connection was dropped, no longer reading");
            return;
        }

        let next = match limits.idle_timeout {
            Some(idle) => match timeout(idle, stream.next()).await {
                Ok(next) => next,
                Err(_) => {
                    info!(%id, idle_secs = idle.as_secs(), "closing idle connection");
                    return;
                }
            },
            None => stream.next().await,
        };

        let frame = match next {
            Some(Ok(frame)) => frame,
            Some(Err(err)) => {
                debug!(%id, error = ?err, "read failed");
                return;
            }
            None => return,
        };

        match frame::decode(frame) {
            Ok(Inbound::Text(text)) => {
                relay.on_message(id, &text).await;
            }
            Ok(Inbound::Control) => {}
            Ok(Inbound::Close) => return,
            Err(err) => warn!(%id, error = %err, "discarding frame"),
        }
    }
}

async fn write_outbound(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbox: mpsc::Receiver<String>,
    id: ConnectionId,
    limits: SessionLimits,
) {
    let period = limits.ping_interval.max(Duration::from_millis(1));
    let mut heartbeat = interval_at(Instant::now() + period, period);

    loop {
        let frame = select! {
            next = outbox.recv() => match next {
                Some(text) => Message::Text(text),
                None => break,
            },
            _ = heartbeat.tick() => Message::Ping(Vec::new()),
        };

        match timeout(limits.write_timeout, sink.send(frame)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                debug!(%id, error = ?err, "write failed");
                return;
            }
            Err(_) => {
                warn!(%id, "write timed out");
                return;
            }
        }
    }

    // The registry let go of this connection.
    let goodbye = close_frame(close_code::AWAY, "relay closed the connection");
    if let Ok(Err(err)) = timeout(limits.write_timeout, sink.send(goodbye)).await {
        debug!(%id, error = ?err, "failed to send close frame");
    }
}

fn close_frame(code: u16, reason: &'static str) -> Message {
    Message::Close(Some(CloseFrame {
        code,
        reason: Cow::Borrowed(reason),
    }))
}
