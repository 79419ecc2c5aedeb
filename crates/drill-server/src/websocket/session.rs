//! Per-connection WebSocket session loop.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge, histogram};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use super::connection::ClientConnection;
use super::handler::Broadcaster;
use crate::metrics::{
    WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_CONNECTION_DURATION_SECONDS,
    WS_DISCONNECTIONS_TOTAL,
};

/// Drive one accepted socket until the client leaves or shutdown is signalled.
///
/// Frames are handled one at a time in arrival order. Persistence runs on
/// detached tasks, so a slow store never stalls this loop.
#[instrument(skip_all, fields(connection_id = %connection.id()))]
pub async fn run_ws_session(
    ws: WebSocket,
    connection: Arc<ClientConnection>,
    mut outbound_rx: mpsc::Receiver<Arc<String>>,
    broadcaster: Arc<Broadcaster>,
    shutdown: CancellationToken,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();

    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);
    info!("client connected");

    let outbound = tokio::spawn(async move {
        while let Some(text) = outbound_rx.recv().await {
            if ws_tx.send(Message::Text(String::clone(&text).into())).await.is_err() {
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    loop {
        let frame = tokio::select! {
            () = shutdown.cancelled() => {
                debug!("shutdown signalled, closing session");
                break;
            }
            frame = ws_rx.next() => frame,
        };

        let message = match frame {
            Some(Ok(message)) => message,
            Some(Err(e)) => {
                debug!(error = %e, "socket read failed");
                break;
            }
            None => break,
        };

        let _outcome = match message {
            Message::Text(text) => broadcaster.handle_text(connection.id(), text.as_str()),
            Message::Binary(data) => broadcaster.handle_binary(connection.id(), &data),
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) => continue,
        };
    }

    let _ = broadcaster.registry().remove(connection.id());
    outbound.abort();

    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    histogram!(WS_CONNECTION_DURATION_SECONDS)
        .record(connection.connected_at().elapsed().as_secs_f64());
    info!(dropped = connection.dropped_messages(), "client disconnected");
}
