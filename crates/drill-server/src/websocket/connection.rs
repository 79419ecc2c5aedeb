//! One accepted socket, as seen by the relay.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::sync::mpsc;

use drill_core::ConnectionId;

/// Why an outbound message was not enqueued.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum SendError {
    /// The connection was closed or its writer has gone away.
    #[error("connection closed")]
    Closed,
    /// The per-connection queue is at capacity.
    #[error("send queue full")]
    QueueFull,
}

impl SendError {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::QueueFull => "queue_full",
        }
    }
}

/// A registered WebSocket client.
///
/// Outbound text goes through a bounded queue drained by the session's
/// writer task, so enqueueing never waits on the network.
pub struct ClientConnection {
    id: ConnectionId,
    tx: mpsc::Sender<Arc<String>>,
    open: AtomicBool,
    connected_at: Instant,
    dropped_messages: AtomicU64,
}

impl ClientConnection {
    pub fn new(id: ConnectionId, tx: mpsc::Sender<Arc<String>>) -> Self {
        Self {
            id,
            tx,
            open: AtomicBool::new(true),
            connected_at: Instant::now(),
            dropped_messages: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    pub fn connected_at(&self) -> Instant {
        self.connected_at
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire) && !self.tx.is_closed()
    }

    /// Mark closed. Returns `true` if this call did the closing.
    pub fn close(&self) -> bool {
        self.open.swap(false, Ordering::AcqRel)
    }

    /// Enqueue a message without waiting.
    pub fn send(&self, message: Arc<String>) -> Result<(), SendError> {
        if !self.open.load(Ordering::Acquire) {
            return Err(SendError::Closed);
        }
        let result = self.tx.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => SendError::Closed,
        });
        if result.is_err() {
            let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    /// Messages that could not be enqueued over this connection's lifetime.
    pub fn dropped_messages(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection(capacity: usize) -> (ClientConnection, mpsc::Receiver<Arc<String>>) {
        let (tx, rx) = mpsc::channel(capacity);
        (ClientConnection::new(ConnectionId::new(), tx), rx)
    }

    #[test]
    fn send_enqueues() {
        let (conn, mut rx) = connection(4);
        conn.send(Arc::new("hello".into())).unwrap();
        assert_eq!(rx.try_recv().unwrap().as_str(), "hello");
        assert_eq!(conn.dropped_messages(), 0);
    }

    #[test]
    fn full_queue_reports_and_counts() {
        let (conn, _rx) = connection(1);
        conn.send(Arc::new("a".into())).unwrap();
        assert_eq!(conn.send(Arc::new("b".into())), Err(SendError::QueueFull));
        assert_eq!(conn.dropped_messages(), 1);
    }

    #[test]
    fn closed_connection_rejects_send() {
        let (conn, mut rx) = connection(4);
        assert!(conn.close());
        assert!(!conn.close());
        assert!(!conn.is_open());
        assert_eq!(conn.send(Arc::new("x".into())), Err(SendError::Closed));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dropped_receiver_means_closed() {
        let (conn, rx) = connection(4);
        drop(rx);
        assert!(!conn.is_open());
        assert_eq!(conn.send(Arc::new("x".into())), Err(SendError::Closed));
    }
}
