//! Registry of open connections and peer fan-out.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use metrics::counter;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use drill_core::ConnectionId;

use super::connection::ClientConnection;
use crate::metrics::{DECISION_RELAYS_TOTAL, RELAY_DROPS_TOTAL};

/// Outcome of relaying one message to the sender's peers.
///
/// The sender itself is never counted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RelayReport {
    /// Peers whose queue accepted the message.
    pub delivered: usize,
    /// Peers already closed when the relay reached them.
    pub skipped: usize,
    /// Open peers whose queue rejected the message.
    pub failed: usize,
}

/// Live connections keyed by id.
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, Arc<ClientConnection>>,
    send_queue_capacity: usize,
}

impl ConnectionRegistry {
    pub fn new(send_queue_capacity: usize) -> Self {
        Self {
            connections: DashMap::new(),
            send_queue_capacity: send_queue_capacity.max(1),
        }
    }

    /// Register a new connection under a fresh id.
    ///
    /// Returns the connection and the receiving end of its outbound queue.
    pub fn register(&self) -> (Arc<ClientConnection>, mpsc::Receiver<Arc<String>>) {
        let (tx, rx) = mpsc::channel(self.send_queue_capacity);
        loop {
            match self.connections.entry(ConnectionId::new()) {
                Entry::Occupied(_) => continue,
                Entry::Vacant(slot) => {
                    let conn = Arc::new(ClientConnection::new(slot.key().clone(), tx));
                    let _ = slot.insert(Arc::clone(&conn));
                    debug!(connection_id = %conn.id(), "connection registered");
                    return (conn, rx);
                }
            }
        }
    }

    /// Remove and close a connection.
    pub fn remove(&self, id: &ConnectionId) -> Option<Arc<ClientConnection>> {
        let (_, conn) = self.connections.remove(id)?;
        let _ = conn.close();
        debug!(connection_id = %id, "connection removed");
        Some(conn)
    }

    pub fn get(&self, id: &ConnectionId) -> Option<Arc<ClientConnection>> {
        self.connections.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Point-in-time copy of the registered connections.
    pub fn snapshot(&self) -> Vec<Arc<ClientConnection>> {
        self.connections
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Enqueue `payload` on every registered connection except `sender`.
    ///
    /// Works on a snapshot, so concurrent registration or removal never
    /// blocks the relay. A failed peer does not stop delivery to the rest.
    pub fn relay(&self, sender: &ConnectionId, payload: &Arc<String>) -> RelayReport {
        let mut report = RelayReport::default();
        for conn in self.snapshot() {
            if conn.id() == sender {
                continue;
            }
            if !conn.is_open() {
                report.skipped += 1;
                continue;
            }
            match conn.send(Arc::clone(payload)) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    counter!(RELAY_DROPS_TOTAL, "reason" => e.as_str()).increment(1);
                    warn!(connection_id = %conn.id(), reason = e.as_str(), "relay to peer dropped");
                }
            }
        }
        counter!(DECISION_RELAYS_TOTAL).increment(report.delivered as u64);
        report
    }

    /// Close and remove every connection. Returns how many were removed.
    pub fn drain(&self) -> usize {
        let ids: Vec<ConnectionId> = self.connections.iter().map(|e| e.key().clone()).collect();
        ids.iter().filter(|id| self.remove(id).is_some()).count()
    }

    pub fn count(&self) -> usize {
        self.connections.len()
    }
}
