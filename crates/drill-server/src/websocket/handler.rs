//! Inbound frame handling: classify, persist, relay.

use std::sync::Arc;

use metrics::counter;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use drill_core::{
    parse_inbound, ConnectionId, DecisionEvent, Inbound, NewInteraction, OutboundMessage, WireError,
};
use drill_store::InteractionRepository;

use super::registry::{ConnectionRegistry, RelayReport};
use crate::metrics::{
    DECISIONS_RECEIVED_TOTAL, INTERACTION_PERSIST_FAILURES_TOTAL, MALFORMED_MESSAGES_TOTAL,
};

/// What happened to one inbound frame.
#[derive(Debug)]
pub enum FrameOutcome {
    /// A decision was accepted: persistence was submitted and peers were notified.
    Decision {
        report: RelayReport,
        /// The detached persistence task. Dropping it does not cancel the write.
        persistence: JoinHandle<()>,
    },
    /// Well-formed, but not a message kind this server acts on.
    Ignored,
    /// Rejected. The connection stays open.
    Malformed,
}

/// Turns decision frames into interaction records and peer updates.
pub struct Broadcaster {
    registry: Arc<ConnectionRegistry>,
    repository: Arc<dyn InteractionRepository>,
}

impl Broadcaster {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        repository: Arc<dyn InteractionRepository>,
    ) -> Self {
        Self {
            registry,
            repository,
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Handle one text frame from `sender`.
    pub fn handle_text(&self, sender: &ConnectionId, text: &str) -> FrameOutcome {
        match parse_inbound(text) {
            Ok(Inbound::Decision(event)) => self.handle_decision(sender, &event),
            Ok(Inbound::Unrecognized(kind)) => {
                debug!(connection_id = %sender, kind, "ignoring unrecognized message type");
                FrameOutcome::Ignored
            }
            Err(e) => Self::reject(sender, &e),
        }
    }

    /// Handle one binary frame. Its payload must be UTF-8 JSON.
    pub fn handle_binary(&self, sender: &ConnectionId, data: &[u8]) -> FrameOutcome {
        match std::str::from_utf8(data) {
            Ok(text) => self.handle_text(sender, text),
            Err(_) => Self::reject(sender, &WireError::NonUtf8),
        }
    }

    /// Submit persistence, then relay to every other connection.
    ///
    /// Delivery to peers never waits on the store.
    pub fn handle_decision(&self, sender: &ConnectionId, event: &DecisionEvent) -> FrameOutcome {
        counter!(DECISIONS_RECEIVED_TOTAL).increment(1);
        info!(
            connection_id = %sender,
            user_id = event.user_id,
            simulation_id = event.simulation_id,
            phase = event.phase,
            "decision received"
        );

        let persistence = self.persist(event);
        let report = self.relay(sender, event);
        debug!(
            connection_id = %sender,
            delivered = report.delivered,
            skipped = report.skipped,
            failed = report.failed,
            "decision relayed"
        );
        FrameOutcome::Decision { report, persistence }
    }

    fn persist(&self, event: &DecisionEvent) -> JoinHandle<()> {
        let repository = Arc::clone(&self.repository);
        let entry = NewInteraction::from_decision(event);
        tokio::spawn(async move {
            let (user_id, simulation_id) = (entry.user_id, entry.simulation_id);
            match repository.record_interaction(entry).await {
                Ok(record) => {
                    debug!(interaction_id = record.id, simulation_id, "interaction recorded");
                }
                Err(e) => {
                    counter!(INTERACTION_PERSIST_FAILURES_TOTAL).increment(1);
                    error!(user_id, simulation_id, error = %e, "failed to record interaction");
                }
            }
        })
    }

    fn relay(&self, sender: &ConnectionId, event: &DecisionEvent) -> RelayReport {
        match OutboundMessage::decision_update(event).to_json() {
            Ok(json) => self.registry.relay(sender, &Arc::new(json)),
            Err(e) => {
                error!(error = %e, "failed to serialize decision update");
                RelayReport::default()
            }
        }
    }

    fn reject(sender: &ConnectionId, err: &WireError) -> FrameOutcome {
        counter!(MALFORMED_MESSAGES_TOTAL, "reason" => err.kind()).increment(1);
        warn!(connection_id = %sender, reason = err.kind(), error = %err, "malformed message");
        FrameOutcome::Malformed
    }
}
