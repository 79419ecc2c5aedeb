//! # drill-core
//!
//! Types shared by every crisis drill crate:
//!
//! - [`ids`]: connection identifiers
//! - [`wire`]: the JSON messages exchanged over the live session socket
//! - [`interaction`]: audit records created from participant decisions
//! - [`scenario`] / [`notify`]: payloads for the scenario and mail collaborators

#![deny(unsafe_code)]

pub mod errors;
pub mod ids;
pub mod interaction;
pub mod notify;
pub mod scenario;
pub mod wire;

pub use errors::{ValidationError, WireError};
pub use ids::ConnectionId;
pub use interaction::{InteractionAction, InteractionRecord, NewInteraction};
pub use wire::{parse_inbound, DecisionEvent, Inbound, OutboundMessage};
