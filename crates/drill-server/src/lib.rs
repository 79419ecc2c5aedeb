//! # drill-server
//!
//! Axum HTTP + `WebSocket` server for live crisis drill sessions.
//!
//! - `/ws`: participants send `crisis_response` decisions; each one is
//!   persisted as an interaction record and relayed to every other open
//!   connection as a `crisis_update`
//! - `/health`, `/metrics`: liveness and Prometheus exposition
//! - `/api/*`: scenario generation, interaction read-back, mail notifications
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod api;
pub mod config;
pub mod health;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use server::{AppState, Collaborators, DrillServer};
pub use websocket::registry::RelayReport;
