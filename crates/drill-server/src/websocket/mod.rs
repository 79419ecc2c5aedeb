//! Live session socket: connection bookkeeping, decision relay, session loop.

pub mod connection;
pub mod handler;
pub mod registry;
pub mod session;
