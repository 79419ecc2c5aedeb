//! Server configuration.

use serde::{Deserialize, Serialize};

use drill_settings::ServerSettings;

/// Resolved runtime configuration for [`DrillServer`](crate::DrillServer).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Upgrades are refused with 503 once this many sockets are open.
    pub max_connections: usize,
    /// Outbound queue depth per connection. A full queue drops relays to that peer.
    pub send_queue_capacity: usize,
    /// Max WebSocket message size in bytes.
    pub max_message_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            max_connections: 1024,
            send_queue_capacity: 256,
            max_message_size: 64 * 1024,
        }
    }
}

impl From<&ServerSettings> for ServerConfig {
    fn from(settings: &ServerSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            max_connections: settings.max_connections,
            send_queue_capacity: settings.send_queue_capacity,
            max_message_size: settings.max_message_size,
        }
    }
}

impl ServerConfig {
    /// `host:port` string for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
