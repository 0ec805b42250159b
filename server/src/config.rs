//! Runtime configuration for the relay server

use shared::{DEFAULT_PORT, MAX_CLIENTS};

/// How the server treats the identity written inside an UPDATE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentityPolicy {
    /// Store the pose under whatever identity the message names
    #[default]
    Trust,
    /// Drop UPDATEs naming any identity other than the sender's own slot
    BindToSender,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to listen on
    pub host: String,
    /// TCP port; 0 picks an ephemeral port
    pub port: u16,
    /// Number of slots, i.e. maximum concurrent sessions
    pub max_clients: usize,
    /// Largest payload a client may announce; `None` leaves it unbounded
    pub max_frame_len: Option<usize>,
    pub identity_policy: IdentityPolicy,
    /// Whether a relayed UPDATE is also sent back to its sender
    pub echo_updates: bool,
    /// Frames queued per session before further broadcasts to it are dropped
    pub outbound_queue: usize,
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            max_clients: MAX_CLIENTS,
            max_frame_len: None,
            identity_policy: IdentityPolicy::Trust,
            echo_updates: true,
            outbound_queue: 1024,
        }
    }
}
