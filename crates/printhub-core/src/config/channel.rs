//! Notification channel configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Dual-transport notification channel configuration.
///
/// Producer and consumer must agree on these values; both read the same
/// configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Well-known Unix domain socket path.
    #[serde(default = "default_socket_path")]
    pub socket_path: String,
    /// Loopback address for the TCP fallback.
    #[serde(default = "default_tcp_host")]
    pub tcp_host: String,
    /// Well-known TCP port for the fallback transport.
    #[serde(default = "default_tcp_port")]
    pub tcp_port: u16,
    /// Whether the Unix domain socket transport is used.
    #[serde(default = "default_true")]
    pub enable_unix: bool,
    /// Whether the TCP transport is used.
    #[serde(default = "default_true")]
    pub enable_tcp: bool,
    /// Accept-loop poll interval in milliseconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Sender connect/write timeout in milliseconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
    /// Maximum accepted size of one message in bytes.
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,
}

impl ChannelConfig {
    /// Accept-loop poll interval.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Sender connect timeout.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// `host:port` of the TCP endpoint.
    pub fn tcp_addr(&self) -> String {
        format!("{}:{}", self.tcp_host, self.tcp_port)
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            tcp_host: default_tcp_host(),
            tcp_port: default_tcp_port(),
            enable_unix: true,
            enable_tcp: true,
            poll_interval_ms: default_poll_interval(),
            connect_timeout_ms: default_connect_timeout(),
            max_message_bytes: default_max_message_bytes(),
        }
    }
}

fn default_socket_path() -> String {
    "/tmp/printhub.sock".to_string()
}

fn default_tcp_host() -> String {
    "127.0.0.1".to_string()
}

fn default_tcp_port() -> u16 {
    19876
}

fn default_true() -> bool {
    true
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_connect_timeout() -> u64 {
    2000
}

fn default_max_message_bytes() -> usize {
    65_536
}
