//! Configuration types for connections and the dispatcher

use crate::core::error::{WireError, WireResult};
use std::time::Duration;

/// Protocol version preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProtocolVersion {
    /// RESP2 (Redis Serialization Protocol version 2) - Default
    #[default]
    Resp2,
    /// RESP3 (Redis Serialization Protocol version 3) - Redis 6.0+
    Resp3,
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Resp2 => write!(f, "RESP2"),
            Self::Resp3 => write!(f, "RESP3"),
        }
    }
}

/// Configuration for a single connection
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Server address (e.g., `localhost:6379` or `redis://localhost:6379`)
    pub addr: String,

    /// Optional password for authentication
    pub password: Option<String>,

    /// Database number selected after connecting
    pub database: u8,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// Deadline for a full reply to arrive once its request has been
    /// written (`None` waits indefinitely)
    pub response_timeout: Option<Duration>,

    /// Enable TCP keepalive
    pub tcp_keepalive: Option<Duration>,

    /// Disable Nagle's algorithm
    pub tcp_nodelay: bool,

    /// Preferred protocol version
    pub protocol_version: ProtocolVersion,

    /// Capacity of the read buffer in bytes
    pub read_buffer_size: usize,

    /// Upper bound on a single bulk payload or aggregate element count;
    /// frames declaring more are rejected as protocol errors
    pub max_frame_length: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            addr: "localhost:6379".to_string(),
            password: None,
            database: 0,
            connect_timeout: Duration::from_secs(5),
            response_timeout: Some(Duration::from_secs(30)),
            tcp_keepalive: Some(Duration::from_secs(60)),
            tcp_nodelay: true,
            protocol_version: ProtocolVersion::default(),
            read_buffer_size: 8192,
            max_frame_length: 512 * 1024 * 1024,
        }
    }
}

impl ConnectionConfig {
    /// Create a new configuration for the given address
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            ..Default::default()
        }
    }

    /// Set the password for authentication
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the database number
    #[must_use]
    pub const fn with_database(mut self, database: u8) -> Self {
        self.database = database;
        self
    }

    /// Set the connection timeout
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the response deadline (`None` disables it)
    #[must_use]
    pub const fn with_response_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Set the TCP keepalive interval (`None` disables it)
    #[must_use]
    pub const fn with_tcp_keepalive(mut self, keepalive: Option<Duration>) -> Self {
        self.tcp_keepalive = keepalive;
        self
    }

    /// Enable or disable `TCP_NODELAY`
    #[must_use]
    pub const fn with_tcp_nodelay(mut self, nodelay: bool) -> Self {
        self.tcp_nodelay = nodelay;
        self
    }

    /// Set the preferred protocol version
    #[must_use]
    pub const fn with_protocol_version(mut self, version: ProtocolVersion) -> Self {
        self.protocol_version = version;
        self
    }

    /// Set the read buffer capacity
    #[must_use]
    pub const fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    /// Set the maximum accepted frame length
    #[must_use]
    pub const fn with_max_frame_length(mut self, max: usize) -> Self {
        self.max_frame_length = max;
        self
    }

    /// Parse the configured address into host and port
    ///
    /// # Errors
    ///
    /// Returns a `Config` error if the address is empty or the port is
    /// not numeric.
    pub fn endpoint(&self) -> WireResult<(String, u16)> {
        let addr = self.addr.trim();
        let addr = addr
            .strip_prefix("redis://")
            .or_else(|| addr.strip_prefix("rediss://"))
            .unwrap_or(addr);

        if addr.is_empty() {
            return Err(WireError::Config("Empty address".to_string()));
        }

        if let Some((host, port_str)) = addr.rsplit_once(':') {
            let port = port_str
                .parse::<u16>()
                .map_err(|_| WireError::Config(format!("Invalid port: {port_str}")))?;
            return Ok((host.to_string(), port));
        }

        // Default port if none given
        Ok((addr.to_string(), 6379))
    }
}
