//! Server configuration: the validated settings the event loop runs
//! with, independent of how they were gathered (CLI flags, in this
//! crate's `main.rs`).

/// Validated runtime configuration for one server instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub max_clients: usize,
    pub max_rooms: usize,
    pub verbose: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 10000,
            max_clients: 50,
            max_rooms: 10,
            verbose: false,
        }
    }
}

/// Why a [`ServerConfig`] failed validation.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("port must be between 1 and 65535, got {0}")]
    PortOutOfRange(u32),
    #[error("max_clients must be greater than 0")]
    MaxClientsZero,
    #[error("max_rooms must be greater than 0")]
    MaxRoomsZero,
}

impl ServerConfig {
    /// Builds a config, rejecting values that would make the server
    /// unable to start (port 0, no client or room capacity).
    pub fn new(
        bind_address: String,
        port: u32,
        max_clients: usize,
        max_rooms: usize,
        verbose: bool,
    ) -> Result<Self, ConfigError> {
        if port == 0 || port > u16::MAX as u32 {
            return Err(ConfigError::PortOutOfRange(port));
        }
        if max_clients == 0 {
            return Err(ConfigError::MaxClientsZero);
        }
        if max_rooms == 0 {
            return Err(ConfigError::MaxRoomsZero);
        }
        Ok(Self { bind_address, port: port as u16, max_clients, max_rooms, verbose })
    }

    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_defaults() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.bind_address, "0.0.0.0");
        assert_eq!(cfg.port, 10000);
        assert_eq!(cfg.max_clients, 50);
        assert_eq!(cfg.max_rooms, 10);
        assert!(!cfg.verbose);
    }

    #[test]
    fn new_rejects_zero_port() {
        assert_eq!(
            ServerConfig::new("0.0.0.0".into(), 0, 50, 10, false),
            Err(ConfigError::PortOutOfRange(0))
        );
    }

    #[test]
    fn new_rejects_port_above_u16_range() {
        assert_eq!(
            ServerConfig::new("0.0.0.0".into(), 70000, 50, 10, false),
            Err(ConfigError::PortOutOfRange(70000))
        );
    }

    #[test]
    fn new_rejects_zero_max_clients() {
        assert_eq!(
            ServerConfig::new("0.0.0.0".into(), 10000, 0, 10, false),
            Err(ConfigError::MaxClientsZero)
        );
    }

    #[test]
    fn new_rejects_zero_max_rooms() {
        assert_eq!(
            ServerConfig::new("0.0.0.0".into(), 10000, 50, 0, false),
            Err(ConfigError::MaxRoomsZero)
        );
    }

    #[test]
    fn socket_addr_joins_host_and_port() {
        let cfg = ServerConfig::new("127.0.0.1".into(), 9999, 50, 10, false).unwrap();
        assert_eq!(cfg.socket_addr(), "127.0.0.1:9999");
    }
}
