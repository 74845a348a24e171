//! Real-time channel to the order backend
//!
//! The agent keeps one persistent, auto-reconnecting subscription to the
//! backend. Connection loss suspends intake only; printers keep working
//! through jobs already queued.

mod intake;
mod transport;

pub use intake::Intake;
pub use transport::{MemoryTransport, TcpTransport, Transport};

use std::time::Duration;

use thiserror::Error;

/// Channel error type
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Connection failed or dropped
    #[error("Connection error: {0}")]
    Connection(String),

    /// IO error on the wire
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Frame could not be decoded
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Payload (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Channel behavior configuration
///
/// Defaults are tuned for a backend reached over the internet: patient
/// exponential reconnect backoff and a short bounded retry for outcome
/// acks before they are dropped (loudly); the backend owns durable
/// order state and detects missing acks by timeout.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// First reconnect delay; doubles up to `max_reconnect_delay`
    pub reconnect_delay: Duration,
    /// Exponential backoff ceiling
    pub max_reconnect_delay: Duration,
    /// Send attempts per outcome ack before dropping it
    pub ack_attempts: u32,
    /// Delay between ack attempts
    pub ack_backoff: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(1),
            max_reconnect_delay: Duration::from_secs(60),
            ack_attempts: 3,
            ack_backoff: Duration::from_millis(500),
        }
    }
}

impl ChannelConfig {
    /// Local-network tuning: fast detection, fast recovery
    pub fn lan() -> Self {
        Self {
            reconnect_delay: Duration::from_millis(500),
            max_reconnect_delay: Duration::from_secs(10),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ChannelConfig::default();
        assert_eq!(config.reconnect_delay, Duration::from_secs(1));
        assert_eq!(config.ack_attempts, 3);
        assert!(config.max_reconnect_delay > config.reconnect_delay);
    }
}
