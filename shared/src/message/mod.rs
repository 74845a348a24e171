//! Channel message types
//!
//! Shared between the agent and the backend's real-time channel. The wire
//! layout is a small binary frame: event type byte, request id, correlation
//! id (nil = none), little-endian payload length, then a JSON payload.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

use uuid::Uuid;

pub mod payload;
pub use payload::*;

/// Protocol version announced in the handshake
pub const PROTOCOL_VERSION: u16 = 1;

/// Channel event types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// Connection handshake (agent -> backend)
    Handshake = 0,
    /// Backend-originated event (order-created, test-print)
    Event = 1,
    /// Agent-originated print outcome (print-succeeded, print-failed)
    Outcome = 2,
}

impl TryFrom<u8> for EventType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(EventType::Handshake),
            1 => Ok(EventType::Event),
            2 => Ok(EventType::Outcome),
            _ => Err(()),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::Handshake => write!(f, "handshake"),
            EventType::Event => write!(f, "event"),
            EventType::Outcome => write!(f, "outcome"),
        }
    }
}

/// Channel message body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusMessage {
    pub request_id: Uuid,
    pub event_type: EventType,
    pub correlation_id: Option<Uuid>,
    pub payload: Vec<u8>,
}

impl BusMessage {
    pub fn new(event_type: EventType, payload: Vec<u8>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            event_type,
            correlation_id: None,
            payload,
        }
    }

    /// Correlate this message to a prior request
    pub fn with_correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = Some(id);
        self
    }

    /// Build a handshake message
    pub fn handshake(payload: &HandshakePayload) -> Result<Self, serde_json::Error> {
        Ok(Self::new(EventType::Handshake, serde_json::to_vec(payload)?))
    }

    /// Build a backend event message
    pub fn event(payload: &EventPayload) -> Result<Self, serde_json::Error> {
        Ok(Self::new(EventType::Event, serde_json::to_vec(payload)?))
    }

    /// Build a print outcome message
    pub fn outcome(payload: &OutcomePayload) -> Result<Self, serde_json::Error> {
        Ok(Self::new(EventType::Outcome, serde_json::to_vec(payload)?))
    }

    /// Parse the payload as the given type
    pub fn parse_payload<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_roundtrip() {
        for et in [EventType::Handshake, EventType::Event, EventType::Outcome] {
            assert_eq!(EventType::try_from(et as u8), Ok(et));
        }
        assert!(EventType::try_from(9).is_err());
    }

    #[test]
    fn test_handshake_message() {
        let payload = HandshakePayload {
            version: PROTOCOL_VERSION,
            agent_name: Some("test-agent".to_string()),
            agent_version: Some("0.1.0".to_string()),
        };

        let msg = BusMessage::handshake(&payload).unwrap();
        assert_eq!(msg.event_type, EventType::Handshake);
        assert!(!msg.request_id.is_nil());

        let parsed: HandshakePayload = msg.parse_payload().unwrap();
        assert_eq!(parsed.version, PROTOCOL_VERSION);
    }

    #[test]
    fn test_outcome_message() {
        let msg = BusMessage::outcome(&OutcomePayload::printed("o1")).unwrap();
        let parsed: OutcomePayload = msg.parse_payload().unwrap();
        assert_eq!(parsed.topic, topic::PRINT_SUCCEEDED);
        assert_eq!(parsed.order_id, "o1");
        assert!(parsed.retry_count.is_none());
    }
}
