use serde::{Deserialize, Serialize};

/// Well-known event topics carried on the channel
pub mod topic {
    /// Backend -> agent: a new order to print
    pub const ORDER_CREATED: &str = "order-created";
    /// Backend -> agent: print a synthetic sample receipt
    pub const TEST_PRINT: &str = "test-print";
    /// Agent -> backend: the job reached `Printed`
    pub const PRINT_SUCCEEDED: &str = "print-succeeded";
    /// Agent -> backend: the job reached `Failed`
    pub const PRINT_FAILED: &str = "print-failed";
}

/// Handshake payload (agent -> backend)
///
/// Announces the protocol version so the backend can reject incompatible
/// agents early.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandshakePayload {
    pub version: u16,
    pub agent_name: Option<String>,
    pub agent_version: Option<String>,
}

/// Backend event payload (backend -> agent)
///
/// `data` carries the topic-specific body; for `order-created` it is the
/// order object of the inbound event contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventPayload {
    pub topic: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl EventPayload {
    pub fn new(topic: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            topic: topic.into(),
            data,
        }
    }
}

/// Print outcome payload (agent -> backend)
///
/// Exactly one of these is emitted per job, correlated by order id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomePayload {
    pub topic: String,
    pub order_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_count: Option<u32>,
}

impl OutcomePayload {
    pub fn printed(order_id: impl Into<String>) -> Self {
        Self {
            topic: topic::PRINT_SUCCEEDED.to_string(),
            order_id: order_id.into(),
            reason: None,
            retry_count: None,
        }
    }

    pub fn failed(
        order_id: impl Into<String>,
        reason: impl Into<String>,
        retry_count: u32,
    ) -> Self {
        Self {
            topic: topic::PRINT_FAILED.to_string(),
            order_id: order_id.into(),
            reason: Some(reason.into()),
            retry_count: Some(retry_count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_wire_names_are_camel_case() {
        let json =
            serde_json::to_value(OutcomePayload::failed("o1", "printer offline", 3)).unwrap();
        assert_eq!(json["orderId"], "o1");
        assert_eq!(json["retryCount"], 3);
        assert_eq!(json["reason"], "printer offline");
    }

    #[test]
    fn test_event_payload_defaults_data() {
        let p: EventPayload = serde_json::from_str(r#"{"topic": "order-created"}"#).unwrap();
        assert_eq!(p.topic, topic::ORDER_CREATED);
        assert!(p.data.is_null());
    }
}
