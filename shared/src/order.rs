//! Order value model
//!
//! The immutable order received from the backend in an `order-created`
//! event. Totals are pre-computed by the backend; this side only formats
//! them and never recomputes or re-balances them against line items.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Delivery vs pickup classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    #[default]
    Delivery,
    Pickup,
}

impl OrderType {
    /// Label as printed on the receipt
    pub fn label(&self) -> &'static str {
        match self {
            OrderType::Delivery => "DELIVERY",
            OrderType::Pickup => "PICKUP",
        }
    }
}

/// An option/extra attached to a line item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemOption {
    pub name: String,
    #[serde(default = "default_qty")]
    pub quantity: u32,
    #[serde(default)]
    pub price: Decimal,
}

/// A single ordered item, with its options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    #[serde(default = "default_qty")]
    pub quantity: u32,
    /// Unit price; the line total is quantity x price
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub options: Vec<ItemOption>,
}

/// One payment method entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentEntry {
    pub method: String,
    #[serde(default)]
    pub value: Decimal,
}

/// The order as delivered by the backend
///
/// Optional fields may be absent on the wire; deserialization must not
/// fail for a partially-populated order (print-at-any-cost).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    #[serde(default)]
    pub display_id: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub order_type: Option<OrderType>,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub payments: Vec<PaymentEntry>,
    #[serde(default)]
    pub subtotal: Decimal,
    #[serde(default)]
    pub delivery_fee: Decimal,
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub total: Decimal,
    #[serde(default)]
    pub item_count: Option<u32>,
    #[serde(default)]
    pub observations: Option<String>,
    #[serde(default)]
    pub qr_text: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Event metadata: route to a named printer instead of the default
    #[serde(default)]
    pub printer: Option<String>,
    /// Event metadata: number of physical copies (clamped to 1..=10)
    #[serde(default)]
    pub copies: Option<u32>,
}

fn default_qty() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_from_minimal_json() {
        // Only the id is mandatory
        let order: Order = serde_json::from_str(r#"{"id": "o1"}"#).unwrap();
        assert_eq!(order.id, "o1");
        assert!(order.items.is_empty());
        assert_eq!(order.total, Decimal::ZERO);
        assert!(order.qr_text.is_none());
    }

    #[test]
    fn test_order_from_full_event() {
        let json = r#"{
            "id": "o1",
            "displayId": "42",
            "customerName": "Maria",
            "customerPhone": "(11) 99999-0000",
            "address": "Rua A, 10",
            "orderType": "DELIVERY",
            "items": [
                {"name": "X", "quantity": 2, "price": 20,
                 "note": "no onions",
                 "options": [{"name": "Cheese", "quantity": 1, "price": 3.5}]}
            ],
            "payments": [{"method": "cash", "value": 43.5}],
            "subtotal": 43.5,
            "deliveryFee": 5,
            "discount": 0,
            "total": 48.5,
            "qrText": "http://x/o1"
        }"#;
        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.display_id.as_deref(), Some("42"));
        assert_eq!(order.order_type, Some(OrderType::Delivery));
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].quantity, 2);
        assert_eq!(order.items[0].options[0].name, "Cheese");
        assert_eq!(order.total, Decimal::new(485, 1));
        assert_eq!(order.qr_text.as_deref(), Some("http://x/o1"));
    }

    #[test]
    fn test_unknown_order_type_is_rejected() {
        let res: Result<Order, _> =
            serde_json::from_str(r#"{"id": "o1", "orderType": "DRIVE_THRU"}"#);
        assert!(res.is_err());
    }
}
