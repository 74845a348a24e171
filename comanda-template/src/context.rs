//! Receipt binding context
//!
//! An explicit, pre-formatted view of an order for template rendering.
//! Every placeholder key is enumerated per entity (order, item, option,
//! payment) instead of resolving free-form paths, so template/schema
//! drift surfaces as an empty field here rather than a runtime surprise.
//!
//! All values are formatted to strings up front; the renderer only looks
//! them up. Backend-computed totals are formatted verbatim, never
//! recomputed.

use chrono_tz::Tz;
use rust_decimal::Decimal;
use shared::order::{ItemOption, LineItem, Order, PaymentEntry};

/// Store-level settings that appear on every receipt
#[derive(Debug, Clone)]
pub struct StoreInfo {
    pub header_name: String,
    pub header_city: String,
    /// Timezone used to format the order date/time placeholders
    pub timezone: Tz,
}

impl Default for StoreInfo {
    fn default() -> Self {
        Self {
            header_name: "My Store".to_string(),
            header_city: String::new(),
            timezone: Tz::UTC,
        }
    }
}

/// Binding context for one receipt
#[derive(Debug, Clone)]
pub struct ReceiptContext {
    order: OrderFields,
    pub(crate) items: Vec<ItemFields>,
    pub(crate) payments: Vec<PaymentFields>,
}

#[derive(Debug, Clone)]
struct OrderFields {
    header_name: String,
    header_city: String,
    display_id: String,
    order_date: String,
    order_time: String,
    order_type: String,
    customer_name: String,
    customer_phone: String,
    customer_address: String,
    item_count: String,
    subtotal: String,
    delivery_fee: String,
    discount: String,
    total: String,
    observations: String,
    qr_url: String,
}

#[derive(Debug, Clone)]
pub(crate) struct ItemFields {
    qty: String,
    name: String,
    line_total: String,
    unit_price: String,
    note: String,
    pub(crate) options: Vec<OptionFields>,
}

#[derive(Debug, Clone)]
pub(crate) struct OptionFields {
    qty: String,
    name: String,
    price: String,
}

#[derive(Debug, Clone)]
pub(crate) struct PaymentFields {
    method: String,
    value: String,
}

impl ReceiptContext {
    pub fn new(order: &Order, store: &StoreInfo) -> Self {
        let created = order.created_at.map(|dt| dt.with_timezone(&store.timezone));

        let item_count = order
            .item_count
            .unwrap_or_else(|| order.items.iter().map(|i| i.quantity).sum());

        let fields = OrderFields {
            header_name: store.header_name.clone(),
            header_city: store.header_city.clone(),
            display_id: display_id(order),
            order_date: created
                .map(|dt| dt.format("%d/%m/%Y").to_string())
                .unwrap_or_default(),
            order_time: created
                .map(|dt| dt.format("%H:%M").to_string())
                .unwrap_or_default(),
            order_type: order
                .order_type
                .map(|t| t.label().to_string())
                .unwrap_or_default(),
            customer_name: order
                .customer_name
                .as_deref()
                .unwrap_or("CUSTOMER")
                .to_uppercase(),
            customer_phone: order.customer_phone.clone().unwrap_or_default(),
            customer_address: order.address.clone().unwrap_or_default(),
            item_count: item_count.to_string(),
            subtotal: money(order.subtotal),
            delivery_fee: money_or_empty(order.delivery_fee),
            discount: money_or_empty(order.discount),
            total: money(order.total),
            observations: order.observations.clone().unwrap_or_default(),
            qr_url: order.qr_text.clone().unwrap_or_default(),
        };

        Self {
            order: fields,
            items: order.items.iter().map(ItemFields::new).collect(),
            payments: order.payments.iter().map(PaymentFields::new).collect(),
        }
    }

    /// Resolve an order-level key; `None` for unknown keys
    pub(crate) fn order_field(&self, key: &str) -> Option<&str> {
        let f = &self.order;
        let v: &str = match key {
            "header_name" => &f.header_name,
            "header_city" => &f.header_city,
            "display_id" => &f.display_id,
            "order_date" => &f.order_date,
            "order_time" => &f.order_time,
            "order_type" => &f.order_type,
            "customer_name" => &f.customer_name,
            "customer_phone" => &f.customer_phone,
            "customer_address" => &f.customer_address,
            "item_count" => &f.item_count,
            "subtotal" => &f.subtotal,
            "delivery_fee" => &f.delivery_fee,
            "discount" => &f.discount,
            "total" => &f.total,
            "observations" => &f.observations,
            "qr_url" => &f.qr_url,
            _ => return None,
        };
        Some(v)
    }
}

impl ItemFields {
    fn new(item: &LineItem) -> Self {
        let line_total = Decimal::from(item.quantity) * item.price;
        Self {
            qty: item.quantity.to_string(),
            name: item.name.clone(),
            line_total: money(line_total),
            unit_price: money(item.price),
            note: item.note.clone().unwrap_or_default(),
            options: item.options.iter().map(OptionFields::new).collect(),
        }
    }

    pub(crate) fn field(&self, key: &str) -> Option<&str> {
        let v: &str = match key {
            "item_qty" => &self.qty,
            "item_name" => &self.name,
            "item_price" => &self.line_total,
            "item_unit_price" => &self.unit_price,
            "item_note" => &self.note,
            _ => return None,
        };
        Some(v)
    }
}

impl OptionFields {
    fn new(option: &ItemOption) -> Self {
        Self {
            qty: option.quantity.to_string(),
            name: option.name.clone(),
            price: money(option.price),
        }
    }

    pub(crate) fn field(&self, key: &str) -> Option<&str> {
        let v: &str = match key {
            "option_qty" => &self.qty,
            "option_name" => &self.name,
            "option_price" => &self.price,
            _ => return None,
        };
        Some(v)
    }
}

impl PaymentFields {
    fn new(payment: &PaymentEntry) -> Self {
        Self {
            method: payment.method.to_uppercase(),
            value: money(payment.value),
        }
    }

    pub(crate) fn field(&self, key: &str) -> Option<&str> {
        let v: &str = match key {
            "payment_method" => &self.method,
            "payment_value" => &self.value,
            _ => return None,
        };
        Some(v)
    }
}

fn display_id(order: &Order) -> String {
    match &order.display_id {
        Some(id) => format!("{:0>2}", id),
        None => order.id.chars().take(6).collect(),
    }
}

fn money(value: Decimal) -> String {
    format!("{:.2}", value)
}

/// Zero amounts format to the empty string so `{{#if}}` hides their line
fn money_or_empty(value: Decimal) -> String {
    if value.is_zero() {
        String::new()
    } else {
        money(value)
    }
}
