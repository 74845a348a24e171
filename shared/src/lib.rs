//! Shared types for the comanda print agent.
//!
//! These types cross crate boundaries:
//! - `order`: the immutable order value received from the backend
//! - `message`: channel wire messages and payloads
//! - `print`: the neutral print directive IR produced by rendering

pub mod message;
pub mod order;
pub mod print;

pub use message::{BusMessage, EventType};
pub use order::{ItemOption, LineItem, Order, OrderType, PaymentEntry};
pub use print::{Directive, DirectiveSequence};
