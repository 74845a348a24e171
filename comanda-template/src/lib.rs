//! # comanda-template
//!
//! Receipt template language: compiler and renderer.
//!
//! ## Grammar
//!
//! - `{{name}}`: scalar placeholder; unresolved names render as the
//!   empty string, never an error
//! - `{{#each collection}} ... {{/each}}`: repeating block, may nest
//!   (item options inside items)
//! - `{{#if name}} ... {{/if}}`: conditional block; a missing field,
//!   the empty string, `"0"` and `"0.00"` are falsy
//! - `[QR:{{name}}]`: QR code directive, must be alone on its line
//!   (checked at compile time)
//!
//! Compilation is pure and loud: block-balance violations and misplaced
//! QR markers fail with a [`CompileError`] carrying the byte offset, so a
//! bad template is rejected at load time instead of failing per order.
//! Rendering is infallible by design: a receipt with an empty field is
//! acceptable, a receipt that does not print is not.
//!
//! ## Example
//!
//! ```
//! use comanda_template::{CompiledTemplate, ReceiptContext, StoreInfo, render};
//! use shared::order::Order;
//!
//! let tpl = CompiledTemplate::compile("ORDER {{display_id}}\n").unwrap();
//! let order: Order = serde_json::from_str(r#"{"id": "abc123"}"#).unwrap();
//! let ctx = ReceiptContext::new(&order, &StoreInfo::default());
//! let directives = render(&tpl, &ctx);
//! ```

mod assets;
mod compiler;
mod context;
mod render;

pub use assets::DEFAULT_TEMPLATE;
pub use compiler::{CompileError, CompiledTemplate, Node};
pub use context::{ReceiptContext, StoreInfo};
pub use render::render;
