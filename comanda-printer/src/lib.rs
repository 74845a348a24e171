//! # comanda-printer
//!
//! Thermal printer driver adapter - low-level printing capabilities only.
//!
//! ## Scope
//!
//! This crate handles HOW to print:
//! - ESC/POS and Star line-mode command building
//! - Windows-1252 encoding for Latin-script receipts
//! - Transport ports: raw TCP (port 9100), device file, dry-run
//! - The `open` / `send` / `probe` adapter surface
//!
//! Business logic (WHAT to print) stays in the agent and the template
//! crate; this crate consumes the neutral directive sequence.
//!
//! ## Example
//!
//! ```ignore
//! use comanda_printer::{PrinterHandle, PrinterProfile, ProfileKind};
//! use shared::print::Directive;
//!
//! let profile = PrinterProfile::new("front", ProfileKind::EscPos, "tcp://192.168.1.50:9100");
//! let handle = PrinterHandle::open(&profile)?;
//! handle.send(&[Directive::Text("hello".into()), Directive::Cut]).await?;
//! ```

mod adapter;
mod encoding;
mod error;
mod escpos;
mod port;
mod profile;
mod star;

pub use adapter::{PrinterHandle, encode_directives};
pub use encoding::{codepage_width, convert_to_codepage, pad_codepage, truncate_codepage};
pub use error::{PrintError, PrintResult};
pub use escpos::EscPosBuilder;
pub use port::{DryRunPort, FilePort, Probe, PrinterPort, TcpPort};
pub use profile::{PrinterProfile, ProfileKind, mm_to_columns};
pub use star::StarBuilder;
