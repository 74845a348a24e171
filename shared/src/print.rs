//! Neutral print directive IR
//!
//! Rendering produces a flat, ordered sequence of directives, decoupled
//! from any physical printer's command set. The printer crate translates
//! the sequence into profile-specific bytes.

use serde::{Deserialize, Serialize};

/// One print operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Directive {
    /// A single text line (no trailing newline)
    Text(String),
    /// A QR code carrying the resolved payload
    Qr(String),
    /// Cut the paper
    Cut,
}

/// The full rendered output for one receipt
pub type DirectiveSequence = Vec<Directive>;

impl Directive {
    pub fn is_cut(&self) -> bool {
        matches!(self, Directive::Cut)
    }
}
