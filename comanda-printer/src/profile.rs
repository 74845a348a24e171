//! Printer profile configuration
//!
//! Long-lived description of one physical printer: command dialect,
//! connection descriptor, paper width and operation timeout. Loaded once
//! at startup, read-only afterwards.

use std::str::FromStr;
use std::time::Duration;

use crate::error::PrintError;

/// Command dialect the printer understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProfileKind {
    /// ESC/POS (Epson and the many compatibles)
    #[default]
    EscPos,
    /// Star line mode
    Star,
}

impl FromStr for ProfileKind {
    type Err = PrintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "escpos" | "epson" => Ok(ProfileKind::EscPos),
            "star" => Ok(ProfileKind::Star),
            other => Err(PrintError::InvalidConfig(format!(
                "Unknown printer profile: {}",
                other
            ))),
        }
    }
}

/// Configuration for one printer
#[derive(Debug, Clone)]
pub struct PrinterProfile {
    /// Logical name used for job routing ("default" unless configured)
    pub name: String,
    pub kind: ProfileKind,
    /// Connection descriptor: `tcp://host:port`, `file:///dev/usb/lp0`,
    /// a bare device path, or `dry-run:`
    pub uri: String,
    /// Paper width in characters
    pub width: usize,
    /// Per-send operation timeout
    pub timeout: Duration,
}

impl PrinterProfile {
    pub fn new(name: impl Into<String>, kind: ProfileKind, uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            uri: uri.into(),
            width: 48,
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Convert paper width in millimetres to ESC/POS columns
///
/// 80mm paper prints 48 columns, 58mm paper prints 32.
pub fn mm_to_columns(mm: u32) -> usize {
    if mm >= 70 {
        48
    } else if mm >= 50 {
        32
    } else {
        48
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_kind_parsing() {
        assert_eq!("escpos".parse::<ProfileKind>().unwrap(), ProfileKind::EscPos);
        assert_eq!("EPSON".parse::<ProfileKind>().unwrap(), ProfileKind::EscPos);
        assert_eq!("star".parse::<ProfileKind>().unwrap(), ProfileKind::Star);
        assert!("dotmatrix".parse::<ProfileKind>().is_err());
    }

    #[test]
    fn test_mm_to_columns() {
        assert_eq!(mm_to_columns(80), 48);
        assert_eq!(mm_to_columns(70), 48);
        assert_eq!(mm_to_columns(58), 32);
        assert_eq!(mm_to_columns(10), 48);
    }
}
