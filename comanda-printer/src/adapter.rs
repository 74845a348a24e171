//! Printer driver adapter
//!
//! Ties a profile, a command dialect and a transport port together
//! behind the `open` / `send` / `probe` surface. The adapter consumes
//! the neutral directive sequence; everything printer-specific happens
//! here.

use shared::print::Directive;
use tracing::instrument;

use crate::error::{PrintError, PrintResult};
use crate::escpos::EscPosBuilder;
use crate::port::{DryRunPort, FilePort, Probe, PrinterPort, TcpPort};
use crate::profile::{PrinterProfile, ProfileKind};
use crate::star::StarBuilder;

/// An opened printer
///
/// Owns its transport port exclusively; per-printer serialization is the
/// caller's responsibility (one worker per handle, one send in flight).
#[derive(Debug)]
pub struct PrinterHandle {
    profile: PrinterProfile,
    port: Box<dyn PrinterPort>,
}

impl PrinterHandle {
    /// Open a printer from its profile
    ///
    /// Parses the connection descriptor and constructs the matching
    /// transport. Fails on a malformed descriptor; physical reachability
    /// is observed by `probe` and by `send` itself.
    pub fn open(profile: &PrinterProfile) -> PrintResult<Self> {
        let uri = profile.uri.trim();

        let port: Box<dyn PrinterPort> = if uri == "dry-run:" || uri == "dry-run" {
            Box::new(DryRunPort)
        } else if let Some(addr) = uri.strip_prefix("tcp://") {
            if addr.is_empty() {
                return Err(PrintError::InvalidConfig(format!(
                    "Empty printer address: {}",
                    uri
                )));
            }
            let addr = if addr.contains(':') {
                addr.to_string()
            } else {
                format!("{}:9100", addr)
            };
            Box::new(TcpPort::new(addr, profile.timeout))
        } else if let Some(path) = uri.strip_prefix("file://") {
            Box::new(FilePort::new(path))
        } else if uri.starts_with('/') {
            Box::new(FilePort::new(uri))
        } else {
            return Err(PrintError::InvalidConfig(format!(
                "Unsupported printer descriptor: {}",
                uri
            )));
        };

        Ok(Self {
            profile: profile.clone(),
            port,
        })
    }

    /// Open a printer over an already-constructed port
    ///
    /// Used for in-process ports (mocks, capturing ports) where the
    /// descriptor parsing of [`PrinterHandle::open`] does not apply.
    pub fn with_port(profile: &PrinterProfile, port: Box<dyn PrinterPort>) -> Self {
        Self {
            profile: profile.clone(),
            port,
        }
    }

    pub fn profile(&self) -> &PrinterProfile {
        &self.profile
    }

    /// Encode and send one directive sequence to the device
    ///
    /// The whole operation runs under the profile timeout; a timeout is
    /// reported as [`PrintError::Timeout`] and is retryable like any
    /// other send failure.
    #[instrument(skip(self, directives), fields(printer = %self.profile.name, directives = directives.len()))]
    pub async fn send(&self, directives: &[Directive]) -> PrintResult<()> {
        let data = encode_directives(self.profile.kind, directives, self.profile.width);

        tokio::time::timeout(self.profile.timeout, self.port.send(&data))
            .await
            .map_err(|_| {
                PrintError::Timeout(format!("Printer {} did not respond", self.profile.name))
            })?
    }

    /// Check device reachability
    pub async fn probe(&self) -> Probe {
        self.port.probe().await
    }
}

/// Translate a directive sequence into profile-specific command bytes
pub fn encode_directives(kind: ProfileKind, directives: &[Directive], width: usize) -> Vec<u8> {
    match kind {
        ProfileKind::EscPos => {
            let mut b = EscPosBuilder::new(width);
            for directive in directives {
                match directive {
                    Directive::Text(line) => {
                        b.line(line);
                    }
                    Directive::Qr(payload) => {
                        b.center();
                        b.qr_code(payload, 6);
                        b.left();
                    }
                    Directive::Cut => {
                        b.cut_feed(3);
                    }
                }
            }
            b.build()
        }
        ProfileKind::Star => {
            let mut b = StarBuilder::new(width);
            for directive in directives {
                match directive {
                    Directive::Text(line) => {
                        b.line(line);
                    }
                    Directive::Qr(payload) => {
                        b.center();
                        b.qr_code(payload, 4);
                        b.left();
                    }
                    Directive::Cut => {
                        b.cut();
                    }
                }
            }
            b.build()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Directive> {
        vec![
            Directive::Text("2x X  20.00".to_string()),
            Directive::Qr("http://x/o1".to_string()),
            Directive::Cut,
        ]
    }

    #[test]
    fn test_open_parses_descriptors() {
        let p = |uri: &str| PrinterProfile::new("t", ProfileKind::EscPos, uri);

        assert!(PrinterHandle::open(&p("dry-run:")).is_ok());
        assert!(PrinterHandle::open(&p("tcp://192.168.1.50:9100")).is_ok());
        assert!(PrinterHandle::open(&p("tcp://192.168.1.50")).is_ok());
        assert!(PrinterHandle::open(&p("file:///dev/usb/lp0")).is_ok());
        assert!(PrinterHandle::open(&p("/dev/usb/lp0")).is_ok());

        assert!(matches!(
            PrinterHandle::open(&p("lpt1")),
            Err(PrintError::InvalidConfig(_))
        ));
        assert!(matches!(
            PrinterHandle::open(&p("tcp://")),
            Err(PrintError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_escpos_encoding_contains_text_qr_cut() {
        let data = encode_directives(ProfileKind::EscPos, &sample(), 48);
        let s = String::from_utf8_lossy(&data);
        assert!(s.contains("2x X  20.00\n"));
        assert!(s.contains("http://x/o1"));
        assert!(data.windows(3).any(|w| w == [0x1D, 0x56, 0x42]));
    }

    #[test]
    fn test_star_encoding_uses_star_dialect() {
        let data = encode_directives(ProfileKind::Star, &sample(), 48);
        let s = String::from_utf8_lossy(&data);
        assert!(s.contains("2x X  20.00\n"));
        assert!(s.contains("http://x/o1"));
        assert!(data.windows(3).any(|w| w == [0x1B, 0x64, 0x03]));
        assert!(!data.windows(2).any(|w| w == [0x1D, 0x56]));
    }

    #[tokio::test]
    async fn test_dry_run_send_succeeds() {
        let profile = PrinterProfile::new("t", ProfileKind::EscPos, "dry-run:");
        let handle = PrinterHandle::open(&profile).unwrap();
        handle.send(&sample()).await.unwrap();
        assert_eq!(handle.probe().await, Probe::Unknown);
    }
}
