//! Transport ports for sending raw printer data
//!
//! Supports:
//! - Network printers (raw TCP, port 9100)
//! - Character-device printers (USB/serial via device file)
//! - Dry-run (build and discard, for setups without a reachable device)

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info, instrument, warn};

use crate::error::{PrintError, PrintResult};

/// Result of a connectivity probe
///
/// `Unknown` means the transport cannot observe reachability at all:
/// commands being well-formed is not the same as the printer being
/// physically reachable, and callers must not conflate the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    Connected,
    Disconnected,
    Unknown,
}

/// Trait for printer transports
#[async_trait]
pub trait PrinterPort: Send + Sync + std::fmt::Debug {
    /// Send raw command bytes to the printer
    async fn send(&self, data: &[u8]) -> PrintResult<()>;

    /// Check whether the printer is reachable
    async fn probe(&self) -> Probe;
}

/// Network printer port (raw TCP)
///
/// Most thermal printers accept raw command streams on TCP port 9100.
/// A fresh connection is made per job; thermal printers drop idle
/// connections quickly, so holding one open buys nothing.
#[derive(Debug, Clone)]
pub struct TcpPort {
    addr: String,
    connect_timeout: Duration,
}

impl TcpPort {
    pub fn new(addr: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            connect_timeout,
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

#[async_trait]
impl PrinterPort for TcpPort {
    #[instrument(skip(data), fields(addr = %self.addr, data_len = data.len()))]
    async fn send(&self, data: &[u8]) -> PrintResult<()> {
        let mut stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| PrintError::Timeout(format!("Connection timeout: {}", self.addr)))?
            .map_err(|e| PrintError::Connection(format!("{}: {}", self.addr, e)))?;

        debug!("Connected, sending {} bytes", data.len());

        stream.write_all(data).await?;
        stream.flush().await?;

        info!("Print data sent");
        Ok(())
    }

    #[instrument(fields(addr = %self.addr))]
    async fn probe(&self) -> Probe {
        let check_timeout = Duration::from_millis(500);

        match tokio::time::timeout(check_timeout, TcpStream::connect(&self.addr)).await {
            Ok(Ok(_)) => Probe::Connected,
            Ok(Err(e)) => {
                warn!(error = %e, "Printer unreachable");
                Probe::Disconnected
            }
            Err(_) => {
                warn!("Printer probe timeout");
                Probe::Disconnected
            }
        }
    }
}

/// Character-device printer port (USB or serial)
///
/// Writes the raw command stream to a device node such as
/// `/dev/usb/lp0` or `/dev/ttyUSB0`.
#[derive(Debug, Clone)]
pub struct FilePort {
    path: PathBuf,
}

impl FilePort {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PrinterPort for FilePort {
    #[instrument(skip(data), fields(path = %self.path.display(), data_len = data.len()))]
    async fn send(&self, data: &[u8]) -> PrintResult<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .open(&self.path)
            .await?;
        file.write_all(data).await?;
        file.flush().await?;

        info!("Print data written");
        Ok(())
    }

    async fn probe(&self) -> Probe {
        if self.path.exists() {
            Probe::Connected
        } else {
            Probe::Disconnected
        }
    }
}

/// Dry-run port: commands are built and validated, then discarded
///
/// Probe always reports `Unknown`: this port can only tell that the
/// command stream is well-formed, not that any device is reachable.
#[derive(Debug, Clone, Default)]
pub struct DryRunPort;

#[async_trait]
impl PrinterPort for DryRunPort {
    async fn send(&self, data: &[u8]) -> PrintResult<()> {
        info!(data_len = data.len(), "Dry run, discarding print data");
        Ok(())
    }

    async fn probe(&self) -> Probe {
        Probe::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tcp_probe_unreachable() {
        // Reserved TEST-NET address, nothing listens there
        let port = TcpPort::new("192.0.2.1:9100", Duration::from_millis(100));
        assert_eq!(port.probe().await, Probe::Disconnected);
    }

    #[tokio::test]
    async fn test_tcp_send_to_local_listener() {
        use tokio::io::AsyncReadExt;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            sock.read_to_end(&mut buf).await.unwrap();
            buf
        });

        let port = TcpPort::new(addr.to_string(), Duration::from_secs(1));
        port.send(b"hello printer").await.unwrap();
        drop(port);

        let received = server.await.unwrap();
        assert_eq!(received, b"hello printer");
    }

    #[tokio::test]
    async fn test_file_port_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lp0");
        std::fs::write(&path, b"").unwrap();

        let port = FilePort::new(&path);
        assert_eq!(port.probe().await, Probe::Connected);
        port.send(b"\x1B\x40data").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"\x1B\x40data");
    }

    #[tokio::test]
    async fn test_file_port_missing_device() {
        let port = FilePort::new("/nonexistent/lp9");
        assert_eq!(port.probe().await, Probe::Disconnected);
        assert!(port.send(b"x").await.is_err());
    }

    #[tokio::test]
    async fn test_dry_run_probe_is_unknown() {
        let port = DryRunPort;
        assert_eq!(port.probe().await, Probe::Unknown);
        port.send(b"anything").await.unwrap();
    }
}
