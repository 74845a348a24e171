//! Channel transport layer
//!
//! Frame layout, in order: event type (1 byte), request id (16 bytes),
//! correlation id (16 bytes, nil means none), payload length (4 bytes,
//! little-endian), JSON payload.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{Mutex, broadcast};
use uuid::Uuid;

use crate::channel::ChannelError;
use shared::message::{BusMessage, EventType};

/// Transport abstraction for channel communication
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    async fn read_message(&self) -> Result<BusMessage, ChannelError>;
    async fn write_message(&self, msg: &BusMessage) -> Result<(), ChannelError>;
}

/// TCP transport
#[derive(Debug, Clone)]
pub struct TcpTransport {
    reader: Arc<Mutex<OwnedReadHalf>>,
    writer: Arc<Mutex<OwnedWriteHalf>>,
}

impl TcpTransport {
    pub async fn connect(addr: &str) -> Result<Self, ChannelError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| ChannelError::Connection(e.to_string()))?;
        Ok(Self::from_stream(stream))
    }

    /// Wrap an already-established stream (server side, tests)
    pub fn from_stream(stream: TcpStream) -> Self {
        let (reader, writer) = stream.into_split();
        Self {
            reader: Arc::new(Mutex::new(reader)),
            writer: Arc::new(Mutex::new(writer)),
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn read_message(&self) -> Result<BusMessage, ChannelError> {
        let mut reader = self.reader.lock().await;

        // Event type (1 byte)
        let mut type_buf = [0u8; 1];
        reader
            .read_exact(&mut type_buf)
            .await
            .map_err(ChannelError::Io)?;

        let event_type = EventType::try_from(type_buf[0])
            .map_err(|_| ChannelError::InvalidMessage(format!("Event type {}", type_buf[0])))?;

        // Request id (16 bytes)
        let mut uuid_buf = [0u8; 16];
        reader
            .read_exact(&mut uuid_buf)
            .await
            .map_err(ChannelError::Io)?;
        let request_id = Uuid::from_bytes(uuid_buf);

        // Correlation id (16 bytes, nil = none)
        let mut correlation_buf = [0u8; 16];
        reader
            .read_exact(&mut correlation_buf)
            .await
            .map_err(ChannelError::Io)?;
        let correlation_raw = Uuid::from_bytes(correlation_buf);
        let correlation_id = if correlation_raw.is_nil() {
            None
        } else {
            Some(correlation_raw)
        };

        // Payload length (4 bytes LE) + payload
        let mut len_buf = [0u8; 4];
        reader
            .read_exact(&mut len_buf)
            .await
            .map_err(ChannelError::Io)?;
        let len = u32::from_le_bytes(len_buf) as usize;

        let mut payload = vec![0u8; len];
        reader
            .read_exact(&mut payload)
            .await
            .map_err(ChannelError::Io)?;

        Ok(BusMessage {
            request_id,
            event_type,
            correlation_id,
            payload,
        })
    }

    async fn write_message(&self, msg: &BusMessage) -> Result<(), ChannelError> {
        let mut writer = self.writer.lock().await;

        let mut data = Vec::with_capacity(37 + msg.payload.len());
        data.push(msg.event_type as u8);
        data.extend_from_slice(msg.request_id.as_bytes());
        data.extend_from_slice(msg.correlation_id.unwrap_or(Uuid::nil()).as_bytes());
        data.extend_from_slice(&(msg.payload.len() as u32).to_le_bytes());
        data.extend_from_slice(&msg.payload);

        writer.write_all(&data).await.map_err(ChannelError::Io)?;
        Ok(())
    }
}

/// In-memory transport for in-process communication and tests
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    /// Messages FROM the backend
    rx: Arc<Mutex<broadcast::Receiver<BusMessage>>>,
    /// Messages TO the backend
    tx: broadcast::Sender<BusMessage>,
}

impl MemoryTransport {
    /// Create a memory transport
    ///
    /// * `backend_tx` - the backend's broadcast sender (subscribed for reads)
    /// * `agent_tx` - the channel writes are sent to
    pub fn new(backend_tx: &broadcast::Sender<BusMessage>, agent_tx: &broadcast::Sender<BusMessage>) -> Self {
        Self {
            rx: Arc::new(Mutex::new(backend_tx.subscribe())),
            tx: agent_tx.clone(),
        }
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn read_message(&self) -> Result<BusMessage, ChannelError> {
        let mut rx = self.rx.lock().await;
        rx.recv()
            .await
            .map_err(|e| ChannelError::Connection(format!("Memory channel error: {}", e)))
    }

    async fn write_message(&self, msg: &BusMessage) -> Result<(), ChannelError> {
        self.tx
            .send(msg.clone())
            .map_err(|e| ChannelError::Connection(format!("Failed to send to backend: {}", e)))?;
        Ok(())
    }
}
