//! Channel intake
//!
//! Owns the backend subscription: connects, handshakes, turns
//! `order-created` events into print jobs, and reports each job's
//! terminal outcome back as exactly one ack event.

use std::sync::Arc;

use rust_decimal::Decimal;
use shared::message::{
    BusMessage, EventPayload, EventType, HandshakePayload, OutcomePayload, PROTOCOL_VERSION, topic,
};
use shared::order::{LineItem, Order};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::channel::{ChannelConfig, ChannelError, TcpTransport, Transport};
use crate::dispatch::{DispatchError, Dispatcher, PrintOutcome};

pub struct Intake {
    addr: String,
    config: ChannelConfig,
    dispatcher: Arc<Dispatcher>,
    outcome_rx: mpsc::Receiver<PrintOutcome>,
}

impl Intake {
    pub fn new(
        addr: String,
        config: ChannelConfig,
        dispatcher: Arc<Dispatcher>,
        outcome_rx: mpsc::Receiver<PrintOutcome>,
    ) -> Self {
        Self {
            addr,
            config,
            dispatcher,
            outcome_rx,
        }
    }

    /// Connect-and-serve forever, reconnecting with exponential backoff
    ///
    /// Disconnection suspends intake only: no events are silently lost
    /// (the backend simply cannot deliver until we are back), and
    /// printers keep draining jobs that are already queued.
    pub async fn run(mut self, shutdown: CancellationToken) {
        let mut delay = self.config.reconnect_delay;

        loop {
            let transport = tokio::select! {
                _ = shutdown.cancelled() => return,
                res = TcpTransport::connect(&self.addr) => match res {
                    Ok(t) => t,
                    Err(e) => {
                        warn!(addr = %self.addr, error = %e, delay = ?delay, "channel connect failed");
                        tokio::select! {
                            _ = shutdown.cancelled() => return,
                            _ = tokio::time::sleep(delay) => {}
                        }
                        delay = (delay * 2).min(self.config.max_reconnect_delay);
                        continue;
                    }
                },
            };

            delay = self.config.reconnect_delay;
            info!(addr = %self.addr, "channel connected");

            match self.serve(transport, &shutdown).await {
                Ok(()) => return,
                Err(e) => warn!(error = %e, "channel disconnected"),
            }
        }
    }

    /// Serve one established connection until it drops or shutdown
    ///
    /// Public so an in-process transport can drive the agent without a
    /// TCP listener.
    pub async fn serve<T>(
        &mut self,
        transport: T,
        shutdown: &CancellationToken,
    ) -> Result<(), ChannelError>
    where
        T: Transport + Clone + 'static,
    {
        let handshake = HandshakePayload {
            version: PROTOCOL_VERSION,
            agent_name: Some("comanda-agent".to_string()),
            agent_version: Some(env!("CARGO_PKG_VERSION").to_string()),
        };
        transport
            .write_message(&BusMessage::handshake(&handshake)?)
            .await?;

        // Dedicated reader task so a half-read frame is never abandoned
        // mid-select; the loop below only touches cancel-safe channels.
        let (msg_tx, mut msg_rx) = mpsc::channel::<BusMessage>(64);
        let reader = {
            let transport = transport.clone();
            tokio::spawn(async move {
                loop {
                    match transport.read_message().await {
                        Ok(msg) => {
                            if msg_tx.send(msg).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            debug!(error = %e, "channel read ended");
                            break;
                        }
                    }
                }
            })
        };

        let result = loop {
            tokio::select! {
                _ = shutdown.cancelled() => break Ok(()),
                msg = msg_rx.recv() => {
                    match msg {
                        Some(msg) => self.handle_message(msg),
                        None => break Err(ChannelError::Connection("connection lost".to_string())),
                    }
                }
                outcome = self.outcome_rx.recv() => {
                    // Outcome channel closing means dispatch is gone;
                    // nothing left to report.
                    let Some(outcome) = outcome else { break Ok(()) };
                    self.send_ack(&transport, outcome).await;
                }
            }
        };

        reader.abort();
        result
    }

    fn handle_message(&self, msg: BusMessage) {
        match msg.event_type {
            EventType::Event => {
                let payload: EventPayload = match msg.parse_payload() {
                    Ok(p) => p,
                    Err(e) => {
                        warn!(error = %e, "undecodable event payload");
                        return;
                    }
                };
                match payload.topic.as_str() {
                    topic::ORDER_CREATED => self.handle_order(payload.data),
                    topic::TEST_PRINT => self.handle_test_print(),
                    other => debug!(topic = other, "ignoring event"),
                }
            }
            other => debug!(event_type = %other, "ignoring message"),
        }
    }

    fn handle_order(&self, data: serde_json::Value) {
        let order: Order = match serde_json::from_value(data) {
            Ok(o) => o,
            Err(e) => {
                warn!(error = %e, "malformed order event, not printable");
                return;
            }
        };

        let order_id = order.id.clone();
        match self.dispatcher.enqueue(order) {
            Ok(seq) => info!(order_id = %order_id, seq, "order enqueued"),
            Err(DispatchError::Duplicate { .. }) => {
                info!(order_id = %order_id, "duplicate delivery while job in flight, ignored");
            }
            Err(e) => error!(order_id = %order_id, error = %e, "order could not be enqueued"),
        }
    }

    /// A backend-triggered sample receipt through the normal pipeline
    fn handle_test_print(&self) {
        let order = Order {
            id: format!("test-{}", Uuid::new_v4()),
            display_id: Some("00".to_string()),
            customer_name: Some("PRINT TEST".to_string()),
            customer_phone: Some("(00) 0000-0000".to_string()),
            address: Some("Test address".to_string()),
            order_type: None,
            items: vec![LineItem {
                name: "Test item".to_string(),
                quantity: 1,
                price: Decimal::from(10),
                note: None,
                options: Vec::new(),
            }],
            payments: Vec::new(),
            subtotal: Decimal::from(10),
            delivery_fee: Decimal::ZERO,
            discount: Decimal::ZERO,
            total: Decimal::from(10),
            item_count: None,
            observations: None,
            qr_text: None,
            created_at: Some(chrono::Utc::now()),
            printer: None,
            copies: Some(1),
        };

        info!(order_id = %order.id, "test print requested");
        if let Err(e) = self.dispatcher.enqueue(order) {
            error!(error = %e, "test print could not be enqueued");
        }
    }

    /// Report one terminal outcome, with a short bounded retry
    ///
    /// If every attempt fails the ack is dropped and logged loudly; the
    /// backend owns durable order state and treats a missing ack as a
    /// printing timeout.
    async fn send_ack<T: Transport>(&self, transport: &T, outcome: PrintOutcome) {
        let payload = match &outcome {
            PrintOutcome::Printed { order_id } => OutcomePayload::printed(order_id.as_str()),
            PrintOutcome::Failed {
                order_id,
                reason,
                retry_count,
            } => OutcomePayload::failed(order_id.as_str(), reason.as_str(), *retry_count),
        };

        let msg = match BusMessage::outcome(&payload) {
            Ok(m) => m,
            Err(e) => {
                error!(order_id = %payload.order_id, error = %e, "unserializable outcome");
                return;
            }
        };

        for attempt in 1..=self.config.ack_attempts {
            match transport.write_message(&msg).await {
                Ok(()) => {
                    info!(
                        order_id = %payload.order_id,
                        topic = %payload.topic,
                        "outcome reported"
                    );
                    return;
                }
                Err(e) => {
                    warn!(
                        order_id = %payload.order_id,
                        attempt,
                        error = %e,
                        "outcome ack failed"
                    );
                    if attempt < self.config.ack_attempts {
                        tokio::time::sleep(self.config.ack_backoff).await;
                    }
                }
            }
        }

        error!(
            order_id = %payload.order_id,
            topic = %payload.topic,
            attempts = self.config.ack_attempts,
            "dropping outcome ack after retries"
        );
    }
}
