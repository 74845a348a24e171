//! Job queue and dispatch
//!
//! One FIFO queue plus one dedicated worker per configured printer: a
//! thermal printer is a single-owner byte-stream device, so at most one
//! send is in flight per printer and jobs for the same printer print
//! strictly in sequence order. Different printers proceed independently.

mod job;
mod worker;

pub use job::{JobState, PrintJob, PrintOutcome};

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use comanda_printer::PrinterHandle;
use comanda_template::{CompiledTemplate, StoreInfo};
use dashmap::DashMap;
use shared::order::Order;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use worker::PrinterWorker;

/// Jobs waiting per printer before intake starts shedding
const QUEUE_DEPTH: usize = 256;

/// Bounded retry for the device I/O step
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total send attempts per job (first try included)
    pub max_attempts: u32,
    /// Fixed delay between attempts
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

/// Dispatch errors surfaced to intake
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The order already has a job that has not reached a terminal state
    #[error("Order {order_id} is already being printed")]
    Duplicate { order_id: String },

    /// The printer's queue is full; the event is shed
    #[error("Print queue full for printer {printer}")]
    QueueFull { printer: String },

    /// Started with no printers configured
    #[error("No printers configured")]
    NoPrinters,
}

/// Owns the per-printer queues, workers and the in-flight registry
///
/// Constructed once at process start; `enqueue` is the only mutation
/// surface and is safe to call from the intake loop.
pub struct Dispatcher {
    queues: HashMap<String, mpsc::Sender<PrintJob>>,
    default_printer: String,
    default_copies: u32,
    seq: AtomicU64,
    in_flight: Arc<DashMap<String, u64>>,
    workers: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl Dispatcher {
    /// Spawn one worker per printer handle
    ///
    /// The first handle's printer is the default routing target.
    pub fn start(
        handles: Vec<PrinterHandle>,
        template: Arc<CompiledTemplate>,
        store: StoreInfo,
        retry: RetryPolicy,
        default_copies: u32,
        outcome_tx: mpsc::Sender<PrintOutcome>,
        shutdown: CancellationToken,
    ) -> Result<Self, DispatchError> {
        let Some(first) = handles.first() else {
            return Err(DispatchError::NoPrinters);
        };
        let default_printer = first.profile().name.clone();

        let in_flight: Arc<DashMap<String, u64>> = Arc::new(DashMap::new());
        let mut queues = HashMap::new();
        let mut workers = Vec::new();

        for handle in handles {
            let name = handle.profile().name.clone();
            let (tx, rx) = mpsc::channel(QUEUE_DEPTH);

            let worker = PrinterWorker {
                handle,
                template: Arc::clone(&template),
                store: store.clone(),
                retry,
                in_flight: Arc::clone(&in_flight),
                outcome_tx: outcome_tx.clone(),
            };
            workers.push(tokio::spawn(worker.run(rx, shutdown.clone())));
            queues.insert(name, tx);
        }

        info!(printers = queues.len(), default = %default_printer, "dispatcher started");

        Ok(Self {
            queues,
            default_printer,
            default_copies,
            seq: AtomicU64::new(0),
            in_flight,
            workers: std::sync::Mutex::new(workers),
        })
    }

    /// Create a job for the order and push it onto its printer's queue
    ///
    /// Duplicate delivery of an order id while its job is still live is
    /// rejected; once the prior job reached a terminal state the same id
    /// is accepted again as a fresh job (a backend resend means the
    /// operator wants another physical copy).
    pub fn enqueue(&self, order: Order) -> Result<u64, DispatchError> {
        let printer = self.route(&order);

        if self.in_flight.contains_key(&order.id) {
            return Err(DispatchError::Duplicate {
                order_id: order.id.clone(),
            });
        }
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        self.in_flight.insert(order.id.clone(), seq);

        let copies = order.copies.unwrap_or(self.default_copies).clamp(1, 10);
        let order_id = order.id.clone();
        let job = PrintJob::new(seq, order, printer.clone(), copies);

        let queue = &self.queues[&printer];
        if queue.try_send(job).is_err() {
            self.in_flight.remove(&order_id);
            return Err(DispatchError::QueueFull { printer });
        }

        Ok(seq)
    }

    fn route(&self, order: &Order) -> String {
        match &order.printer {
            Some(name) if self.queues.contains_key(name) => name.clone(),
            Some(name) => {
                warn!(
                    order_id = %order.id,
                    printer = %name,
                    "unknown printer in event, falling back to default"
                );
                self.default_printer.clone()
            }
            None => self.default_printer.clone(),
        }
    }

    /// Wait for all workers to finish
    ///
    /// Call after cancelling the shutdown token: the send in progress
    /// completes, queued jobs are dropped.
    pub async fn join(&self) {
        let workers = {
            let mut guard = self.workers.lock().expect("worker list poisoned");
            std::mem::take(&mut *guard)
        };
        for worker in workers {
            let _ = worker.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use comanda_printer::{PrintError, PrintResult, PrinterPort, PrinterProfile, Probe, ProfileKind};
    use std::sync::Mutex;
    use std::sync::atomic::AtomicU32;
    use tokio::sync::Semaphore;

    /// Scripted in-process port: fails the first `fail_first` sends,
    /// records the payload text of the rest, optionally gates each send
    /// on a semaphore permit.
    #[derive(Debug, Default)]
    struct ScriptedPort {
        fail_first: u32,
        calls: AtomicU32,
        sends: Mutex<Vec<String>>,
        gate: Option<Arc<Semaphore>>,
    }

    #[async_trait]
    impl PrinterPort for ScriptedPort {
        async fn send(&self, data: &[u8]) -> PrintResult<()> {
            if let Some(gate) = &self.gate {
                let permit = gate.acquire().await.expect("gate closed");
                permit.forget();
            }
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                return Err(PrintError::Connection("printer unplugged".to_string()));
            }
            self.sends
                .lock()
                .unwrap()
                .push(String::from_utf8_lossy(data).to_string());
            Ok(())
        }

        async fn probe(&self) -> Probe {
            Probe::Unknown
        }
    }

    struct Fixture {
        dispatcher: Dispatcher,
        outcome_rx: mpsc::Receiver<PrintOutcome>,
        port: Arc<ScriptedPort>,
        shutdown: CancellationToken,
    }

    fn start(port: ScriptedPort, retry: RetryPolicy) -> Fixture {
        // The rendered receipt is just the order id line, which makes
        // recorded sends easy to assert on.
        let template = Arc::new(CompiledTemplate::compile("{{display_id}}\n").unwrap());
        let port = Arc::new(port);
        let profile = PrinterProfile::new("default", ProfileKind::EscPos, "dry-run:");
        let handle = PrinterHandle::with_port(&profile, Box::new(SharedPort(Arc::clone(&port))));

        let (outcome_tx, outcome_rx) = mpsc::channel(16);
        let shutdown = CancellationToken::new();
        let dispatcher = Dispatcher::start(
            vec![handle],
            template,
            StoreInfo::default(),
            retry,
            1,
            outcome_tx,
            shutdown.clone(),
        )
        .unwrap();

        Fixture {
            dispatcher,
            outcome_rx,
            port,
            shutdown,
        }
    }

    /// Box-able wrapper so the test keeps a reference to the port
    #[derive(Debug)]
    struct SharedPort(Arc<ScriptedPort>);

    #[async_trait]
    impl PrinterPort for SharedPort {
        async fn send(&self, data: &[u8]) -> PrintResult<()> {
            self.0.send(data).await
        }
        async fn probe(&self) -> Probe {
            self.0.probe().await
        }
    }

    fn order(id: &str) -> Order {
        serde_json::from_str(&format!(r#"{{"id": "{}"}}"#, id)).unwrap()
    }

    fn fast_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            backoff: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn test_flaky_printer_recovers_within_retry_bound() {
        let mut f = start(
            ScriptedPort {
                fail_first: 2,
                ..Default::default()
            },
            fast_retry(3),
        );

        f.dispatcher.enqueue(order("o1")).unwrap();
        let outcome = f.outcome_rx.recv().await.unwrap();
        assert_eq!(
            outcome,
            PrintOutcome::Printed {
                order_id: "o1".to_string()
            }
        );

        // Exactly one ack per job
        assert!(f.outcome_rx.try_recv().is_err());
        assert_eq!(f.port.sends.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_retry_bound_exceeded_reports_failure() {
        let mut f = start(
            ScriptedPort {
                fail_first: u32::MAX,
                ..Default::default()
            },
            fast_retry(3),
        );

        f.dispatcher.enqueue(order("o1")).unwrap();
        let outcome = f.outcome_rx.recv().await.unwrap();
        match outcome {
            PrintOutcome::Failed {
                order_id,
                reason,
                retry_count,
            } => {
                assert_eq!(order_id, "o1");
                assert_eq!(retry_count, 3);
                assert!(reason.contains("printer unplugged"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(f.outcome_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_per_printer_fifo_order() {
        let gate = Arc::new(Semaphore::new(0));
        let mut f = start(
            ScriptedPort {
                gate: Some(Arc::clone(&gate)),
                ..Default::default()
            },
            fast_retry(1),
        );

        // Both jobs queue while the printer is gated shut
        f.dispatcher.enqueue(order("o1")).unwrap();
        f.dispatcher.enqueue(order("o2")).unwrap();
        gate.add_permits(2);

        assert_eq!(f.outcome_rx.recv().await.unwrap().order_id(), "o1");
        assert_eq!(f.outcome_rx.recv().await.unwrap().order_id(), "o2");

        let sends = f.port.sends.lock().unwrap();
        assert_eq!(sends.len(), 2);
        assert!(sends[0].contains("o1"));
        assert!(sends[1].contains("o2"));
    }

    #[tokio::test]
    async fn test_duplicate_while_in_flight_rejected_then_accepted() {
        let gate = Arc::new(Semaphore::new(0));
        let mut f = start(
            ScriptedPort {
                gate: Some(Arc::clone(&gate)),
                ..Default::default()
            },
            fast_retry(1),
        );

        f.dispatcher.enqueue(order("o1")).unwrap();
        assert!(matches!(
            f.dispatcher.enqueue(order("o1")),
            Err(DispatchError::Duplicate { .. })
        ));

        gate.add_permits(1);
        assert_eq!(f.outcome_rx.recv().await.unwrap().order_id(), "o1");

        // Terminal state reached: a redelivery is a fresh job and a
        // fresh ack cycle
        gate.add_permits(1);
        f.dispatcher.enqueue(order("o1")).unwrap();
        assert_eq!(f.outcome_rx.recv().await.unwrap().order_id(), "o1");
        assert_eq!(f.port.sends.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_copies_send_per_copy() {
        let mut f = start(ScriptedPort::default(), fast_retry(1));

        let mut o = order("o1");
        o.copies = Some(2);
        f.dispatcher.enqueue(o).unwrap();

        let outcome = f.outcome_rx.recv().await.unwrap();
        assert_eq!(outcome.order_id(), "o1");
        assert!(f.outcome_rx.try_recv().is_err());
        assert_eq!(f.port.sends.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_printer_falls_back_to_default() {
        let mut f = start(ScriptedPort::default(), fast_retry(1));

        let mut o = order("o1");
        o.printer = Some("back-kitchen".to_string());
        f.dispatcher.enqueue(o).unwrap();
        assert_eq!(f.outcome_rx.recv().await.unwrap().order_id(), "o1");
    }

    #[tokio::test]
    async fn test_shutdown_stops_workers() {
        let f = start(ScriptedPort::default(), fast_retry(1));
        f.shutdown.cancel();
        f.dispatcher.join().await;
    }
}
