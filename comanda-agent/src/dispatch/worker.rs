//! Per-printer print worker
//!
//! Each worker exclusively owns one printer handle and drains one FIFO
//! queue, so at most one send is in flight per printer and jobs print
//! strictly in arrival order. Rendering is pure and happens once per
//! job; only the device I/O step is retried.

use std::sync::Arc;

use comanda_printer::{PrintResult, PrinterHandle};
use comanda_template::{CompiledTemplate, ReceiptContext, StoreInfo, render};
use dashmap::DashMap;
use shared::print::Directive;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::RetryPolicy;
use super::job::{JobState, PrintJob, PrintOutcome};

pub(crate) struct PrinterWorker {
    pub(crate) handle: PrinterHandle,
    pub(crate) template: Arc<CompiledTemplate>,
    pub(crate) store: StoreInfo,
    pub(crate) retry: RetryPolicy,
    pub(crate) in_flight: Arc<DashMap<String, u64>>,
    pub(crate) outcome_tx: mpsc::Sender<PrintOutcome>,
}

impl PrinterWorker {
    /// Run until shutdown or queue close
    ///
    /// Shutdown lets the job in progress finish its send but drops the
    /// rest of the queue undrained; the backend detects the missing acks
    /// by timeout and can redeliver.
    pub(crate) async fn run(self, mut rx: mpsc::Receiver<PrintJob>, shutdown: CancellationToken) {
        let name = self.handle.profile().name.clone();
        let probe = self.handle.probe().await;
        info!(printer = %name, probe = ?probe, "print worker started");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!(printer = %name, "print worker stopping");
                    break;
                }
                job = rx.recv() => {
                    let Some(job) = job else {
                        info!(printer = %name, "print queue closed");
                        break;
                    };
                    self.process(job).await;
                }
            }
        }
    }

    async fn process(&self, mut job: PrintJob) {
        job.advance(JobState::Rendering);
        let ctx = ReceiptContext::new(&job.order, &self.store);
        let directives = render(&self.template, &ctx);

        job.advance(JobState::Printing);
        let mut attempt = 0u32;
        let outcome = loop {
            attempt += 1;
            match self.send_copies(&directives, job.copies).await {
                Ok(()) => {
                    job.advance(JobState::Printed);
                    info!(
                        order_id = %job.order.id,
                        seq = job.seq,
                        attempts = attempt,
                        "order printed"
                    );
                    break PrintOutcome::Printed {
                        order_id: job.order.id.clone(),
                    };
                }
                Err(e) => {
                    warn!(
                        order_id = %job.order.id,
                        seq = job.seq,
                        attempt,
                        error = %e,
                        "print attempt failed"
                    );
                    if attempt >= self.retry.max_attempts {
                        job.advance(JobState::Failed);
                        break PrintOutcome::Failed {
                            order_id: job.order.id.clone(),
                            reason: e.to_string(),
                            retry_count: attempt,
                        };
                    }
                    tokio::time::sleep(self.retry.backoff).await;
                }
            }
        };

        // Terminal: the order id may be enqueued again as a fresh job
        self.in_flight.remove(&job.order.id);

        if self.outcome_tx.send(outcome).await.is_err() {
            warn!(order_id = %job.order.id, "outcome channel closed, ack lost");
        }
    }

    /// Retries re-send the full copy batch; the rendered directives are
    /// reused as-is.
    async fn send_copies(&self, directives: &[Directive], copies: u32) -> PrintResult<()> {
        for _ in 0..copies {
            self.handle.send(directives).await?;
        }
        Ok(())
    }
}
