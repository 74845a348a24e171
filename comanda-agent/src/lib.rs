//! Comanda Print Agent - receipt printing for delivery orders
//!
//! A long-lived agent that subscribes to an order backend's real-time
//! channel, renders each incoming order through a compiled receipt
//! template, serializes the result to a thermal printer, and reports
//! per-order outcomes back to the backend.
//!
//! # Module structure
//!
//! ```text
//! comanda-agent/src/
//! ├── core/          # configuration, errors
//! ├── channel/       # backend subscription, transports, intake
//! ├── dispatch/      # per-printer queues, workers, job state machine
//! └── logger.rs      # tracing setup
//! ```
//!
//! Data flow: channel intake receives an `order-created` event, the
//! dispatcher queues a job on its printer's FIFO queue, the printer
//! worker renders and sends, and the terminal state goes back out on the
//! channel as exactly one ack.

pub mod channel;
pub mod core;
pub mod dispatch;
pub mod logger;

// Re-export public types
pub use channel::{ChannelConfig, ChannelError, Intake, MemoryTransport, TcpTransport, Transport};
pub use core::{AgentError, AgentResult, Config};
pub use dispatch::{DispatchError, Dispatcher, JobState, PrintOutcome, RetryPolicy};

use std::sync::Arc;

use comanda_printer::PrinterHandle;
use comanda_template::{CompiledTemplate, DEFAULT_TEMPLATE};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Load .env and initialize logging
pub fn setup_environment() {
    dotenv::dotenv().ok();
    let log_dir = std::env::var("LOG_DIR").ok();
    logger::init_logger(log_dir.as_deref());
}

/// Depth of the dispatch-to-intake outcome channel
const OUTCOME_DEPTH: usize = 256;

/// Run the agent until a shutdown signal
///
/// Startup is fail-fast: a template that does not compile or a printer
/// descriptor that does not parse aborts here. After startup, device and
/// channel errors are absorbed by the pipeline.
pub async fn run(config: Config) -> AgentResult<()> {
    let template_text = match &config.template_path {
        Some(path) => std::fs::read_to_string(path)?,
        None => DEFAULT_TEMPLATE.to_string(),
    };
    let template = Arc::new(CompiledTemplate::compile(&template_text)?);
    info!(
        source = %config.template_path.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "built-in".into()),
        "template compiled"
    );

    let handle = PrinterHandle::open(&config.printer)?;
    info!(
        printer = %config.printer.name,
        uri = %config.printer.uri,
        profile = ?config.printer.kind,
        "printer opened"
    );

    let shutdown = CancellationToken::new();
    let (outcome_tx, outcome_rx) = mpsc::channel(OUTCOME_DEPTH);

    let dispatcher = Arc::new(Dispatcher::start(
        vec![handle],
        template,
        config.store.clone(),
        config.retry,
        config.default_copies,
        outcome_tx,
        shutdown.clone(),
    )?);

    let intake = Intake::new(
        config.channel_addr.clone(),
        config.channel.clone(),
        Arc::clone(&dispatcher),
        outcome_rx,
    );
    let intake_task = tokio::spawn(intake.run(shutdown.clone()));

    tokio::signal::ctrl_c().await.ok();
    info!("shutdown signal received");
    shutdown.cancel();

    // The send in progress finishes; the rest of the queue is dropped
    // undrained and the backend recovers those orders by ack timeout.
    let _ = intake_task.await;
    dispatcher.join().await;
    info!("agent stopped");

    Ok(())
}
