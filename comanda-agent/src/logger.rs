//! Logging Infrastructure
//!
//! Structured logging setup; `RUST_LOG` controls the filter, an optional
//! directory adds daily-rolling file output.

use std::path::Path;

use tracing_subscriber::EnvFilter;

/// Initialize the logger
pub fn init_logger(log_dir: Option<&str>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    if let Some(dir) = log_dir {
        let log_path = Path::new(dir);
        if log_path.exists()
            && let Some(dir_str) = log_path.to_str()
        {
            let file_appender = tracing_appender::rolling::daily(dir_str, "comanda-agent");
            subscriber.with_writer(file_appender).init();
            return;
        }
        eprintln!("log dir {} does not exist, logging to stderr", dir);
    }

    subscriber.init();
}
