//! Agent configuration
//!
//! All configuration comes from environment variables, read once at
//! startup; nothing is mutated at runtime.
//!
//! | Environment variable     | Default          | Meaning |
//! |--------------------------|------------------|---------|
//! | CHANNEL_ADDR             | 127.0.0.1:9800   | Backend channel address |
//! | PRINTER_NAME             | default          | Logical printer name |
//! | PRINTER_URI              | dry-run:         | tcp://host:port, file:///dev/..., /dev/..., dry-run: |
//! | PRINTER_PROFILE          | escpos           | escpos \| star |
//! | PAPER_WIDTH_MM           | 80               | Paper width (80mm = 48 cols, 58mm = 32) |
//! | PRINT_TIMEOUT_MS         | 5000             | Per-send operation timeout |
//! | PRINT_MAX_ATTEMPTS       | 3                | Send attempts per job |
//! | PRINT_RETRY_BACKOFF_MS   | 500              | Delay between attempts |
//! | TEMPLATE_PATH            | (built-in)       | Receipt template file |
//! | HEADER_NAME              | My Store         | Receipt header line |
//! | HEADER_CITY              | (empty)          | Receipt header line |
//! | TIMEZONE                 | UTC              | Order date/time formatting |
//! | COPIES                   | 1                | Default copies per order |
//! | LOG_DIR                  | (stderr only)    | Daily-rolling log file dir |

use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;
use comanda_printer::{PrinterProfile, ProfileKind, mm_to_columns};
use comanda_template::StoreInfo;
use tracing::warn;

use crate::channel::ChannelConfig;
use crate::dispatch::RetryPolicy;

/// Agent configuration, loaded once at startup
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend channel address (host:port)
    pub channel_addr: String,
    /// The configured printer
    pub printer: PrinterProfile,
    /// Receipt template file; `None` uses the built-in default
    pub template_path: Option<PathBuf>,
    /// Store settings printed on every receipt
    pub store: StoreInfo,
    /// Default copies when the event carries none
    pub default_copies: u32,
    pub retry: RetryPolicy,
    pub channel: ChannelConfig,
    /// Log file directory; `None` logs to stderr only
    pub log_dir: Option<String>,
}

impl Config {
    /// Load from environment variables, with defaults for anything unset
    pub fn from_env() -> Self {
        let kind = match env_var("PRINTER_PROFILE") {
            Some(raw) => raw.parse::<ProfileKind>().unwrap_or_else(|e| {
                warn!(error = %e, "falling back to ESC/POS");
                ProfileKind::EscPos
            }),
            None => ProfileKind::EscPos,
        };

        let width_mm: u32 = env_parse("PAPER_WIDTH_MM").unwrap_or(80);
        let timeout_ms: u64 = env_parse("PRINT_TIMEOUT_MS").unwrap_or(5000);

        let printer = PrinterProfile::new(
            env_var("PRINTER_NAME").unwrap_or_else(|| "default".into()),
            kind,
            env_var("PRINTER_URI").unwrap_or_else(|| "dry-run:".into()),
        )
        .with_width(mm_to_columns(width_mm))
        .with_timeout(Duration::from_millis(timeout_ms));

        let timezone = match env_var("TIMEZONE") {
            Some(raw) => raw.parse::<Tz>().unwrap_or_else(|e| {
                warn!(error = %e, timezone = %raw, "falling back to UTC");
                Tz::UTC
            }),
            None => Tz::UTC,
        };

        let store = StoreInfo {
            header_name: env_var("HEADER_NAME").unwrap_or_else(|| "My Store".into()),
            header_city: env_var("HEADER_CITY").unwrap_or_default(),
            timezone,
        };

        let retry = RetryPolicy {
            max_attempts: env_parse("PRINT_MAX_ATTEMPTS").unwrap_or(3),
            backoff: Duration::from_millis(env_parse("PRINT_RETRY_BACKOFF_MS").unwrap_or(500)),
        };

        Self {
            channel_addr: env_var("CHANNEL_ADDR").unwrap_or_else(|| "127.0.0.1:9800".into()),
            printer,
            template_path: env_var("TEMPLATE_PATH").map(PathBuf::from),
            store,
            default_copies: env_parse("COPIES").unwrap_or(1).clamp(1, 10),
            retry,
            channel: ChannelConfig::default(),
            log_dir: env_var("LOG_DIR"),
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env_var(name).and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        // Assumes the test environment does not set agent variables
        let config = Config::from_env();
        assert_eq!(config.printer.uri, "dry-run:");
        assert_eq!(config.printer.width, 48);
        assert_eq!(config.printer.kind, ProfileKind::EscPos);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.default_copies, 1);
        assert!(config.template_path.is_none());
    }
}
