//! Print job lifecycle types

use std::fmt;

use shared::order::Order;
use tracing::debug;

/// Print job state machine
///
/// `Received -> Rendering -> Printing -> Printed | Failed`
///
/// Transitions happen under exclusive control of the printer worker; no
/// state leaves a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Received,
    Rendering,
    Printing,
    Printed,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Printed | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Received => write!(f, "received"),
            JobState::Rendering => write!(f, "rendering"),
            JobState::Printing => write!(f, "printing"),
            JobState::Printed => write!(f, "printed"),
            JobState::Failed => write!(f, "failed"),
        }
    }
}

/// The unit of work: one order bound to one printer
///
/// Jobs own nothing but their data; the printer connection belongs to
/// the worker. A job is discarded once its terminal outcome has been
/// emitted.
#[derive(Debug)]
pub struct PrintJob {
    /// Monotonic sequence number, global across printers, FIFO per printer
    pub seq: u64,
    pub order: Order,
    /// Target printer name
    pub printer: String,
    /// Physical copies to produce
    pub copies: u32,
    state: JobState,
}

impl PrintJob {
    pub fn new(seq: u64, order: Order, printer: String, copies: u32) -> Self {
        Self {
            seq,
            order,
            printer,
            copies,
            state: JobState::Received,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Move to the next lifecycle state
    pub fn advance(&mut self, next: JobState) {
        debug_assert!(
            !self.state.is_terminal(),
            "job {} advanced out of terminal state {}",
            self.seq,
            self.state
        );
        debug!(
            order_id = %self.order.id,
            seq = self.seq,
            from = %self.state,
            to = %next,
            "job state"
        );
        self.state = next;
    }
}

/// Terminal result of a job, reported back on the channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrintOutcome {
    Printed {
        order_id: String,
    },
    Failed {
        order_id: String,
        reason: String,
        retry_count: u32,
    },
}

impl PrintOutcome {
    pub fn order_id(&self) -> &str {
        match self {
            PrintOutcome::Printed { order_id } => order_id,
            PrintOutcome::Failed { order_id, .. } => order_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> Order {
        serde_json::from_str(r#"{"id": "o1"}"#).unwrap()
    }

    #[test]
    fn test_job_lifecycle() {
        let mut job = PrintJob::new(1, order(), "default".to_string(), 1);
        assert_eq!(job.state(), JobState::Received);
        job.advance(JobState::Rendering);
        job.advance(JobState::Printing);
        job.advance(JobState::Printed);
        assert!(job.state().is_terminal());
    }

    #[test]
    fn test_outcome_order_id() {
        assert_eq!(
            PrintOutcome::Printed {
                order_id: "o1".into()
            }
            .order_id(),
            "o1"
        );
    }
}
