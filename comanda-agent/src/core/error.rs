//! Agent-level error type

use thiserror::Error;

use crate::dispatch::DispatchError;
use comanda_printer::PrintError;
use comanda_template::CompileError;

/// Errors that can stop the agent
///
/// Only a malformed template (or an unreadable template file) at startup
/// is fatal by policy; device and channel errors are handled inside the
/// pipeline and never reach this type at runtime.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Template error: {0}")]
    Template(#[from] CompileError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Printer error: {0}")]
    Printer(#[from] PrintError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}

/// Result type for agent operations
pub type AgentResult<T> = Result<T, AgentError>;
