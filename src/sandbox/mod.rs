// src/sandbox/mod.rs

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::Result;

pub mod finite;
pub mod python;

pub use finite::{FiniteWorker, Settlement, DEFAULT_DEADLINE};
pub use python::PythonSandbox;

/// Message used for the outcome of a run that hit the deadline.
pub const TIMEOUT_MESSAGE: &str = "Infinite loop";

/// An error raised by the code running inside a worker.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ExecutionError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lineno: Option<u32>,
}

impl ExecutionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            filename: None,
            lineno: None,
        }
    }
}

/// The single message a worker answers with: `{"results": ...}` or
/// `{"error": {...}}` on the wire.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionOutcome {
    Results(String),
    Error(ExecutionError),
}

impl ExecutionOutcome {
    pub fn timed_out() -> Self {
        ExecutionOutcome::Error(ExecutionError::new(TIMEOUT_MESSAGE))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ExecutionOutcome::Error(e) if e.message == TIMEOUT_MESSAGE)
    }
}

/// Factory for isolated execution contexts.
#[async_trait]
pub trait Sandbox: Send + Sync {
    /// Starts a fresh worker. Each run gets its own.
    async fn spawn(&self) -> Result<Box<dyn SandboxWorker>>;
}

/// One isolated execution context. It accepts a single source text and
/// answers at most once.
#[async_trait]
pub trait SandboxWorker: Send {
    /// Hands the source text to the worker.
    async fn post(&mut self, source: &str) -> Result<()>;

    /// Waits for the worker's answer. Transport problems surface as
    /// `GraderError::Channel`.
    async fn recv(&mut self) -> Result<ExecutionOutcome>;

    /// Forcibly stops the worker. Safe to call more than once.
    async fn terminate(&mut self);
}
