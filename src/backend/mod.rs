//! Backend adapter interface
//!
//! The capability set a concrete log-server backend must satisfy: connect,
//! send a typed record, flush, disconnect. The concrete wire protocol is
//! entirely the adapter's concern and invisible to the rest of the harness.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::sched::Record;
use crate::{LogBenchError, Result};

pub mod rerun;

pub use rerun::RerunAdapter;

/// Backends the harness knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Rerun log server (implemented)
    Rerun,
    /// Foxglove (declared, not yet implemented)
    Foxglove,
}

impl BackendKind {
    /// Get a human-readable name for the backend
    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::Rerun => "rerun",
            BackendKind::Foxglove => "foxglove",
        }
    }

    /// Fail fast when the selected backend has no adapter implementation
    pub fn ensure_supported(&self) -> Result<()> {
        match self {
            BackendKind::Rerun => Ok(()),
            BackendKind::Foxglove => Err(LogBenchError::UnsupportedBackend(
                "foxglove is declared but has no adapter implementation yet".to_string(),
            )),
        }
    }
}

/// Classification of a failed send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendErrorKind {
    /// The adapter's bounded send timeout elapsed
    Timeout,
    /// The backend refused the record
    Rejected,
    /// The transport failed (broken connection, I/O error)
    Transport,
}

/// A failed send: per-record data, never fatal on its own
#[derive(Debug, Clone)]
pub struct SendError {
    pub kind: SendErrorKind,
    pub message: String,
}

impl SendError {
    pub fn new(kind: SendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(SendErrorKind::Timeout, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(SendErrorKind::Rejected, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(SendErrorKind::Transport, message)
    }
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            SendErrorKind::Timeout => "timeout",
            SendErrorKind::Rejected => "rejected",
            SendErrorKind::Transport => "transport",
        };
        write!(f, "send failed ({}): {}", kind, self.message)
    }
}

/// Result of a single send attempt
pub type SendResult = std::result::Result<(), SendError>;

/// Capability set a concrete backend implementation must provide.
///
/// The runner drives exactly one adapter per run over one connection.
/// `send` may block the emission loop, but only up to an adapter-defined
/// timeout; it must never silently drop a record. `disconnect` is
/// idempotent.
pub trait BackendAdapter {
    /// Backend name used in reports
    fn name(&self) -> &'static str;

    /// Establish the connection to the backend endpoint
    fn connect(&mut self, endpoint: &str) -> impl std::future::Future<Output = Result<()>>;

    /// Transmit one record
    fn send(&mut self, record: &Record) -> impl std::future::Future<Output = SendResult>;

    /// Block until all previously accepted sends are acknowledged or failed
    fn flush(&mut self) -> impl std::future::Future<Output = Result<()>>;

    /// Release the connection; safe to call more than once
    fn disconnect(&mut self) -> impl std::future::Future<Output = Result<()>>;
}
