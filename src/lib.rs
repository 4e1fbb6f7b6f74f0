//! LOGBENCH - Log Server Benchmark
//!
//! A benchmark harness that drives robotics-style log servers (Rerun,
//! Foxglove) with time-paced synthetic workloads and measures throughput,
//! submission latency, and process resource usage.

use std::fmt;

// Public re-exports
pub mod backend;
pub mod config;
pub mod gen;
pub mod metrics;
pub mod models;
pub mod runner;
pub mod sched;
pub mod util;

// Common error types
#[derive(Debug)]
pub enum LogBenchError {
    /// I/O operation failed
    IoError(std::io::Error),
    /// Configuration validation or parsing error
    ConfigError(String),
    /// Size descriptor does not match the data kind's expected shape
    InvalidSizeDescriptor(String),
    /// Backend selected in the workload is declared but not implemented
    UnsupportedBackend(String),
    /// Connecting to the backend failed (network/handshake)
    ConnectionError(String),
    /// Resource sampling unavailable on this host
    SamplerError(String),
    /// Benchmark execution error
    RunnerError(String),
    /// Report persistence error
    PersistenceError(String),
}

impl fmt::Display for LogBenchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogBenchError::IoError(err) => write!(f, "I/O error: {}", err),
            LogBenchError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            LogBenchError::InvalidSizeDescriptor(msg) => {
                write!(f, "Invalid size descriptor: {}", msg)
            }
            LogBenchError::UnsupportedBackend(msg) => {
                write!(f, "Unsupported backend: {}", msg)
            }
            LogBenchError::ConnectionError(msg) => write!(f, "Connection error: {}", msg),
            LogBenchError::SamplerError(msg) => write!(f, "Resource sampler error: {}", msg),
            LogBenchError::RunnerError(msg) => write!(f, "Benchmark error: {}", msg),
            LogBenchError::PersistenceError(msg) => {
                write!(f, "Report persistence error: {}", msg)
            }
        }
    }
}

impl std::error::Error for LogBenchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LogBenchError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LogBenchError {
    fn from(err: std::io::Error) -> Self {
        LogBenchError::IoError(err)
    }
}

impl From<serde_json::Error> for LogBenchError {
    fn from(err: serde_json::Error) -> Self {
        LogBenchError::PersistenceError(format!("JSON serialization error: {}", err))
    }
}

impl From<toml::de::Error> for LogBenchError {
    fn from(err: toml::de::Error) -> Self {
        LogBenchError::ConfigError(format!("TOML parsing error: {}", err))
    }
}

impl From<toml::ser::Error> for LogBenchError {
    fn from(err: toml::ser::Error) -> Self {
        LogBenchError::ConfigError(format!("TOML serialization error: {}", err))
    }
}

/// Result type alias for logbench operations
pub type Result<T> = std::result::Result<T, LogBenchError>;

// Common types and constants
pub const APP_NAME: &str = "logbench";
pub const REPORTS_FILE: &str = "reports.json";
pub const MAX_REPORT_HISTORY: usize = 100;

/// Records sent between payload regenerations. Reusing the payload keeps
/// generation cost off the measured path while content still varies over a run.
pub const PAYLOAD_REGEN_INTERVAL: u64 = 100;

/// Consecutive transport-level send failures before a run is declared dead.
pub const TRANSPORT_FAIL_THRESHOLD: u32 = 5;
