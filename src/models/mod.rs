//! Report data models

pub mod report;

pub use report::{LatencyStats, ResourceSummary, RunReport, RunStatus};
