//! Metrics collection
//!
//! Records per-send latency samples and aggregates them, together with the
//! resource samples taken by the background sampler, into the final run
//! report. Sample storage is append-only and pre-sized so collection stays
//! off the measured path; nothing is re-scanned mid-run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::backend::SendErrorKind;
use crate::config::WorkloadSpec;
use crate::models::report::{duration_serde, opt_duration_serde};
use crate::models::{LatencyStats, ResourceSummary, RunReport, RunStatus};

pub mod sampler;

pub use sampler::ResourceSampler;

/// Outcome of one completed send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendOutcome {
    /// The backend accepted the record
    Success,
    /// The send failed with the given error kind
    Failed(SendErrorKind),
}

/// Latency sample for one record; immutable once completed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatencySample {
    /// Record sequence number
    pub seq: u64,
    /// Send start, as an offset from run start
    #[serde(with = "duration_serde")]
    pub send_offset: Duration,
    /// Completion, as an offset from run start; None while in flight
    #[serde(default, with = "opt_duration_serde")]
    pub completion_offset: Option<Duration>,
    /// Outcome; None while in flight
    #[serde(default)]
    pub outcome: Option<SendOutcome>,
}

impl LatencySample {
    /// Submission latency: completion minus send start
    pub fn latency(&self) -> Option<Duration> {
        self.completion_offset
            .map(|c| c.saturating_sub(self.send_offset))
    }

    /// Whether this record was dispatched but never completed
    pub fn is_in_flight(&self) -> bool {
        self.completion_offset.is_none()
    }

    /// Whether this record was sent successfully
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Some(SendOutcome::Success))
    }
}

/// Process resource usage at one sampling instant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSample {
    /// Offset from run start
    #[serde(with = "duration_serde")]
    pub offset: Duration,
    /// CPU usage since the previous sample, percent of one core
    pub cpu_percent: f64,
    /// Resident set size in bytes
    pub rss_bytes: u64,
}

/// Run metadata handed to [`MetricsCollector::summarize`]
#[derive(Debug, Clone)]
pub struct RunMeta {
    pub workload: String,
    pub backend: String,
    pub spec: WorkloadSpec,
    pub started_at: DateTime<Utc>,
    pub status: RunStatus,
    pub target_rate_hz: f64,
    /// Elapsed emission time, used for the achieved-rate computation
    pub emission_elapsed: Duration,
}

/// Collects latency samples from the emission loop.
///
/// Single writer: only the emission loop appends. Samples land in
/// send-start order; completion order may differ when an adapter pipelines,
/// so summarization is order-independent over outcomes.
#[derive(Debug)]
pub struct MetricsCollector {
    run_start: Instant,
    samples: Vec<LatencySample>,
}

/// Cap on the pre-sized sample buffer; huge workloads grow amortized past it.
const MAX_PREALLOC_SAMPLES: u64 = 1 << 20;

impl MetricsCollector {
    /// Create a collector pre-sized for the expected record count
    pub fn new(run_start: Instant, expected_records: u64) -> Self {
        let capacity = expected_records.min(MAX_PREALLOC_SAMPLES) as usize;
        Self {
            run_start,
            samples: Vec::with_capacity(capacity),
        }
    }

    /// Record that the send for `seq` is starting now
    pub fn on_send_start(&mut self, seq: u64) {
        self.samples.push(LatencySample {
            seq,
            send_offset: self.run_start.elapsed(),
            completion_offset: None,
            outcome: None,
        });
    }

    /// Record the outcome for `seq`. Unknown sequence numbers are ignored.
    pub fn on_send_complete(&mut self, seq: u64, outcome: SendOutcome) {
        let completion = self.run_start.elapsed();

        // The common case completes the most recent sample; seq is monotonic
        // in append order, so anything else is found by binary search.
        let idx = match self.samples.last() {
            Some(last) if last.seq == seq => self.samples.len() - 1,
            _ => match self.samples.binary_search_by_key(&seq, |s| s.seq) {
                Ok(idx) => idx,
                Err(_) => return,
            },
        };

        let sample = &mut self.samples[idx];
        sample.completion_offset = Some(completion);
        sample.outcome = Some(outcome);
    }

    /// Number of records sent successfully so far
    pub fn records_sent(&self) -> u64 {
        self.samples.iter().filter(|s| s.is_success()).count() as u64
    }

    /// Number of records whose send failed so far
    pub fn records_failed(&self) -> u64 {
        self.samples
            .iter()
            .filter(|s| matches!(s.outcome, Some(SendOutcome::Failed(_))))
            .count() as u64
    }

    /// Aggregate everything collected into the final run report
    pub fn summarize(self, meta: RunMeta, resource_samples: Vec<ResourceSample>) -> RunReport {
        let records_sent = self.records_sent();
        let records_failed = self.records_failed();
        let records_in_flight = self.samples.iter().filter(|s| s.is_in_flight()).count() as u64;

        let latencies: Vec<Duration> =
            self.samples.iter().filter_map(|s| s.latency()).collect();
        let latency = LatencyStats::from_samples(&latencies);

        let elapsed_secs = meta.emission_elapsed.as_secs_f64();
        let achieved_rate_hz = if elapsed_secs > 0.0 {
            records_sent as f64 / elapsed_secs
        } else {
            0.0
        };

        let resources = ResourceSummary::from_samples(&resource_samples);

        RunReport {
            workload: meta.workload,
            backend: meta.backend,
            spec: meta.spec,
            started_at: meta.started_at,
            finished_at: Utc::now(),
            status: meta.status,
            records_sent,
            records_failed,
            records_in_flight,
            target_rate_hz: meta.target_rate_hz,
            achieved_rate_hz,
            latency,
            resources,
            latency_samples: self.samples,
            resource_samples,
        }
    }
}
