//! Run report data models
//!
//! The report is the sole output artifact of a run: metadata, counts,
//! latency and resource summaries, and the raw sample sequences. It is
//! created once at run end and read-only afterward; rendering beyond the
//! one-line summary is an external concern.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::config::WorkloadSpec;
use crate::metrics::{LatencySample, ResourceSample};
use crate::util::units::{format_duration, format_rate};

/// Terminal status of a benchmark run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// All scheduled events were emitted and drained
    Completed,
    /// Cancellation was requested; the report covers a partial run
    Cancelled,
    /// The run died on an unrecoverable adapter error
    Failed(String),
}

impl RunStatus {
    /// Whether this report covers less than the full declared workload
    pub fn is_partial(&self) -> bool {
        !matches!(self, RunStatus::Completed)
    }
}

/// Latency statistics with min/avg/max and percentiles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatencyStats {
    /// Minimum latency observed
    #[serde(with = "duration_serde")]
    pub min: Duration,
    /// Average latency across all completed sends
    #[serde(with = "duration_serde")]
    pub avg: Duration,
    /// Maximum latency observed
    #[serde(with = "duration_serde")]
    pub max: Duration,
    /// Latency percentiles (50th, 95th, 99th)
    #[serde(with = "percentiles_serde")]
    pub percentiles: HashMap<u8, Duration>,
}

impl LatencyStats {
    /// Compute latency statistics from a list of samples
    pub fn from_samples(samples: &[Duration]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        let mut sorted = samples.to_vec();
        sorted.sort();
        let min = sorted[0];
        let max = sorted[sorted.len() - 1];
        let avg_nanos: u128 =
            sorted.iter().map(|d| d.as_nanos()).sum::<u128>() / sorted.len() as u128;
        let avg = Duration::from_nanos(avg_nanos as u64);

        let mut percentiles = HashMap::new();
        percentiles.insert(50, percentile(&sorted, 50));
        percentiles.insert(95, percentile(&sorted, 95));
        percentiles.insert(99, percentile(&sorted, 99));

        Self {
            min,
            avg,
            max,
            percentiles,
        }
    }

    /// Get the 50th percentile latency
    pub fn p50(&self) -> Duration {
        self.percentiles.get(&50).copied().unwrap_or(self.avg)
    }

    /// Get the 95th percentile latency
    pub fn p95(&self) -> Duration {
        self.percentiles.get(&95).copied().unwrap_or(self.max)
    }

    /// Get the 99th percentile latency
    pub fn p99(&self) -> Duration {
        self.percentiles.get(&99).copied().unwrap_or(self.max)
    }
}

impl Default for LatencyStats {
    fn default() -> Self {
        Self {
            min: Duration::default(),
            avg: Duration::default(),
            max: Duration::default(),
            percentiles: HashMap::new(),
        }
    }
}

fn percentile(sorted: &[Duration], p: usize) -> Duration {
    let idx = (sorted.len() * p / 100).min(sorted.len() - 1);
    sorted[idx]
}

/// Summary of the periodic process resource samples
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSummary {
    /// Highest CPU usage observed, percent of one core
    pub cpu_peak_percent: f64,
    /// Mean CPU usage, percent of one core
    pub cpu_mean_percent: f64,
    /// Highest resident memory observed, bytes
    pub rss_peak_bytes: u64,
    /// Mean resident memory, bytes
    pub rss_mean_bytes: u64,
    /// Number of samples taken
    pub sample_count: usize,
}

impl ResourceSummary {
    /// Compute a summary from raw samples; None when nothing was sampled
    pub fn from_samples(samples: &[ResourceSample]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let cpu_peak = samples.iter().map(|s| s.cpu_percent).fold(0.0, f64::max);
        let cpu_mean =
            samples.iter().map(|s| s.cpu_percent).sum::<f64>() / samples.len() as f64;
        let rss_peak = samples.iter().map(|s| s.rss_bytes).max().unwrap_or(0);
        let rss_mean =
            samples.iter().map(|s| s.rss_bytes).sum::<u64>() / samples.len() as u64;

        Some(Self {
            cpu_peak_percent: cpu_peak,
            cpu_mean_percent: cpu_mean,
            rss_peak_bytes: rss_peak,
            rss_mean_bytes: rss_mean,
            sample_count: samples.len(),
        })
    }
}

/// Complete benchmark run report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Workload name from the specification
    pub workload: String,
    /// Backend that was driven
    pub backend: String,
    /// Snapshot of the workload specification used for this run
    pub spec: WorkloadSpec,
    /// Wall-clock start of the run
    pub started_at: DateTime<Utc>,
    /// Wall-clock end of the run
    pub finished_at: DateTime<Utc>,
    /// Terminal status; anything but `Completed` marks a partial report
    pub status: RunStatus,
    /// Records sent successfully
    pub records_sent: u64,
    /// Records whose send failed
    pub records_failed: u64,
    /// Records dispatched but never completed (run aborted)
    pub records_in_flight: u64,
    /// Declared aggregate emission rate across all streams
    pub target_rate_hz: f64,
    /// Successful sends per second of emission time
    pub achieved_rate_hz: f64,
    /// Submission latency distribution over completed sends
    pub latency: LatencyStats,
    /// Resource usage summary; None when sampling was unavailable
    pub resources: Option<ResourceSummary>,
    /// Raw per-record latency samples, in send-start order
    pub latency_samples: Vec<LatencySample>,
    /// Raw resource samples, in sampling order
    pub resource_samples: Vec<ResourceSample>,
}

impl RunReport {
    /// Get a human-readable one-line summary of the run
    pub fn summary(&self) -> String {
        let status = match &self.status {
            RunStatus::Completed => "completed".to_string(),
            RunStatus::Cancelled => "cancelled".to_string(),
            RunStatus::Failed(reason) => format!("FAILED ({})", reason),
        };
        format!(
            "{} on {} - {} - {} sent, {} failed - {} (target {}) - avg latency {}",
            self.workload,
            self.backend,
            status,
            self.records_sent,
            self.records_failed,
            format_rate(self.achieved_rate_hz),
            format_rate(self.target_rate_hz),
            format_duration(self.latency.avg),
        )
    }
}

// Custom serde modules for Duration serialization
pub(crate) mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_nanos().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let nanos = u128::deserialize(deserializer)?;
        Ok(Duration::from_nanos(nanos as u64))
    }
}

pub(crate) mod opt_duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.map(|d| d.as_nanos()).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let nanos: Option<u128> = Option::deserialize(deserializer)?;
        Ok(nanos.map(|n| Duration::from_nanos(n as u64)))
    }
}

mod percentiles_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::HashMap;
    use std::time::Duration;

    pub fn serialize<S>(
        percentiles: &HashMap<u8, Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let nanos_map: HashMap<u8, u128> = percentiles
            .iter()
            .map(|(&k, &v)| (k, v.as_nanos()))
            .collect();
        nanos_map.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<HashMap<u8, Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let nanos_map: HashMap<u8, u128> = HashMap::deserialize(deserializer)?;
        Ok(nanos_map
            .into_iter()
            .map(|(k, v)| (k, Duration::from_nanos(v as u64)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_stats_from_samples() {
        let samples: Vec<Duration> = (1..=100).map(Duration::from_millis).collect();
        let stats = LatencyStats::from_samples(&samples);

        assert_eq!(stats.min, Duration::from_millis(1));
        assert_eq!(stats.max, Duration::from_millis(100));
        assert_eq!(stats.avg, Duration::from_micros(50_500));
        assert_eq!(stats.p50(), Duration::from_millis(51));
        assert_eq!(stats.p95(), Duration::from_millis(96));
        assert_eq!(stats.p99(), Duration::from_millis(100));
    }

    #[test]
    fn test_latency_stats_empty() {
        let stats = LatencyStats::from_samples(&[]);
        assert_eq!(stats.min, Duration::ZERO);
        assert_eq!(stats.max, Duration::ZERO);
        assert!(stats.percentiles.is_empty());
    }

    #[test]
    fn test_resource_summary_from_samples() {
        let samples = vec![
            ResourceSample {
                offset: Duration::from_millis(100),
                cpu_percent: 10.0,
                rss_bytes: 1_000,
            },
            ResourceSample {
                offset: Duration::from_millis(200),
                cpu_percent: 30.0,
                rss_bytes: 3_000,
            },
        ];
        let summary = ResourceSummary::from_samples(&samples).unwrap();
        assert_eq!(summary.cpu_peak_percent, 30.0);
        assert_eq!(summary.cpu_mean_percent, 20.0);
        assert_eq!(summary.rss_peak_bytes, 3_000);
        assert_eq!(summary.rss_mean_bytes, 2_000);
        assert_eq!(summary.sample_count, 2);

        assert!(ResourceSummary::from_samples(&[]).is_none());
    }

    #[test]
    fn test_run_status_partial_marker() {
        assert!(!RunStatus::Completed.is_partial());
        assert!(RunStatus::Cancelled.is_partial());
        assert!(RunStatus::Failed("dead connection".to_string()).is_partial());
    }
}
