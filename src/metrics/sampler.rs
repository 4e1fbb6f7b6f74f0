//! Process resource sampler
//!
//! Samples CPU and resident memory of the benchmark process on a fixed
//! cadence, independent of the emission loop, so sampling is neither
//! coupled to nor disturbed by record-send latency. The sampler owns its
//! sample sequence and hands it back on stop; each run gets a fresh
//! instance.

use std::time::{Duration, Instant};

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::ResourceSample;
use crate::Result;

/// Background resource sampling task for one run
#[derive(Debug)]
pub struct ResourceSampler {
    handle: JoinHandle<Vec<ResourceSample>>,
    stop_tx: oneshot::Sender<()>,
}

impl ResourceSampler {
    /// Spawn the sampling task.
    ///
    /// Fails with `SamplerError` when the host exposes no process stats;
    /// callers degrade to a report without resource metrics.
    pub fn spawn(interval: Duration, run_start: Instant) -> Result<Self> {
        // Probe once up front so unsupported hosts fail before the task runs.
        let mut previous = platform::read_cpu_times()?;

        let (stop_tx, mut stop_rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            let mut samples = Vec::new();
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of a tokio interval fires immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        let Ok(current) = platform::read_cpu_times() else {
                            continue;
                        };
                        let Ok(rss_bytes) = platform::read_rss_bytes() else {
                            continue;
                        };

                        samples.push(ResourceSample {
                            offset: run_start.elapsed(),
                            cpu_percent: cpu_percent_between(&previous, &current),
                            rss_bytes,
                        });
                        previous = current;
                    }
                }
            }
            samples
        });

        Ok(Self { handle, stop_tx })
    }

    /// Stop sampling and collect the sample sequence
    pub async fn stop(self) -> Vec<ResourceSample> {
        let _ = self.stop_tx.send(());
        self.handle.await.unwrap_or_default()
    }
}

/// CPU time reading at one instant
#[derive(Debug, Clone, Copy)]
struct CpuTimes {
    /// user + system time consumed by this process, in seconds
    busy_secs: f64,
    /// when the reading was taken
    at: Instant,
}

fn cpu_percent_between(previous: &CpuTimes, current: &CpuTimes) -> f64 {
    let wall = current.at.duration_since(previous.at).as_secs_f64();
    if wall <= 0.0 {
        return 0.0;
    }
    let busy = (current.busy_secs - previous.busy_secs).max(0.0);
    busy / wall * 100.0
}

#[cfg(target_os = "linux")]
mod platform {
    use super::CpuTimes;
    use crate::{LogBenchError, Result};
    use std::time::Instant;

    /// Read user+system CPU time of this process from /proc/self/stat
    pub fn read_cpu_times() -> Result<CpuTimes> {
        let stat = std::fs::read_to_string("/proc/self/stat").map_err(|e| {
            LogBenchError::SamplerError(format!("cannot read /proc/self/stat: {}", e))
        })?;

        // The comm field may contain spaces; parse after its closing paren.
        let rest = stat.rsplit_once(')').map(|(_, r)| r).ok_or_else(|| {
            LogBenchError::SamplerError("malformed /proc/self/stat".to_string())
        })?;
        let fields: Vec<&str> = rest.split_whitespace().collect();

        // utime and stime are stat fields 14 and 15; `rest` starts at field 3.
        let utime: u64 = parse_field(&fields, 11)?;
        let stime: u64 = parse_field(&fields, 12)?;

        let ticks_per_sec = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
        let ticks_per_sec = if ticks_per_sec > 0 {
            ticks_per_sec as f64
        } else {
            100.0
        };

        Ok(CpuTimes {
            busy_secs: (utime + stime) as f64 / ticks_per_sec,
            at: Instant::now(),
        })
    }

    /// Read resident set size of this process from /proc/self/statm
    pub fn read_rss_bytes() -> Result<u64> {
        let statm = std::fs::read_to_string("/proc/self/statm").map_err(|e| {
            LogBenchError::SamplerError(format!("cannot read /proc/self/statm: {}", e))
        })?;

        let resident_pages: u64 = statm
            .split_whitespace()
            .nth(1)
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| {
                LogBenchError::SamplerError("malformed /proc/self/statm".to_string())
            })?;

        let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        let page_size = if page_size > 0 { page_size as u64 } else { 4096 };

        Ok(resident_pages * page_size)
    }

    fn parse_field(fields: &[&str], idx: usize) -> Result<u64> {
        fields
            .get(idx)
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| {
                LogBenchError::SamplerError("malformed /proc/self/stat".to_string())
            })
    }
}

#[cfg(not(target_os = "linux"))]
mod platform {
    use super::CpuTimes;
    use crate::{LogBenchError, Result};

    pub fn read_cpu_times() -> Result<CpuTimes> {
        Err(LogBenchError::SamplerError(
            "process resource sampling is only implemented on Linux".to_string(),
        ))
    }

    pub fn read_rss_bytes() -> Result<u64> {
        Err(LogBenchError::SamplerError(
            "process resource sampling is only implemented on Linux".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_percent_between_readings() {
        let start = Instant::now();
        let previous = CpuTimes {
            busy_secs: 1.0,
            at: start,
        };
        let current = CpuTimes {
            busy_secs: 1.5,
            at: start + Duration::from_secs(1),
        };
        assert!((cpu_percent_between(&previous, &current) - 50.0).abs() < 1e-9);

        // Counters never run backwards in the output.
        let rewound = CpuTimes {
            busy_secs: 0.5,
            at: start + Duration::from_secs(2),
        };
        assert_eq!(cpu_percent_between(&current, &rewound), 0.0);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_sampler_collects_samples() {
        let sampler =
            ResourceSampler::spawn(Duration::from_millis(10), Instant::now()).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        let samples = sampler.stop().await;

        assert!(!samples.is_empty());
        for sample in &samples {
            assert!(sample.rss_bytes > 0);
            assert!(sample.cpu_percent >= 0.0);
        }
        // Offsets advance with the sampling cadence.
        for pair in samples.windows(2) {
            assert!(pair[0].offset < pair[1].offset);
        }
    }

    #[cfg(not(target_os = "linux"))]
    #[tokio::test]
    async fn test_sampler_degrades_off_linux() {
        let result = ResourceSampler::spawn(Duration::from_millis(10), Instant::now());
        assert!(result.is_err());
    }
}
