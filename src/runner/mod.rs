//! Benchmark runner
//!
//! Owns one run end to end: connect, emit the merged schedule with paced
//! sends, drain, and summarize. Individual send failures are data in the
//! report; only a dead connection (a streak of transport failures) or a
//! failed drain aborts the run. Cancellation produces a partial report
//! through the same drain path.

use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::oneshot;

use crate::backend::{BackendAdapter, SendErrorKind};
use crate::config::WorkloadSpec;
use crate::metrics::{MetricsCollector, ResourceSample, ResourceSampler, RunMeta, SendOutcome};
use crate::models::{RunReport, RunStatus};
use crate::sched::MergedSchedule;
use crate::{LogBenchError, Result, TRANSPORT_FAIL_THRESHOLD};

/// Lifecycle of a runner; a runner drives exactly one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Connecting,
    Running,
    Draining,
    Completed,
    Failed,
}

/// Executes one workload against one backend adapter
#[derive(Debug)]
pub struct BenchmarkRunner<A: BackendAdapter> {
    spec: WorkloadSpec,
    adapter: A,
    state: RunState,
}

impl<A: BackendAdapter> BenchmarkRunner<A> {
    /// Create a runner for a validated workload.
    ///
    /// Validation failures surface here, before anything touches the
    /// network.
    pub fn new(spec: WorkloadSpec, adapter: A) -> Result<Self> {
        spec.validate()?;
        Ok(Self {
            spec,
            adapter,
            state: RunState::Idle,
        })
    }

    /// Current lifecycle state
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Execute the run to completion without external cancellation
    pub async fn run(&mut self) -> Result<RunReport> {
        // Keep the sender alive so the receiver never fires.
        let (_cancel_tx, cancel_rx) = oneshot::channel();
        self.run_with_cancel(cancel_rx).await
    }

    /// Execute the run; a signal (or drop) on `cancel_rx` stops emission
    /// and drains what was already accepted.
    pub async fn run_with_cancel(
        &mut self,
        mut cancel_rx: oneshot::Receiver<()>,
    ) -> Result<RunReport> {
        if self.state != RunState::Idle {
            return Err(LogBenchError::RunnerError(
                "runner has already executed; create a new runner per run".to_string(),
            ));
        }

        let started_at = Utc::now();
        let target_rate_hz: f64 = self.spec.streams.iter().map(|s| s.rate_hz).sum();

        self.state = RunState::Connecting;
        if let Err(e) = self.adapter.connect(&self.spec.backend.endpoint).await {
            self.state = RunState::Failed;
            let _ = self.adapter.disconnect().await;
            let collector = MetricsCollector::new(Instant::now(), 0);
            return Ok(collector.summarize(
                self.meta(started_at, RunStatus::Failed(e.to_string()), target_rate_hz, Duration::ZERO),
                Vec::new(),
            ));
        }

        self.state = RunState::Running;
        let run_start = Instant::now();
        let mut schedule = MergedSchedule::new(&self.spec, run_start)?;
        let mut collector = MetricsCollector::new(run_start, schedule.total_events());

        // Sampling is best-effort; a host without process stats still runs.
        let sampler = match ResourceSampler::spawn(self.spec.sample_interval, run_start) {
            Ok(sampler) => Some(sampler),
            Err(e) => {
                eprintln!("resource sampling disabled: {}", e);
                None
            }
        };

        let mut cancelled = false;
        let mut fatal: Option<String> = None;
        let mut transport_streak: u32 = 0;

        while let Some(event) = schedule.next_event(Instant::now()) {
            tokio::select! {
                _ = &mut cancel_rx => {
                    cancelled = true;
                    break;
                }
                _ = tokio::time::sleep_until(tokio::time::Instant::from_std(event.target)) => {}
            }

            let record = event.record;
            collector.on_send_start(record.seq);
            match self.adapter.send(&record).await {
                Ok(()) => {
                    collector.on_send_complete(record.seq, SendOutcome::Success);
                    transport_streak = 0;
                }
                Err(err) => {
                    collector.on_send_complete(record.seq, SendOutcome::Failed(err.kind));
                    if err.kind == SendErrorKind::Transport {
                        transport_streak += 1;
                        if transport_streak >= TRANSPORT_FAIL_THRESHOLD {
                            fatal = Some(format!(
                                "{} consecutive transport failures; last: {}",
                                transport_streak, err
                            ));
                            break;
                        }
                    } else {
                        transport_streak = 0;
                    }
                }
            }
        }

        let emission_elapsed = run_start.elapsed();

        // Drain runs on every exit path so the report reflects what the
        // backend actually accepted.
        self.state = RunState::Draining;
        if let Err(e) = self.adapter.flush().await {
            if fatal.is_none() {
                fatal = Some(format!("flush after emission failed: {}", e));
            }
        }
        let resource_samples: Vec<ResourceSample> = match sampler {
            Some(sampler) => sampler.stop().await,
            None => Vec::new(),
        };
        let _ = self.adapter.disconnect().await;

        let status = if let Some(reason) = fatal {
            self.state = RunState::Failed;
            RunStatus::Failed(reason)
        } else if cancelled {
            self.state = RunState::Completed;
            RunStatus::Cancelled
        } else {
            self.state = RunState::Completed;
            RunStatus::Completed
        };

        Ok(collector.summarize(
            self.meta(started_at, status, target_rate_hz, emission_elapsed),
            resource_samples,
        ))
    }

    fn meta(
        &self,
        started_at: chrono::DateTime<Utc>,
        status: RunStatus,
        target_rate_hz: f64,
        emission_elapsed: Duration,
    ) -> RunMeta {
        RunMeta {
            workload: self.spec.name.clone(),
            backend: self.adapter.name().to_string(),
            spec: self.spec.clone(),
            started_at,
            status,
            target_rate_hz,
            emission_elapsed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{SendError, SendResult};
    use crate::config::{DataKind, SizeSpec, StreamSpec};
    use crate::sched::Record;

    /// Adapter that records calls and fails according to a script
    struct ScriptedAdapter {
        fail_connect: bool,
        fail_send: Option<SendErrorKind>,
        sends: u64,
        flushes: u64,
        disconnects: u64,
    }

    impl ScriptedAdapter {
        fn ok() -> Self {
            Self {
                fail_connect: false,
                fail_send: None,
                sends: 0,
                flushes: 0,
                disconnects: 0,
            }
        }

        fn failing_connect() -> Self {
            Self {
                fail_connect: true,
                ..Self::ok()
            }
        }

        fn failing_sends(kind: SendErrorKind) -> Self {
            Self {
                fail_send: Some(kind),
                ..Self::ok()
            }
        }
    }

    impl BackendAdapter for ScriptedAdapter {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn connect(&mut self, endpoint: &str) -> crate::Result<()> {
            if self.fail_connect {
                Err(LogBenchError::ConnectionError(format!(
                    "refused: {}",
                    endpoint
                )))
            } else {
                Ok(())
            }
        }

        async fn send(&mut self, _record: &Record) -> SendResult {
            self.sends += 1;
            match self.fail_send {
                Some(kind) => Err(SendError::new(kind, "scripted failure")),
                None => Ok(()),
            }
        }

        async fn flush(&mut self) -> crate::Result<()> {
            self.flushes += 1;
            Ok(())
        }

        async fn disconnect(&mut self) -> crate::Result<()> {
            self.disconnects += 1;
            Ok(())
        }
    }

    fn tiny_workload(events: u64) -> WorkloadSpec {
        WorkloadSpec::new("runner-test").with_stream(
            StreamSpec::new(DataKind::Text, SizeSpec::Count(16), 1000.0).with_count(events),
        )
    }

    #[tokio::test]
    async fn test_completed_run_counts_every_record() {
        let mut runner = BenchmarkRunner::new(tiny_workload(8), ScriptedAdapter::ok()).unwrap();
        let report = runner.run().await.unwrap();

        assert_eq!(report.status, RunStatus::Completed);
        assert_eq!(report.records_sent, 8);
        assert_eq!(report.records_failed, 0);
        assert_eq!(report.records_in_flight, 0);
        assert_eq!(runner.state(), RunState::Completed);
        assert_eq!(runner.adapter.sends, 8);
        assert_eq!(runner.adapter.flushes, 1);
        assert_eq!(runner.adapter.disconnects, 1);
    }

    #[tokio::test]
    async fn test_connect_failure_yields_failed_report() {
        let mut runner =
            BenchmarkRunner::new(tiny_workload(8), ScriptedAdapter::failing_connect()).unwrap();
        let report = runner.run().await.unwrap();

        assert!(matches!(report.status, RunStatus::Failed(_)));
        assert_eq!(report.records_sent, 0);
        assert_eq!(report.records_failed, 0);
        assert_eq!(runner.state(), RunState::Failed);
        // Disconnect still runs so the adapter never leaks a half-open socket.
        assert_eq!(runner.adapter.disconnects, 1);
    }

    #[tokio::test]
    async fn test_transport_streak_aborts_the_run() {
        let adapter = ScriptedAdapter::failing_sends(SendErrorKind::Transport);
        let mut runner = BenchmarkRunner::new(tiny_workload(50), adapter).unwrap();
        let report = runner.run().await.unwrap();

        assert!(matches!(report.status, RunStatus::Failed(_)));
        assert_eq!(report.records_failed, u64::from(TRANSPORT_FAIL_THRESHOLD));
        assert_eq!(report.records_sent, 0);
        // Drain still happened on the failure path.
        assert_eq!(runner.adapter.flushes, 1);
        assert_eq!(runner.adapter.disconnects, 1);
    }

    #[tokio::test]
    async fn test_timeouts_do_not_abort_the_run() {
        let adapter = ScriptedAdapter::failing_sends(SendErrorKind::Timeout);
        let mut runner = BenchmarkRunner::new(tiny_workload(10), adapter).unwrap();
        let report = runner.run().await.unwrap();

        // Non-transport failures are per-record data, never fatal.
        assert_eq!(report.status, RunStatus::Completed);
        assert_eq!(report.records_failed, 10);
        assert_eq!(report.records_sent, 0);
    }

    #[tokio::test]
    async fn test_runner_rejects_reuse() {
        let mut runner = BenchmarkRunner::new(tiny_workload(2), ScriptedAdapter::ok()).unwrap();
        runner.run().await.unwrap();

        assert!(matches!(
            runner.run().await,
            Err(LogBenchError::RunnerError(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_workload_is_rejected_at_construction() {
        let spec = WorkloadSpec::new("no-streams");
        assert!(matches!(
            BenchmarkRunner::new(spec, ScriptedAdapter::ok()),
            Err(LogBenchError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_cancellation_produces_partial_report() {
        // Slow workload so cancellation lands mid-run.
        let spec = WorkloadSpec::new("cancel-test").with_stream(
            StreamSpec::new(DataKind::Text, SizeSpec::Count(16), 20.0).with_count(1000),
        );
        let mut runner = BenchmarkRunner::new(spec, ScriptedAdapter::ok()).unwrap();

        let (cancel_tx, cancel_rx) = oneshot::channel();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(150)).await;
            let _ = cancel_tx.send(());
        });

        let report = runner.run_with_cancel(cancel_rx).await.unwrap();
        assert_eq!(report.status, RunStatus::Cancelled);
        assert!(report.status.is_partial());
        assert!(report.records_sent < 1000);
        // Drain ran despite the early stop.
        assert_eq!(runner.adapter.flushes, 1);
        assert_eq!(runner.adapter.disconnects, 1);
    }
}
