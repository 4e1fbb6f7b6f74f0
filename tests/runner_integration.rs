//! End-to-end runner tests against mock backend adapters.

use std::time::{Duration, Instant};

use tokio::sync::oneshot;

use logbench::backend::{BackendAdapter, SendError, SendResult};
use logbench::config::{DataKind, SizeSpec, StreamSpec, WorkloadSpec};
use logbench::models::RunStatus;
use logbench::runner::BenchmarkRunner;
use logbench::sched::Record;
use logbench::Result;

/// Adapter that accepts everything instantly
#[derive(Default)]
struct AcceptAll {
    sends: u64,
}

impl BackendAdapter for AcceptAll {
    fn name(&self) -> &'static str {
        "accept-all"
    }

    async fn connect(&mut self, _endpoint: &str) -> Result<()> {
        Ok(())
    }

    async fn send(&mut self, _record: &Record) -> SendResult {
        self.sends += 1;
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Adapter that times out every n-th send
struct FlakyEveryNth {
    n: u64,
    sends: u64,
}

impl BackendAdapter for FlakyEveryNth {
    fn name(&self) -> &'static str {
        "flaky"
    }

    async fn connect(&mut self, _endpoint: &str) -> Result<()> {
        Ok(())
    }

    async fn send(&mut self, _record: &Record) -> SendResult {
        self.sends += 1;
        if self.sends % self.n == 0 {
            Err(SendError::timeout("simulated slow backend"))
        } else {
            Ok(())
        }
    }

    async fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Adapter whose sends take a fixed amount of time
struct SlowAdapter {
    delay: Duration,
}

impl BackendAdapter for SlowAdapter {
    fn name(&self) -> &'static str {
        "slow"
    }

    async fn connect(&mut self, _endpoint: &str) -> Result<()> {
        Ok(())
    }

    async fn send(&mut self, _record: &Record) -> SendResult {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        Ok(())
    }
}

fn text_workload(rate_hz: f64, duration: Duration) -> WorkloadSpec {
    WorkloadSpec::new("integration").with_stream(
        StreamSpec::new(DataKind::Text, SizeSpec::Count(100), rate_hz).with_duration(duration),
    )
}

#[tokio::test]
async fn paced_run_achieves_declared_rate() {
    let spec = text_workload(10.0, Duration::from_secs(1));
    let mut runner = BenchmarkRunner::new(spec, AcceptAll::default()).unwrap();

    let wall_start = Instant::now();
    let report = runner.run().await.unwrap();
    let wall = wall_start.elapsed();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.records_sent, 10);
    assert_eq!(report.records_failed, 0);

    // Ten events on a 100ms grid span 0..900ms of emission time.
    assert!(wall >= Duration::from_millis(800), "finished too fast: {:?}", wall);
    assert!(wall <= Duration::from_millis(1500), "finished too slow: {:?}", wall);
    assert!(
        report.achieved_rate_hz > 8.0 && report.achieved_rate_hz < 14.0,
        "achieved rate out of band: {}",
        report.achieved_rate_hz
    );
}

#[tokio::test]
async fn multi_stream_run_sends_every_stream() {
    let spec = WorkloadSpec::new("multi")
        .with_stream(
            StreamSpec::new(DataKind::Text, SizeSpec::Count(50), 20.0)
                .with_duration(Duration::from_millis(500)),
        )
        .with_stream(
            StreamSpec::new(
                DataKind::Image,
                SizeSpec::Dimensions {
                    width: 16,
                    height: 16,
                },
                10.0,
            )
            .with_duration(Duration::from_millis(500)),
        );
    let mut runner = BenchmarkRunner::new(spec, AcceptAll::default()).unwrap();

    let report = runner.run().await.unwrap();
    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.records_sent, 10 + 5);
    assert_eq!(report.latency_samples.len(), 15);
}

#[tokio::test]
async fn per_record_failures_do_not_stop_the_run() {
    let spec = WorkloadSpec::new("flaky").with_stream(
        StreamSpec::new(DataKind::Text, SizeSpec::Count(100), 200.0).with_count(30),
    );
    let adapter = FlakyEveryNth { n: 3, sends: 0 };
    let mut runner = BenchmarkRunner::new(spec, adapter).unwrap();

    let report = runner.run().await.unwrap();
    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.records_failed, 10);
    assert_eq!(report.records_sent, 20);
    assert_eq!(report.records_in_flight, 0);
}

#[tokio::test]
async fn send_latency_shows_up_in_the_report() {
    let spec = WorkloadSpec::new("slow").with_stream(
        StreamSpec::new(DataKind::Text, SizeSpec::Count(100), 100.0).with_count(10),
    );
    let adapter = SlowAdapter {
        delay: Duration::from_millis(5),
    };
    let mut runner = BenchmarkRunner::new(spec, adapter).unwrap();

    let report = runner.run().await.unwrap();
    assert_eq!(report.records_sent, 10);
    assert!(
        report.latency.avg >= Duration::from_millis(5),
        "avg latency below the injected delay: {:?}",
        report.latency.avg
    );
    assert!(report.latency.min >= Duration::from_millis(5));
    assert!(report.latency.p99() >= report.latency.p50());
}

#[tokio::test]
async fn connect_refused_yields_failed_report_not_error() {
    // Nothing listens on this endpoint.
    let spec = text_workload(10.0, Duration::from_secs(1))
        .with_backend(logbench::backend::BackendKind::Rerun, "127.0.0.1:1");
    let adapter = logbench::backend::RerunAdapter::new();
    let mut runner = BenchmarkRunner::new(spec, adapter).unwrap();

    let report = runner.run().await.unwrap();
    assert!(matches!(report.status, RunStatus::Failed(_)));
    assert_eq!(report.records_sent, 0);
    assert!(report.latency_samples.is_empty());
}

#[tokio::test]
async fn cancellation_mid_run_reports_partial_results() {
    let spec = WorkloadSpec::new("cancelled").with_stream(
        StreamSpec::new(DataKind::Text, SizeSpec::Count(100), 50.0).with_count(500),
    );
    let mut runner = BenchmarkRunner::new(spec, AcceptAll::default()).unwrap();

    let (cancel_tx, cancel_rx) = oneshot::channel();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        let _ = cancel_tx.send(());
    });

    let report = runner.run_with_cancel(cancel_rx).await.unwrap();
    assert_eq!(report.status, RunStatus::Cancelled);
    assert!(report.status.is_partial());
    assert!(report.records_sent > 0, "nothing was sent before cancellation");
    assert!(report.records_sent < 500);
}

#[tokio::test]
async fn report_spec_snapshot_matches_the_input() {
    let spec = text_workload(100.0, Duration::from_millis(100));
    let mut runner = BenchmarkRunner::new(spec.clone(), AcceptAll::default()).unwrap();

    let report = runner.run().await.unwrap();
    assert_eq!(report.workload, spec.name);
    assert_eq!(report.spec.streams.len(), 1);
    assert_eq!(report.target_rate_hz, 100.0);
    assert!(report.finished_at >= report.started_at);
}
