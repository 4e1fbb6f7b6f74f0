//! logbench binary entry point

use std::process;

use tokio::sync::oneshot;

use logbench::backend::{BackendKind, RerunAdapter};
use logbench::config::persistence::ReportStorage;
use logbench::config::WorkloadSpec;
use logbench::runner::BenchmarkRunner;
use logbench::Result;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let path = match std::env::args().nth(1) {
        Some(path) => path,
        None => {
            eprintln!("usage: logbench <workload.toml>");
            process::exit(2);
        }
    };

    let spec = WorkloadSpec::load(&path)?;
    spec.backend.kind.ensure_supported()?;

    let adapter = match spec.backend.kind {
        BackendKind::Rerun => RerunAdapter::new(),
        // ensure_supported already rejected everything else
        BackendKind::Foxglove => unreachable!(),
    };

    let mut runner = BenchmarkRunner::new(spec, adapter)?;

    // Ctrl-C stops emission; the run drains and reports what it managed.
    let (cancel_tx, cancel_rx) = oneshot::channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = cancel_tx.send(());
        }
    });

    let report = runner.run_with_cancel(cancel_rx).await?;
    println!("{}", report.summary());

    let storage = ReportStorage::new()?;
    storage.append_report(report)?;
    println!("report appended to {}", storage.reports_path().display());

    Ok(())
}
