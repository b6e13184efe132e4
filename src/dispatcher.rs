//! Fan-out of one probe task per target, fan-in of their results to a
//! single listener, and a completion signal sent once every probe is done.

use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::{self, JoinSet};

use crate::metrics::ProbeMetrics;
use crate::prober::{ProbeError, ProbeOutcome, ProbeResult, Prober};
use crate::report::Reporter;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: &ProbeOutcome) {
        self.total += 1;
        if outcome.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }
}

pub struct Dispatcher<P> {
    prober: Arc<P>,
    capacity: usize,
    metrics: Option<ProbeMetrics>,
}

impl<P: Prober> Dispatcher<P> {
    pub fn new(prober: P) -> Self {
        Self {
            prober: Arc::new(prober),
            capacity: DEFAULT_CHANNEL_CAPACITY,
            metrics: None,
        }
    }

    /// Buffer size of the result channel. Zero is raised to one.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn with_metrics(mut self, metrics: ProbeMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Probes every target concurrently and hands each result to `reporter`
    /// as it arrives. Returns after `reporter.complete` has been called, which
    /// happens exactly once and only after all targets have been reported.
    pub async fn run<R>(&self, targets: Vec<String>, reporter: &mut R) -> io::Result<RunSummary>
    where
        R: Reporter + ?Sized,
    {
        let (res_tx, mut res_rx) = mpsc::channel(self.capacity);
        let (done_tx, mut done_rx) = oneshot::channel();

        tracing::info!(targets = targets.len(), "dispatching probes");
        let _launcher = AbortOnDrop(tokio::spawn(launch(
            self.prober.clone(),
            targets,
            res_tx,
            done_tx,
        )));

        let mut summary = RunSummary::default();
        loop {
            tokio::select! {
                // results first: everything sent before the signal is drained before we stop
                biased;
                Some(result) = res_rx.recv() => {
                    summary.record(&result.outcome);
                    if let Some(metrics) = &self.metrics {
                        metrics.observe(&result);
                    }
                    reporter.result(&result)?;
                }
                done = &mut done_rx => {
                    if done.is_err() {
                        tracing::error!("launcher exited without signalling completion");
                    }
                    break;
                }
            }
        }

        tracing::info!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "all probes finished"
        );
        reporter.complete(&summary)?;
        Ok(summary)
    }
}

/// Aborts the launcher, and with it every probe still in flight, when the
/// run is abandoned early.
struct AbortOnDrop(task::JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Starts one task per target, waits for all of them, then signals `done`.
async fn launch<P: Prober>(
    prober: Arc<P>,
    targets: Vec<String>,
    results: mpsc::Sender<ProbeResult>,
    done: oneshot::Sender<()>,
) {
    let mut probes = JoinSet::new();
    let mut pending: HashMap<task::Id, Arc<str>> = HashMap::new();

    for target in targets {
        let target: Arc<str> = Arc::from(target);
        let handle = probes.spawn(probe_one(prober.clone(), target.clone(), results.clone()));
        pending.insert(handle.id(), target);
    }

    while let Some(joined) = probes.join_next_with_id().await {
        match joined {
            Ok((id, ())) => {
                pending.remove(&id);
            }
            Err(err) => {
                // the task never got to send its own result
                let target = pending
                    .remove(&err.id())
                    .unwrap_or_else(|| Arc::from("<unknown>"));
                tracing::error!(site = %target, error = %err, "probe task aborted");
                let result = ProbeResult {
                    target,
                    outcome: ProbeOutcome::Failure(ProbeError::Aborted(err.to_string())),
                };
                if results.send(result).await.is_err() {
                    tracing::debug!("listener gone, dropping aborted result");
                }
            }
        }
    }

    drop(results);
    let _ = done.send(());
}

async fn probe_one<P: Prober>(prober: Arc<P>, target: Arc<str>, results: mpsc::Sender<ProbeResult>) {
    let outcome = prober.probe(&target).await;
    if results.send(ProbeResult { target, outcome }).await.is_err() {
        tracing::debug!("listener gone, dropping result");
    }
}
