use prometheus::{Encoder, GaugeVec, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

use crate::util::duration_ms;
use crate::prober::{ProbeOutcome, ProbeResult};

/// Per-run probe instruments on a private registry.
#[derive(Clone)]
pub struct ProbeMetrics {
    registry: Registry,
    latency: GaugeVec,
    // only present when latency history is enabled
    history: Option<HistogramVec>,
    failures: IntCounterVec,
}

impl ProbeMetrics {
    pub fn new(enable_latency_history: bool) -> prometheus::Result<Self> {
        let registry = Registry::new();

        let latency = GaugeVec::new(
            Opts::new(
                "probe_connect_latency_milliseconds",
                "Connect latency of the last probe in milliseconds",
            ),
            &["target"],
        )?;
        registry.register(Box::new(latency.clone()))?;

        let failures = IntCounterVec::new(
            Opts::new("probe_failures_total", "Total number of failed probes"),
            &["target", "reason"],
        )?;
        registry.register(Box::new(failures.clone()))?;

        let history = if enable_latency_history {
            let hist = HistogramVec::new(
                HistogramOpts::new(
                    "probe_connect_latency_milliseconds_history",
                    "Connect latency in milliseconds",
                )
                .buckets(vec![
                    0.05, 0.1, 0.2, 0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 50.0, 100.0, 250.0, 500.0,
                    1000.0,
                ]),
                &["target"],
            )?;
            registry.register(Box::new(hist.clone()))?;
            Some(hist)
        } else {
            None
        };

        Ok(Self {
            registry,
            latency,
            history,
            failures,
        })
    }

    pub fn observe(&self, result: &ProbeResult) {
        let target: &str = &result.target;
        match &result.outcome {
            ProbeOutcome::Success { elapsed, .. } => {
                let latency_ms = duration_ms(*elapsed);
                self.latency.with_label_values(&[target]).set(latency_ms);
                if let Some(hist) = &self.history {
                    hist.with_label_values(&[target]).observe(latency_ms);
                }
            }
            ProbeOutcome::Failure(err) => {
                self.failures.with_label_values(&[target, err.reason()]).inc();
            }
        }
    }

    /// Text exposition format.
    pub fn encode(&self) -> prometheus::Result<String> {
        let encoder = TextEncoder::new();
        let mut buf = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
