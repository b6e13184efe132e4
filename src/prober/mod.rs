use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub mod http;
pub mod resolve;
pub mod trace;
pub mod transport;

pub use http::{HttpProber, ProbeRequest};
pub use resolve::{SystemResolver, TracingResolver};
pub use trace::ConnectTracer;
pub use transport::{ProbeTransport, ProbeTransportLayer};

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("invalid target: {0}")]
    InvalidTarget(String),

    #[error("failed to build client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("connect failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("response arrived without connect timing")]
    MissingTiming,

    #[error("probe aborted: {0}")]
    Aborted(String),
}

impl ProbeError {
    /// Short label used for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            ProbeError::InvalidTarget(_) => "invalid_target",
            ProbeError::Client(_) => "client",
            ProbeError::Connect(_) => "connect",
            ProbeError::Request(_) => "request",
            ProbeError::MissingTiming => "missing_timing",
            ProbeError::Aborted(_) => "aborted",
        }
    }
}

#[derive(Debug)]
pub enum ProbeOutcome {
    Success { elapsed: Duration, status: Option<u16> },
    Failure(ProbeError),
}

impl ProbeOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ProbeOutcome::Success { .. })
    }

    pub fn elapsed(&self) -> Option<Duration> {
        match self {
            ProbeOutcome::Success { elapsed, .. } => Some(*elapsed),
            ProbeOutcome::Failure(_) => None,
        }
    }
}

/// One finished probe, as delivered to the listener.
#[derive(Debug)]
pub struct ProbeResult {
    pub target: Arc<str>,
    pub outcome: ProbeOutcome,
}

/// Measures a single target. Implementations must turn every failure into
/// [`ProbeOutcome::Failure`] instead of erroring out of the run.
pub trait Prober: Send + Sync + 'static {
    fn probe(&self, target: &str) -> impl Future<Output = ProbeOutcome> + Send;
}
