use std::fmt::Display;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Default)]
struct TraceState {
    connect_start: Option<Instant>,
    // set when the client resolved the host itself; the dial starts here
    resolved_at: Option<Instant>,
    connect_end: Option<Instant>,
    error: Option<String>,
}

/// Records when a request's connection was started and established.
///
/// Clones share the same state, so the copy handed to the transport and the
/// copy kept by the probe observe the same timestamps.
#[derive(Debug, Clone, Default)]
pub struct ConnectTracer {
    state: Arc<Mutex<TraceState>>,
}

impl ConnectTracer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, TraceState> {
        // state is plain data, a poisoned lock still holds usable values
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Only the first call is recorded; dialing several addresses fires this more than once.
    pub fn connect_start(&self, network: &str, address: &str) {
        let mut state = self.lock();
        if state.connect_start.is_none() {
            state.connect_start = Some(Instant::now());
            tracing::debug!(network, address, "connect start");
        }
    }

    /// Name resolution finished. For hostname targets the connector is entered
    /// before the lookup, so this instant replaces the connector's start as
    /// the beginning of the dial. First call wins.
    pub fn resolve_done(&self, host: &str) {
        let mut state = self.lock();
        if state.resolved_at.is_none() {
            state.resolved_at = Some(Instant::now());
            tracing::debug!(host, "resolve done");
        }
    }

    pub fn connect_done(&self, network: &str, address: &str, error: Option<&dyn Display>) {
        let mut state = self.lock();
        match error {
            Some(err) => {
                tracing::debug!(network, address, error = %err, "connect failed");
                state.error = Some(err.to_string());
            }
            None => {
                state.connect_end = Some(Instant::now());
                tracing::debug!(network, address, "connect done");
            }
        }
    }

    /// Time between connect start and connection established.
    ///
    /// `None` while the connection is pending, after a failed connect, or when
    /// no connect happened at all.
    pub fn elapsed(&self) -> Option<Duration> {
        let state = self.lock();
        let start = state.resolved_at.or(state.connect_start)?;
        let end = state.connect_end?;
        end.checked_duration_since(start)
    }

    /// Effective start of the dial: resolve completion if seen, else connect start.
    pub fn started_at(&self) -> Option<Instant> {
        let state = self.lock();
        state.resolved_at.or(state.connect_start)
    }

    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }
}
