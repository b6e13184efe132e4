//! Concurrent connect-latency checks for a list of URLs.
//!
//! Each target gets its own task and its own HTTP client whose connector is
//! wrapped by a [`prober::ProbeTransport`]; the transport feeds a
//! [`prober::ConnectTracer`] that records connect start and end. Results stream
//! to a single [`report::Reporter`] as they finish, followed by one completion
//! call once every target has been accounted for.

pub mod config;
pub mod dispatcher;
pub mod metrics;
pub mod prober;
pub mod report;
pub mod util;

pub use dispatcher::{Dispatcher, RunSummary};
pub use prober::{HttpProber, ProbeError, ProbeOutcome, ProbeResult, Prober};
