use std::sync::Arc;

use reqwest::dns::Resolve;
use reqwest::{Client, Url};
use tracing::{Instrument, Span};

use super::resolve::{SystemResolver, TracingResolver};
use super::trace::ConnectTracer;
use super::transport::ProbeTransportLayer;
use super::{ProbeError, ProbeOutcome, Prober};
use crate::util::target_address;

/// A single GET against one target, with its own client so the connect
/// events seen by the tracer belong to this request only.
pub struct ProbeRequest {
    target: Arc<str>,
    url: Url,
    tracer: ConnectTracer,
    span: Span,
    client: Client,
}

impl ProbeRequest {
    /// Prepares the request. Nothing touches the network until [`execute`](Self::execute).
    pub fn new(target: &str) -> Result<Self, ProbeError> {
        Self::with_resolver(target, Arc::new(SystemResolver))
    }

    /// Like [`new`](Self::new), looking hosts up through `resolver`.
    pub fn with_resolver(target: &str, resolver: Arc<dyn Resolve>) -> Result<Self, ProbeError> {
        let url = Url::parse(target)
            .map_err(|e| ProbeError::InvalidTarget(format!("{target}: {e}")))?;
        let address = target_address(&url)
            .ok_or_else(|| ProbeError::InvalidTarget(format!("{target}: no host")))?;

        let tracer = ConnectTracer::new();
        let span = tracing::info_span!("probe", site = %target);
        let client = Client::builder()
            .dns_resolver(Arc::new(TracingResolver::new(resolver, tracer.clone())))
            .connector_layer(ProbeTransportLayer::new(tracer.clone(), address))
            .build()
            .map_err(ProbeError::Client)?;

        Ok(Self {
            target: Arc::from(target),
            url,
            tracer,
            span,
            client,
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn tracer(&self) -> &ConnectTracer {
        &self.tracer
    }

    pub async fn execute(self) -> ProbeOutcome {
        let Self {
            url,
            tracer,
            span,
            client,
            ..
        } = self;

        let sent = client.get(url).send().instrument(span.clone()).await;
        span.in_scope(|| match sent {
            Ok(resp) => match tracer.elapsed() {
                Some(elapsed) => {
                    let status = resp.status().as_u16();
                    tracing::info!(?elapsed, status, "probe succeeded");
                    ProbeOutcome::Success {
                        elapsed,
                        status: Some(status),
                    }
                }
                None => {
                    tracing::warn!("response without connect timing");
                    ProbeOutcome::Failure(ProbeError::MissingTiming)
                }
            },
            Err(err) => {
                let err = match tracer.error() {
                    Some(connect_err) => ProbeError::Connect(connect_err),
                    None => ProbeError::Request(err),
                };
                tracing::warn!(error = %err, "probe failed");
                ProbeOutcome::Failure(err)
            }
        })
    }
}

/// Production prober: one [`ProbeRequest`] per target.
#[derive(Clone)]
pub struct HttpProber {
    resolver: Arc<dyn Resolve>,
}

impl HttpProber {
    pub fn new() -> Self {
        Self::with_resolver(Arc::new(SystemResolver))
    }

    pub fn with_resolver(resolver: Arc<dyn Resolve>) -> Self {
        Self { resolver }
    }
}

impl Default for HttpProber {
    fn default() -> Self {
        Self::new()
    }
}

impl Prober for HttpProber {
    async fn probe(&self, target: &str) -> ProbeOutcome {
        match ProbeRequest::with_resolver(target, self.resolver.clone()) {
            Ok(request) => request.execute().await,
            Err(err) => {
                tracing::warn!(site = target, error = %err, "could not build probe request");
                ProbeOutcome::Failure(err)
            }
        }
    }
}
