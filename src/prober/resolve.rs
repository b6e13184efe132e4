use std::net::SocketAddr;
use std::sync::Arc;

use reqwest::dns::{Addrs, Name, Resolve, Resolving};

use super::trace::ConnectTracer;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Host lookup through the OS resolver, as `tokio::net::lookup_host` does it.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

impl Resolve for SystemResolver {
    fn resolve(&self, name: Name) -> Resolving {
        Box::pin(async move {
            // port is replaced by the connector
            let addrs: Vec<SocketAddr> = tokio::net::lookup_host((name.as_str(), 0)).await?.collect();
            let addrs: Addrs = Box::new(addrs.into_iter());
            Ok::<_, BoxError>(addrs)
        })
    }
}

/// Delegates to `inner` and marks the tracer once an address is known, so the
/// connect time starts after the lookup.
pub struct TracingResolver {
    inner: Arc<dyn Resolve>,
    tracer: ConnectTracer,
}

impl TracingResolver {
    pub fn new(inner: Arc<dyn Resolve>, tracer: ConnectTracer) -> Self {
        Self { inner, tracer }
    }
}

impl Resolve for TracingResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let host = name.as_str().to_string();
        let tracer = self.tracer.clone();
        let resolving = self.inner.resolve(name);
        Box::pin(async move {
            let addrs = resolving.await?;
            tracer.resolve_done(&host);
            Ok::<_, BoxError>(addrs)
        })
    }
}
