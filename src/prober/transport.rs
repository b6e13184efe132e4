use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tower::{Layer, Service};

use super::trace::ConnectTracer;

pub const NETWORK: &str = "tcp";

/// Installs [`ProbeTransport`] around the HTTP client's connector.
#[derive(Debug, Clone)]
pub struct ProbeTransportLayer {
    tracer: ConnectTracer,
    address: Arc<str>,
}

impl ProbeTransportLayer {
    pub fn new(tracer: ConnectTracer, address: impl Into<Arc<str>>) -> Self {
        Self {
            tracer,
            address: address.into(),
        }
    }
}

impl<S> Layer<S> for ProbeTransportLayer {
    type Service = ProbeTransport<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ProbeTransport {
            inner,
            tracer: self.tracer.clone(),
            address: self.address.clone(),
        }
    }
}

/// Connector decorator. Connection setup is delegated to `inner` unchanged;
/// the tracer is told when it starts and how it ended.
#[derive(Debug, Clone)]
pub struct ProbeTransport<S> {
    inner: S,
    tracer: ConnectTracer,
    address: Arc<str>,
}

impl<S, R> Service<R> for ProbeTransport<S>
where
    S: Service<R>,
    S::Response: Send + 'static,
    S::Error: Display + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<S::Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: R) -> Self::Future {
        self.tracer.connect_start(NETWORK, &self.address);
        let connecting = self.inner.call(req);
        let tracer = self.tracer.clone();
        let address = self.address.clone();

        Box::pin(async move {
            let result = connecting.await;
            match &result {
                Ok(_) => tracer.connect_done(NETWORK, &address, None),
                Err(err) => tracer.connect_done(NETWORK, &address, Some(err)),
            }
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tower::{ServiceExt, service_fn};

    #[tokio::test]
    async fn elapsed_matches_connector_delay() {
        let delay = Duration::from_millis(30);
        let tracer = ConnectTracer::new();
        let connector = service_fn(move |_: ()| async move {
            tokio::time::sleep(delay).await;
            Ok::<_, std::io::Error>("conn")
        });
        let transport = ProbeTransportLayer::new(tracer.clone(), "example.com:443").layer(connector);

        let conn = transport.oneshot(()).await.unwrap();
        assert_eq!(conn, "conn");

        let elapsed = tracer.elapsed().expect("connect finished");
        assert!(elapsed >= delay, "{elapsed:?}");
        assert!(elapsed < delay + Duration::from_millis(250), "{elapsed:?}");
    }

    #[tokio::test]
    async fn connector_error_is_recorded_and_passed_through() {
        let tracer = ConnectTracer::new();
        let connector = service_fn(|_: ()| async {
            Err::<(), _>(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))
        });
        let transport = ProbeTransportLayer::new(tracer.clone(), "127.0.0.1:1").layer(connector);

        let err = transport.oneshot(()).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::ConnectionRefused);
        assert_eq!(tracer.error().as_deref(), Some("connection refused"));
        assert_eq!(tracer.elapsed(), None);
        assert!(tracer.started_at().is_some());
    }

    #[tokio::test]
    async fn repeated_dials_keep_first_start() {
        let tracer = ConnectTracer::new();
        let connector = service_fn(|_: ()| async { Ok::<_, std::io::Error>(()) });
        let mut transport = ProbeTransportLayer::new(tracer.clone(), "example.com:80").layer(connector);

        ServiceExt::<()>::ready(&mut transport).await.unwrap().call(()).await.unwrap();
        let first = tracer.started_at();
        tokio::time::sleep(Duration::from_millis(5)).await;
        ServiceExt::<()>::ready(&mut transport).await.unwrap().call(()).await.unwrap();

        assert_eq!(tracer.started_at(), first);
    }
}
