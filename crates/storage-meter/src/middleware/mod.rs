//! Tower middleware wrapping a proxied storage service.
//!
//! [`MeterLayer`] wraps any `tower::Service` over `http` request/response
//! pairs. The request body is counted as the inner service reads it; the
//! response body is counted as the client drains it, and the audit event is
//! recorded when the response stream finishes. Telemetry never alters the
//! proxied response: events are handed to the dispatcher queue and failures
//! there are logged, not surfaced.

mod body;

pub use body::{CountingBody, MeteredBody};

use crate::meter::{MeterCore, ResponseRecorder};
use cadf::Outcome;
use http::{Request, Response};
use http_body::Body;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Layer applying request metering to a wrapped service.
#[derive(Clone)]
pub struct MeterLayer {
    core: Arc<MeterCore>,
}

impl MeterLayer {
    pub(crate) fn new(core: Arc<MeterCore>) -> Self {
        MeterLayer { core }
    }
}

impl<S> Layer<S> for MeterLayer {
    type Service = MeterService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MeterService {
            inner,
            core: Arc::clone(&self.core),
        }
    }
}

/// Service produced by [`MeterLayer`].
#[derive(Clone)]
pub struct MeterService<S> {
    inner: S,
    core: Arc<MeterCore>,
}

impl<S, ReqB, ResB> Service<Request<ReqB>> for MeterService<S>
where
    S: Service<Request<CountingBody<ReqB>>, Response = Response<ResB>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send,
    ReqB: Body + Send + 'static,
    ResB: Body + Send + 'static,
{
    type Response = Response<MeteredBody<ResB>>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqB>) -> Self::Future {
        let core = Arc::clone(&self.core);
        // Snapshot before the inner service consumes the request; `None`
        // means the request is not metered (internal traffic, ignored
        // project) and the bodies pass through with counting disabled.
        let snapshot = core.rules().snapshot(&req);
        let received = Arc::new(AtomicU64::new(0));
        let req = req.map(|body| CountingBody::new(body, Arc::clone(&received)));

        // Take the service that was driven to readiness, leave the clone.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            match inner.call(req).await {
                Ok(response) => {
                    let recorder = snapshot
                        .map(|snapshot| ResponseRecorder::new(core, snapshot, Arc::clone(&received)));
                    Ok(response.map(|body| MeteredBody::new(body, recorder)))
                }
                Err(err) => {
                    if let Some(snapshot) = snapshot {
                        core.record(
                            &snapshot,
                            received.load(Ordering::Relaxed),
                            0,
                            Outcome::Failure,
                        );
                    }
                    Err(err)
                }
            }
        })
    }
}
