//! Fake upstream services for middleware tests.

use bytes::Bytes;
use http::{header, Request, Response, StatusCode};
use http_body::{Body, Frame, SizeHint};
use http_body_util::BodyExt;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower::{BoxError, Service};

/// Default body served by [`FakeApp::new`]; its length is asserted all over
/// the middleware tests.
pub const DEFAULT_BODY: &str = "This string is 28 bytes long";

/// A streaming body made of pre-set chunks.
///
/// Yields one data frame per chunk, including empty chunks, which lets
/// tests exercise zero-length frames the way chunked upstreams produce
/// them.
#[derive(Debug, Clone, Default)]
pub struct ChunkBody {
    chunks: VecDeque<Bytes>,
}

impl ChunkBody {
    /// Body from a list of chunks.
    pub fn new(chunks: impl IntoIterator<Item = Bytes>) -> Self {
        ChunkBody {
            chunks: chunks.into_iter().collect(),
        }
    }

    /// Empty body.
    pub fn empty() -> Self {
        ChunkBody::default()
    }

    /// Total byte length across all chunks.
    pub fn len(&self) -> usize {
        self.chunks.iter().map(Bytes::len).sum()
    }

    /// True when the body holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<&str> for ChunkBody {
    fn from(value: &str) -> Self {
        ChunkBody::new([Bytes::copy_from_slice(value.as_bytes())])
    }
}

impl From<String> for ChunkBody {
    fn from(value: String) -> Self {
        ChunkBody::new([Bytes::from(value)])
    }
}

impl Body for ChunkBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        Poll::Ready(this.chunks.pop_front().map(|chunk| Ok(Frame::data(chunk))))
    }

    fn is_end_stream(&self) -> bool {
        self.chunks.is_empty()
    }

    fn size_hint(&self) -> SizeHint {
        SizeHint::with_exact(self.len() as u64)
    }
}

/// Fake upstream that drains the request body and streams a configured
/// response body.
#[derive(Debug, Clone)]
pub struct FakeApp {
    body: Vec<Bytes>,
    status: StatusCode,
}

impl FakeApp {
    /// App answering 200 with [`DEFAULT_BODY`].
    pub fn new() -> Self {
        FakeApp::with_body([DEFAULT_BODY])
    }

    /// App answering 200 with the given body chunks.
    pub fn with_body<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        FakeApp {
            body: chunks
                .into_iter()
                .map(|s| Bytes::copy_from_slice(s.as_ref().as_bytes()))
                .collect(),
            status: StatusCode::OK,
        }
    }

    /// App answering 200 with an empty body.
    pub fn empty() -> Self {
        FakeApp::with_body::<_, &str>([])
    }
}

impl Default for FakeApp {
    fn default() -> Self {
        FakeApp::new()
    }
}

impl<B> Service<Request<B>> for FakeApp
where
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: Send,
{
    type Response = Response<ChunkBody>;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let body = ChunkBody::new(self.body.clone());
        let status = self.status;
        Box::pin(async move {
            // Drain the request body so upload bytes get counted, the way a
            // real upstream consumes a PUT.
            let _ = req.into_body().collect().await;

            let total = body.len();
            Response::builder()
                .status(status)
                .header(header::CONTENT_TYPE, "text/plain")
                .header(header::CONTENT_LENGTH, total.to_string())
                .body(body)
                .map_err(BoxError::from)
        })
    }
}

/// Fake upstream that always fails without touching the request body.
#[derive(Debug, Clone)]
pub struct FailingApp {
    message: String,
}

impl FailingApp {
    /// App failing every call with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        FailingApp {
            message: message.into(),
        }
    }
}

impl<B> Service<Request<B>> for FailingApp
where
    B: Body + Send + 'static,
{
    type Response = Response<ChunkBody>;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _req: Request<B>) -> Self::Future {
        let message = self.message.clone();
        Box::pin(async move {
            Err(BoxError::from(std::io::Error::new(
                std::io::ErrorKind::Other,
                message,
            )))
        })
    }
}

/// Drain a response body, returning the bytes it carried.
pub async fn drain_body<B>(body: B) -> Bytes
where
    B: Body,
    B::Data: Send,
{
    match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => Bytes::new(),
    }
}
