//! Byte-counting body adapters.
//!
//! `CountingBody` wraps the request body and adds data-frame lengths to a
//! shared counter as the inner service reads it. `MeteredBody` wraps the
//! response body and records the finished request exactly once, either when
//! the stream ends or when the body is dropped early (client disconnect).

use crate::meter::ResponseRecorder;
use bytes::Buf;
use http_body::{Body, Frame, SizeHint};
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{ready, Context, Poll};

pin_project! {
    /// Request body wrapper counting bytes received.
    pub struct CountingBody<B> {
        #[pin]
        inner: B,
        counter: Arc<AtomicU64>,
    }
}

impl<B> CountingBody<B> {
    pub(crate) fn new(inner: B, counter: Arc<AtomicU64>) -> Self {
        CountingBody { inner, counter }
    }
}

impl<B: Body> Body for CountingBody<B> {
    type Data = B::Data;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.project();
        match ready!(this.inner.poll_frame(cx)) {
            Some(Ok(frame)) => {
                if let Some(data) = frame.data_ref() {
                    this.counter
                        .fetch_add(data.remaining() as u64, Ordering::Relaxed);
                }
                Poll::Ready(Some(Ok(frame)))
            }
            other => Poll::Ready(other),
        }
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

pin_project! {
    /// Response body wrapper counting bytes sent.
    ///
    /// Recording fires once: at end-of-stream, on a stream error (the bytes
    /// already forwarded still count), or on drop when the client went away
    /// before the stream finished.
    pub struct MeteredBody<B> {
        #[pin]
        inner: B,
        sent: u64,
        recorder: Option<ResponseRecorder>,
    }

    impl<B> PinnedDrop for MeteredBody<B> {
        fn drop(this: Pin<&mut Self>) {
            let this = this.project();
            if let Some(recorder) = this.recorder.take() {
                recorder.complete(*this.sent);
            }
        }
    }
}

impl<B> MeteredBody<B> {
    pub(crate) fn new(inner: B, recorder: Option<ResponseRecorder>) -> Self {
        MeteredBody {
            inner,
            sent: 0,
            recorder,
        }
    }
}

impl<B: Body> Body for MeteredBody<B> {
    type Data = B::Data;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.project();
        match ready!(this.inner.poll_frame(cx)) {
            Some(Ok(frame)) => {
                if let Some(data) = frame.data_ref() {
                    *this.sent += data.remaining() as u64;
                }
                Poll::Ready(Some(Ok(frame)))
            }
            Some(Err(e)) => {
                if let Some(recorder) = this.recorder.take() {
                    recorder.complete(*this.sent);
                }
                Poll::Ready(Some(Err(e)))
            }
            None => {
                if let Some(recorder) = this.recorder.take() {
                    recorder.complete(*this.sent);
                }
                Poll::Ready(None)
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
