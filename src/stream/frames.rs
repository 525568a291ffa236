//! Per-connection frame stream

use actix_web::web::Bytes;
use futures::Stream;
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, ready};
use std::time::Duration;
use tokio::time::Sleep;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};
use tracing::{debug, trace, warn};

use super::record::frame_record;
use crate::Result;
use crate::encoder::encode_png;
use crate::source::FrameSource;

pin_project! {
    /// Infinite, paced stream of multipart PNG records
    ///
    /// The tick sleep is armed when the consumer asks for the next record, so
    /// consecutive records are always at least one interval apart and a slow
    /// consumer never receives a burst of stale frames. The stream ends only
    /// when it is dropped, when the shutdown token fires, or after yielding an
    /// encode error.
    pub struct FrameStream {
        source: Arc<dyn FrameSource>,
        interval: Duration,
        sleep: Option<Pin<Box<Sleep>>>,
        #[pin]
        cancelled: WaitForCancellationFutureOwned,
        ticks: u64,
        finished: bool,
    }
}

impl FrameStream {
    /// Create a stream over `source`, pausing `interval` before each frame
    pub fn new(
        source: Arc<dyn FrameSource>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            source,
            interval,
            sleep: None,
            cancelled: cancel.cancelled_owned(),
            ticks: 0,
            finished: false,
        }
    }

    /// Number of records produced so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

impl Stream for FrameStream {
    type Item = Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();

        if *this.finished {
            return Poll::Ready(None);
        }

        // Shutdown wins over a pending tick
        if this.cancelled.poll(cx).is_ready() {
            *this.finished = true;
            debug!(ticks = *this.ticks, "Frame stream stopped by shutdown");
            return Poll::Ready(None);
        }

        let interval = *this.interval;
        let tick = this.sleep.get_or_insert_with(|| Box::pin(tokio::time::sleep(interval)));
        ready!(tick.as_mut().poll(cx));
        *this.sleep = None;

        let geometry = this.source.geometry();
        let encoded = encode_png(this.source.snapshot(), geometry.width(), geometry.height());

        match encoded {
            Ok(png) => {
                *this.ticks += 1;
                trace!(tick = *this.ticks, bytes = png.len(), "Frame encoded");
                Poll::Ready(Some(Ok(frame_record(&png))))
            }
            Err(e) => {
                *this.finished = true;
                warn!(ticks = *this.ticks, "Ending frame stream: {}", e);
                Poll::Ready(Some(Err(e)))
            }
        }
    }
}
