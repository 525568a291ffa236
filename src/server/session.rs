//! One client's view of the stream

use actix_web::web::Bytes;
use futures::Stream;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use tokio::sync::OwnedSemaphorePermit;
use tracing::info;

use crate::Result;
use crate::stream::FrameStream;

/// Response body of a single connection
///
/// Holds a session permit for as long as the connection streams. Dropping the
/// session (peer closed, write failed or shutdown) releases the permit.
pub(super) struct StreamSession {
    frames: Pin<Box<FrameStream>>,
    _permit: OwnedSemaphorePermit,
    peer: Option<SocketAddr>,
    errored: bool,
}

impl StreamSession {
    pub(super) fn new(
        frames: FrameStream,
        permit: OwnedSemaphorePermit,
        peer: Option<SocketAddr>,
    ) -> Self {
        Self { frames: Box::pin(frames), _permit: permit, peer, errored: false }
    }
}

impl Stream for StreamSession {
    type Item = Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let item = ready!(this.frames.as_mut().poll_next(cx));
        if matches!(item, Some(Err(_))) {
            this.errored = true;
        }
        Poll::Ready(item)
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        info!(
            peer = ?self.peer,
            frames = self.frames.ticks(),
            errored = self.errored,
            "Stream session closed"
        );
    }
}
