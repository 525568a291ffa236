//! Paced multipart frame streams
//!
//! Every client connection gets its own [`FrameStream`]: an infinite stream
//! that sleeps for one tick, snapshots the source, encodes the snapshot as a
//! PNG and yields it wrapped in `multipart/x-mixed-replace` framing.

mod frames;
mod record;

pub use frames::FrameStream;
pub use record::{BOUNDARY, FRAME_CONTENT_TYPE, frame_record, split_record};

use std::time::Duration;

/// Delay before each frame, including the first
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);
