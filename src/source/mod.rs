//! Frame sources
//!
//! A [`FrameSource`] hands out the current raw pixel content of a framebuffer.
//! The production source is [`MappedFramebuffer`], a read-only memory map of
//! the device that is opened once and shared by every stream session.

mod mapped;

pub use mapped::{MappedFramebuffer, device_path};

use crate::geometry::Geometry;

/// Read-only access to raw framebuffer pixels
///
/// Snapshots borrow live memory. The content may change while it is being
/// read, so a snapshot can show a torn frame; callers use it for the current
/// tick only and never keep it.
pub trait FrameSource: Send + Sync + 'static {
    /// Geometry the source was opened with
    fn geometry(&self) -> &Geometry;

    /// Raw native-endian 16-bit samples, row-major, `geometry().frame_len()` bytes
    fn snapshot(&self) -> &[u8];
}
