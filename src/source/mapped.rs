//! Memory-mapped framebuffer device
//!
//! Maps exactly one frame's worth of device memory read-only. The mapping
//! lives as long as the [`MappedFramebuffer`] and is never re-established per
//! frame.

use memmap2::{Mmap, MmapOptions};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::FrameSource;
use crate::geometry::Geometry;
use crate::{Result, StreamError};

/// Read-only mapping of a framebuffer device
pub struct MappedFramebuffer {
    /// Device memory, `geometry.frame_len()` bytes
    map: Mmap,

    /// Geometry the mapping was shaped with
    geometry: Geometry,

    /// Path that was mapped
    path: PathBuf,
}

impl MappedFramebuffer {
    /// Map the device named by `geometry.device()`
    ///
    /// Names are looked up under `/dev`; absolute paths are used as given.
    pub fn open(geometry: Geometry) -> Result<Self> {
        let path = device_path(geometry.device());
        Self::open_path(path, geometry)
    }

    /// Map an explicit device path
    pub fn open_path<P: AsRef<Path>>(path: P, geometry: Geometry) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let expected = geometry.frame_len();

        debug!(
            path = %path.display(),
            width = geometry.width(),
            height = geometry.height(),
            depth = geometry.depth(),
            bytes = expected,
            "Mapping framebuffer"
        );

        let file = File::open(&path).map_err(|e| StreamError::device_error(path.clone(), e))?;
        let metadata = file.metadata().map_err(|e| StreamError::device_error(path.clone(), e))?;

        // Character devices report a zero length; only regular files can be checked here.
        // For devices the kernel rejects a mapping larger than the video memory.
        if metadata.is_file() && metadata.len() < expected as u64 {
            return Err(StreamError::DeviceSize {
                path,
                expected: expected as u64,
                actual: metadata.len(),
            });
        }

        // SAFETY: the mapping is read-only. Another process (the display
        // producer) may write the memory concurrently, which can only tear
        // the pixel content; it never invalidates the mapping itself.
        let map = unsafe { MmapOptions::new().len(expected).map(&file) }
            .map_err(|e| StreamError::device_error(path.clone(), e))?;

        info!(
            path = %path.display(),
            "Mapped framebuffer {}x{} at {} bpp",
            geometry.width(),
            geometry.height(),
            geometry.depth()
        );

        Ok(Self { map, geometry, path })
    }

    /// Path that was mapped
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FrameSource for MappedFramebuffer {
    fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    fn snapshot(&self) -> &[u8] {
        &self.map
    }
}

impl std::fmt::Debug for MappedFramebuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappedFramebuffer")
            .field("path", &self.path)
            .field("geometry", &self.geometry)
            .field("len", &self.map.len())
            .finish()
    }
}

/// Device path for a framebuffer name (`fb1` -> `/dev/fb1`)
pub fn device_path(device: &str) -> PathBuf {
    let path = Path::new(device);
    if path.is_absolute() { path.to_path_buf() } else { Path::new("/dev").join(device) }
}
