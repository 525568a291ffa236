//! Test utilities for frame sources and stream fixtures
//!
//! These helpers stand in for a real framebuffer device so the encoder,
//! streams and server can be exercised on any machine.

#![cfg(any(test, feature = "benchmark"))]

use crate::geometry::{Geometry, SAMPLE_BITS};
use crate::source::FrameSource;

/// Device name used by in-memory framebuffers
pub const MEMORY_DEVICE: &str = "memory";

/// Framebuffer held in process memory
///
/// The buffer is not checked against the geometry, which lets tests build
/// deliberately short frames.
#[derive(Debug, Clone)]
pub struct MemoryFramebuffer {
    geometry: Geometry,
    data: Vec<u8>,
}

impl MemoryFramebuffer {
    /// Wrap `data` as the content of a framebuffer with `geometry`
    pub fn new(geometry: Geometry, data: Vec<u8>) -> Self {
        Self { geometry, data }
    }

    /// 16 bpp framebuffer filled with a diagonal gradient
    ///
    /// # Panics
    ///
    /// Panics if either dimension is zero.
    pub fn gradient(width: u32, height: u32) -> Self {
        let geometry = Geometry::new(MEMORY_DEVICE, width, height, SAMPLE_BITS)
            .expect("gradient needs a non-zero geometry");
        Self { data: gradient_samples(width, height), geometry }
    }
}

impl FrameSource for MemoryFramebuffer {
    fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    fn snapshot(&self) -> &[u8] {
        &self.data
    }
}

/// Native-endian 16-bit samples forming a diagonal gradient
pub fn gradient_samples(width: u32, height: u32) -> Vec<u8> {
    let mut samples = Vec::with_capacity(width as usize * height as usize * 2);
    let span = (u64::from(width) + u64::from(height)).max(1);
    for y in 0..height {
        for x in 0..width {
            let value = ((u64::from(x) + u64::from(y)) * 0xFFFF / span) as u16;
            samples.extend_from_slice(&value.to_ne_bytes());
        }
    }
    samples
}

/// Byte offsets of every occurrence of `needle` in `haystack`
pub fn find_all(haystack: &[u8], needle: &[u8]) -> Vec<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return Vec::new();
    }
    haystack
        .windows(needle.len())
        .enumerate()
        .filter(|(_, window)| *window == needle)
        .map(|(offset, _)| offset)
        .collect()
}
