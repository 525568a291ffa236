//! Framebuffer geometry and its auto-detection
//!
//! The geometry (width, height, bits per pixel) can be given explicitly or
//! left as [`Dimension::Auto`], in which case it is read from the device's
//! sysfs descriptors under `/sys/class/graphics/<device>/`:
//!
//! - `virtual_size`: `WIDTH,HEIGHT`
//! - `bits_per_pixel`: decimal integer
//!
//! Detection failures are logged and leave the field unresolved. Turning a
//! [`ResolvedGeometry`] into a [`Geometry`] then fails loudly instead of
//! defaulting to zero.

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

use crate::{Result, StreamError};

/// Root of the framebuffer class in sysfs
pub const SYSFS_GRAPHICS_ROOT: &str = "/sys/class/graphics";

/// Descriptor holding `WIDTH,HEIGHT`
pub const VIRTUAL_SIZE: &str = "virtual_size";

/// Descriptor holding the bits per pixel
pub const BITS_PER_PIXEL: &str = "bits_per_pixel";

/// Bits in one framebuffer sample
pub const SAMPLE_BITS: u32 = 16;

/// Sample depths the encoder understands
pub const SUPPORTED_DEPTHS: &[u32] = &[16];

/// A geometry value that is either detected from the device or given explicitly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "DimensionRepr")]
pub enum Dimension {
    /// Read from the device descriptors
    #[default]
    Auto,

    /// Fixed positive value
    Explicit(u32),
}

impl Dimension {
    /// Explicit value, if any
    pub fn explicit(self) -> Option<u32> {
        match self {
            Dimension::Auto => None,
            Dimension::Explicit(value) => Some(value),
        }
    }

    pub fn is_auto(self) -> bool {
        matches!(self, Dimension::Auto)
    }
}

impl FromStr for Dimension {
    type Err = StreamError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("auto") {
            return Ok(Dimension::Auto);
        }

        match trimmed.parse::<u32>() {
            Ok(0) => Err(StreamError::config_error(format!(
                "'{}' is not a positive integer or 'auto'",
                s
            ))),
            Ok(value) => Ok(Dimension::Explicit(value)),
            Err(e) => Err(StreamError::config_error_with_source(
                format!("'{}' is not a positive integer or 'auto'", s),
                Box::new(e),
            )),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Auto => f.write_str("auto"),
            Dimension::Explicit(value) => write!(f, "{}", value),
        }
    }
}

/// Config file representation: `auto` or a bare integer
#[derive(Deserialize)]
#[serde(untagged)]
enum DimensionRepr {
    Number(u64),
    Text(String),
}

impl TryFrom<DimensionRepr> for Dimension {
    type Error = StreamError;

    fn try_from(repr: DimensionRepr) -> Result<Self> {
        match repr {
            DimensionRepr::Number(value) => value.to_string().parse(),
            DimensionRepr::Text(text) => text.parse(),
        }
    }
}

/// What the caller asked for: a device and three possibly-automatic dimensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometryRequest {
    pub device: String,
    pub width: Dimension,
    pub height: Dimension,
    pub depth: Dimension,
}

/// Output of the resolver; `None` marks a field that could not be detected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedGeometry {
    pub device: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub depth: Option<u32>,
}

/// Fully resolved, validated framebuffer geometry
///
/// Built only through [`Geometry::new`], so the frame length always fits in
/// memory addressable by this platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Geometry {
    device: String,
    width: u32,
    height: u32,
    depth: u32,
    frame_len: usize,
}

impl Geometry {
    /// Validate and build a geometry
    pub fn new(device: impl Into<String>, width: u32, height: u32, depth: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(StreamError::invalid_geometry(format!(
                "{}x{} has a zero dimension",
                width, height
            )));
        }
        if !SUPPORTED_DEPTHS.contains(&depth) {
            return Err(StreamError::invalid_geometry(format!(
                "{} bits per pixel is not supported (supported: {:?})",
                depth, SUPPORTED_DEPTHS
            )));
        }

        let samples_per_pixel = (depth / SAMPLE_BITS) as usize;
        let frame_len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(samples_per_pixel))
            .and_then(|samples| samples.checked_mul(SAMPLE_BITS as usize / 8))
            .filter(|&len| len <= isize::MAX as usize)
            .ok_or_else(|| {
                StreamError::invalid_geometry(format!(
                    "a {}x{} frame at {} bpp is too large to map",
                    width, height, depth
                ))
            })?;

        Ok(Self { device: device.into(), width, height, depth, frame_len })
    }

    /// Device name or path the geometry belongs to
    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bits per pixel
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Number of 16-bit samples making up one pixel
    pub fn samples_per_pixel(&self) -> usize {
        (self.depth / SAMPLE_BITS) as usize
    }

    /// Number of pixels in one frame
    pub fn pixel_count(&self) -> usize {
        // Bounded by frame_len, which was checked in new()
        self.width as usize * self.height as usize
    }

    /// Byte length of one mapped frame
    pub fn frame_len(&self) -> usize {
        self.frame_len
    }
}

impl TryFrom<ResolvedGeometry> for Geometry {
    type Error = StreamError;

    fn try_from(resolved: ResolvedGeometry) -> Result<Self> {
        let width = resolved.width.ok_or_else(|| StreamError::missing_geometry("width"))?;
        let height = resolved.height.ok_or_else(|| StreamError::missing_geometry("height"))?;
        let depth = resolved.depth.ok_or_else(|| StreamError::missing_geometry("depth"))?;
        Geometry::new(resolved.device, width, height, depth)
    }
}

/// Source of device descriptor contents
pub trait Descriptors {
    /// Read the raw content of the named descriptor
    fn read(&self, name: &str) -> Result<String>;
}

/// Descriptors read from sysfs
#[derive(Debug, Clone)]
pub struct SysfsDescriptors {
    dir: PathBuf,
}

impl SysfsDescriptors {
    /// Descriptors of `device` under the standard sysfs root
    pub fn for_device(device: &str) -> Self {
        Self::with_root(SYSFS_GRAPHICS_ROOT, device)
    }

    /// Descriptors of `device` under a custom root
    pub fn with_root(root: impl AsRef<Path>, device: &str) -> Self {
        Self { dir: root.as_ref().join(device_name(device)) }
    }

    /// Directory holding the descriptors
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Descriptors for SysfsDescriptors {
    fn read(&self, name: &str) -> Result<String> {
        let path = self.dir.join(name);
        std::fs::read_to_string(&path).map_err(|e| StreamError::descriptor_error(path, e))
    }
}

/// Resolves a [`GeometryRequest`] against device descriptors
#[derive(Debug, Clone)]
pub struct GeometryResolver<D = SysfsDescriptors> {
    descriptors: D,
}

impl GeometryResolver<SysfsDescriptors> {
    /// Resolver reading the standard sysfs descriptors of `device`
    pub fn sysfs(device: &str) -> Self {
        let descriptors = SysfsDescriptors::for_device(device);
        debug!(dir = %descriptors.dir().display(), "Reading geometry descriptors");
        Self::new(descriptors)
    }
}

impl<D: Descriptors> GeometryResolver<D> {
    pub fn new(descriptors: D) -> Self {
        Self { descriptors }
    }

    /// Resolve every `Auto` dimension of `request`
    ///
    /// `virtual_size` is read once when width or height is automatic, and
    /// only the automatic fields take its values. Failures are logged and
    /// leave the affected fields `None`.
    pub fn resolve(&self, request: &GeometryRequest) -> ResolvedGeometry {
        let mut width = request.width.explicit();
        let mut height = request.height.explicit();
        let mut depth = request.depth.explicit();

        if request.width.is_auto() || request.height.is_auto() {
            match self.read_virtual_size() {
                Ok((detected_width, detected_height)) => {
                    debug!(
                        device = %request.device,
                        width = detected_width,
                        height = detected_height,
                        "Detected framebuffer virtual size"
                    );
                    if request.width.is_auto() {
                        width = Some(detected_width);
                    }
                    if request.height.is_auto() {
                        height = Some(detected_height);
                    }
                }
                Err(e) => warn!(device = %request.device, "Could not detect virtual size: {}", e),
            }
        }

        if request.depth.is_auto() {
            match self.read_bits_per_pixel() {
                Ok(detected) => {
                    debug!(device = %request.device, depth = detected, "Detected bits per pixel");
                    depth = Some(detected);
                }
                Err(e) => warn!(device = %request.device, "Could not detect bits per pixel: {}", e),
            }
        }

        ResolvedGeometry { device: request.device.clone(), width, height, depth }
    }

    fn read_virtual_size(&self) -> Result<(u32, u32)> {
        let content = self.descriptors.read(VIRTUAL_SIZE)?;
        parse_virtual_size(&content).map_err(|details| {
            StreamError::descriptor_parse_error(PathBuf::from(VIRTUAL_SIZE), details)
        })
    }

    fn read_bits_per_pixel(&self) -> Result<u32> {
        let content = self.descriptors.read(BITS_PER_PIXEL)?;
        parse_bits_per_pixel(&content).map_err(|details| {
            StreamError::descriptor_parse_error(PathBuf::from(BITS_PER_PIXEL), details)
        })
    }
}

/// Parse `WIDTH,HEIGHT`
fn parse_virtual_size(content: &str) -> std::result::Result<(u32, u32), String> {
    let mut parts = content.trim().split(',');
    let (Some(width), Some(height), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(format!("expected WIDTH,HEIGHT, got {:?}", content.trim()));
    };

    let width = width.trim().parse::<u32>().map_err(|e| format!("width {:?}: {}", width, e))?;
    let height = height.trim().parse::<u32>().map_err(|e| format!("height {:?}: {}", height, e))?;
    Ok((width, height))
}

/// Parse the leading two characters as the bit depth
fn parse_bits_per_pixel(content: &str) -> std::result::Result<u32, String> {
    let leading: String = content.chars().take(2).collect();
    leading.trim().parse::<u32>().map_err(|e| format!("bits per pixel {:?}: {}", leading, e))
}

/// Bare device name (`fb0`) from either a name or a `/dev/...` path
pub fn device_name(device: &str) -> &str {
    Path::new(device).file_name().and_then(|name| name.to_str()).unwrap_or(device)
}
