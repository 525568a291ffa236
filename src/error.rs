//! Error types for framebuffer streaming.
//!
//! All fallible operations in the crate return [`StreamError`]. Errors carry
//! structured context (paths, sizes, geometry fields) so startup failures can
//! be reported with a precise message and a short list of recovery hints.
//!
//! ## Error Categories
//!
//! - **Configuration Errors**: invalid values from the config file or command line
//! - **Descriptor Errors**: unreadable or malformed sysfs geometry descriptors
//! - **Geometry Errors**: unresolved or unsupported framebuffer geometry
//! - **Device Errors**: the framebuffer device cannot be opened or mapped
//! - **Encode Errors**: a frame could not be turned into a PNG
//! - **Server Errors**: the HTTP listener could not be bound or failed
//!
//! ## Fatal vs. local errors
//!
//! Startup errors are fatal: the process refuses to serve. Descriptor errors
//! are only warnings (the geometry field stays unresolved), and encode errors
//! end a single client connection.
//!
//! ```rust
//! use fbstream::StreamError;
//!
//! let error = StreamError::missing_geometry("width");
//! assert!(error.is_fatal());
//! for suggestion in error.recovery_suggestions() {
//!     println!("  - {}", suggestion);
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for streaming operations.
pub type Result<T, E = StreamError> = std::result::Result<T, E>;

/// Main error type for framebuffer streaming.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StreamError {
    #[error("Invalid configuration: {reason}")]
    Config {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Cannot read device descriptor {path}")]
    Descriptor {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed device descriptor {path}: {details}")]
    DescriptorParse { path: PathBuf, details: String },

    #[error("Framebuffer {field} is unresolved; set it explicitly or check the device descriptors")]
    MissingGeometry { field: &'static str },

    #[error("Invalid framebuffer geometry: {reason}")]
    InvalidGeometry { reason: String },

    #[error("Cannot map framebuffer device {path}")]
    Device {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Framebuffer device {path} holds {actual} bytes but the geometry needs {expected}")]
    DeviceSize { path: PathBuf, expected: u64, actual: u64 },

    #[error("Frame encoding failed: {details}")]
    Encode {
        details: String,
        #[source]
        source: Option<image::ImageError>,
    },

    #[error("HTTP server error: {context}")]
    Server {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl StreamError {
    /// Returns whether this error must stop the process.
    ///
    /// Descriptor problems only leave a geometry field unresolved, and encode
    /// failures are scoped to one client connection.
    pub fn is_fatal(&self) -> bool {
        match self {
            StreamError::Config { .. } => true,
            StreamError::Descriptor { .. } => false,
            StreamError::DescriptorParse { .. } => false,
            StreamError::MissingGeometry { .. } => true,
            StreamError::InvalidGeometry { .. } => true,
            StreamError::Device { .. } => true,
            StreamError::DeviceSize { .. } => true,
            StreamError::Encode { .. } => false,
            StreamError::Server { .. } => true,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            StreamError::Config { .. } => vec![
                "Check the command line arguments (see --help)",
                "Check the general and stream sections of the config file",
                "Thread counts must be positive and minthreads <= maxthreads",
            ],
            StreamError::Descriptor { .. } => vec![
                "Check the framebuffer device name",
                "Verify /sys/class/graphics is mounted and readable",
                "Pass --width, --height and --depth explicitly",
            ],
            StreamError::DescriptorParse { .. } => vec![
                "Verify the framebuffer driver reports virtual_size as WIDTH,HEIGHT",
                "Pass --width, --height and --depth explicitly",
            ],
            StreamError::MissingGeometry { .. } => vec![
                "Pass --width, --height and --depth explicitly",
                "Check that the framebuffer driver is loaded",
            ],
            StreamError::InvalidGeometry { .. } => vec![
                "Width and height must be positive",
                "Only 16 bits per pixel framebuffers are supported",
            ],
            StreamError::Device { .. } => vec![
                "Check the device exists under /dev",
                "Check read permissions (video group membership)",
                "Verify the configured geometry fits the device memory",
            ],
            StreamError::DeviceSize { .. } => vec![
                "Verify width, height and depth match the device",
                "Let the geometry be detected with 'auto'",
            ],
            StreamError::Encode { .. } => vec![
                "Verify the frame buffer length matches the geometry",
                "Reconnect the client to start a fresh stream",
            ],
            StreamError::Server { .. } => vec![
                "Check the port is not already in use",
                "Ports below 1024 need elevated privileges",
            ],
        }
    }

    /// Helper constructor for configuration errors.
    pub fn config_error(reason: impl Into<String>) -> Self {
        StreamError::Config { reason: reason.into(), source: None }
    }

    /// Helper constructor for configuration errors with source.
    pub fn config_error_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        StreamError::Config { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for unreadable descriptors.
    pub fn descriptor_error(path: PathBuf, source: std::io::Error) -> Self {
        StreamError::Descriptor { path, source }
    }

    /// Helper constructor for malformed descriptor content.
    pub fn descriptor_parse_error(path: PathBuf, details: impl Into<String>) -> Self {
        StreamError::DescriptorParse { path, details: details.into() }
    }

    /// Helper constructor for unresolved geometry fields.
    pub fn missing_geometry(field: &'static str) -> Self {
        StreamError::MissingGeometry { field }
    }

    /// Helper constructor for invalid geometry.
    pub fn invalid_geometry(reason: impl Into<String>) -> Self {
        StreamError::InvalidGeometry { reason: reason.into() }
    }

    /// Helper constructor for device open/map failures.
    pub fn device_error(path: PathBuf, source: std::io::Error) -> Self {
        StreamError::Device { path, source }
    }

    /// Helper constructor for encode failures without an underlying codec error.
    pub fn encode_error(details: impl Into<String>) -> Self {
        StreamError::Encode { details: details.into(), source: None }
    }

    /// Helper constructor for codec failures.
    pub fn encode_failed(source: image::ImageError) -> Self {
        StreamError::Encode { details: source.to_string(), source: Some(source) }
    }

    /// Helper constructor for server errors.
    pub fn server_error(context: impl Into<String>, source: std::io::Error) -> Self {
        StreamError::Server { context: context.into(), source }
    }
}
