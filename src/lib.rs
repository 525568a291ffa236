//! Stream a Linux framebuffer device to HTTP clients.
//!
//! fbstream maps a framebuffer read-only, encodes its content as 16-bit
//! grayscale PNG ten times a second and serves the frames to any number of
//! viewers as a `multipart/x-mixed-replace` response on `GET /stream`. A
//! browser `<img src="http://host:8808/stream">` shows the live screen.
//!
//! # Pipeline
//!
//! ```text
//! Config -> GeometryResolver -> Geometry -> MappedFramebuffer (opened once)
//!        -> per connection: FrameStream (tick, snapshot, PNG, record)
//!        -> StreamServer
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use fbstream::{
//!     Geometry, GeometryRequest, GeometryResolver, Lifecycle, MappedFramebuffer, ServerConfig,
//!     StreamServer, SystemdNotifier,
//! };
//! use std::sync::Arc;
//!
//! #[actix_web::main]
//! async fn main() -> fbstream::Result<()> {
//!     let request = GeometryRequest {
//!         device: "fb1".to_string(),
//!         width: Default::default(),
//!         height: Default::default(),
//!         depth: Default::default(),
//!     };
//!     let geometry = Geometry::try_from(GeometryResolver::sysfs("fb1").resolve(&request))?;
//!     let source = Arc::new(MappedFramebuffer::open(geometry)?);
//!
//!     let lifecycle = Lifecycle::new();
//!     lifecycle.watch_signals();
//!
//!     let server = StreamServer::bind(
//!         &ServerConfig::default(),
//!         source,
//!         lifecycle.token(),
//!         &SystemdNotifier,
//!     )?;
//!     server.run().await
//! }
//! ```

// Core types and error handling
mod error;
pub mod geometry;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;

// Capture, encode and stream
pub mod encoder;
pub mod source;
pub mod stream;

// Serving and process glue
pub mod config;
pub mod lifecycle;
pub mod server;

// Core exports
pub use error::*;
pub use geometry::{Dimension, Geometry, GeometryRequest, GeometryResolver, ResolvedGeometry};

// Pipeline exports
pub use encoder::encode_png;
pub use source::{FrameSource, MappedFramebuffer};
pub use stream::{FrameStream, TICK_INTERVAL};

// Process exports
pub use config::{CliArgs, Config};
pub use lifecycle::{Lifecycle, NoopNotifier, ReadinessNotifier, SystemdNotifier};
pub use server::{RunningServer, ServerConfig, StreamServer};
