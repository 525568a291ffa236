//! HTTP server exposing the framebuffer stream
//!
//! One route, `GET /stream`, answers with `multipart/x-mixed-replace` and a
//! body that never ends on its own. Each connection owns an independent
//! [`FrameStream`]; connections share only the read-only frame source and a
//! semaphore bounding the number of concurrent sessions.
//!
//! ```text
//! accepted -> waiting for a session permit -> streaming -> closed by peer
//!                                                       -> closed by shutdown
//! ```

mod session;

use actix_web::{App, HttpRequest, HttpResponse, HttpServer, http::header, web};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::lifecycle::ReadinessNotifier;
use crate::source::FrameSource;
use crate::stream::{BOUNDARY, FrameStream, TICK_INTERVAL};
use crate::{Result, StreamError};
use session::StreamSession;

/// Path of the streaming endpoint
pub const STREAM_PATH: &str = "/stream";

/// Default listening port
pub const DEFAULT_PORT: u16 = 8808;

/// Seconds in-flight connections get to finish once shutdown starts
const SHUTDOWN_TIMEOUT_SECS: u64 = 1;

/// Top-level response content type
pub fn multipart_content_type() -> String {
    format!("multipart/x-mixed-replace; boundary={}", BOUNDARY)
}

/// Listener and pool settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Interface to bind, `0.0.0.0` for all
    pub host: String,

    /// TCP port, `0` picks a free port
    pub port: u16,

    /// Worker threads started with the server
    pub min_threads: usize,

    /// Upper bound on concurrently streaming connections
    pub max_threads: usize,

    /// Pause before each frame
    pub tick_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            min_threads: 1,
            max_threads: 4,
            tick_interval: TICK_INTERVAL,
        }
    }
}

impl From<&Config> for ServerConfig {
    fn from(config: &Config) -> Self {
        Self {
            port: config.port,
            min_threads: config.min_threads,
            max_threads: config.max_threads,
            ..Self::default()
        }
    }
}

/// State shared by every request handler
struct AppState {
    source: Arc<dyn FrameSource>,
    sessions: Arc<Semaphore>,
    cancel: CancellationToken,
    tick_interval: Duration,
}

/// Entry point for binding the streaming server
pub struct StreamServer;

impl StreamServer {
    /// Register routes, bind the listener and signal readiness
    ///
    /// The returned [`RunningServer`] must be awaited with
    /// [`RunningServer::run`]. It stops when `cancel` fires.
    pub fn bind(
        config: &ServerConfig,
        source: Arc<dyn FrameSource>,
        cancel: CancellationToken,
        notifier: &dyn ReadinessNotifier,
    ) -> Result<RunningServer> {
        if config.min_threads == 0 || config.max_threads == 0 {
            return Err(StreamError::config_error("thread counts must be positive"));
        }

        let state = web::Data::new(AppState {
            source,
            sessions: Arc::new(Semaphore::new(config.max_threads)),
            cancel: cancel.clone(),
            tick_interval: config.tick_interval,
        });

        let server = HttpServer::new(move || {
            App::new().app_data(state.clone()).route(STREAM_PATH, web::get().to(stream_handler))
        })
        .workers(config.min_threads)
        .shutdown_timeout(SHUTDOWN_TIMEOUT_SECS)
        .disable_signals()
        .bind((config.host.as_str(), config.port))
        .map_err(|e| {
            StreamError::server_error(format!("cannot bind {}:{}", config.host, config.port), e)
        })?;

        let addrs = server.addrs();
        info!(
            addrs = ?addrs,
            workers = config.min_threads,
            max_sessions = config.max_threads,
            "Routes registered, listener bound"
        );

        if let Err(e) = notifier.notify_ready() {
            warn!("Could not signal readiness: {}", e);
        } else {
            debug!("Readiness signalled");
        }

        Ok(RunningServer { server: server.run(), addrs, cancel })
    }
}

/// A bound server that accepts connections until shutdown
pub struct RunningServer {
    server: actix_web::dev::Server,
    addrs: Vec<SocketAddr>,
    cancel: CancellationToken,
}

impl RunningServer {
    /// Addresses the listener is bound to
    pub fn local_addrs(&self) -> &[SocketAddr] {
        &self.addrs
    }

    /// Serve until the cancellation token fires
    pub async fn run(self) -> Result<()> {
        let handle = self.server.handle();
        let cancel = self.cancel.clone();
        actix_web::rt::spawn(async move {
            cancel.cancelled().await;
            info!("Stopping listener");
            handle.stop(true).await;
        });

        self.server.await.map_err(|e| StreamError::server_error("server failed", e))?;
        info!("Server stopped");
        Ok(())
    }
}

/// `GET /stream`
async fn stream_handler(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    let peer = req.peer_addr();

    let permit = tokio::select! {
        permit = Arc::clone(&state.sessions).acquire_owned() => match permit {
            Ok(permit) => permit,
            Err(_) => return HttpResponse::ServiceUnavailable().finish(),
        },
        _ = state.cancel.cancelled() => {
            debug!(?peer, "Shutdown while waiting for a stream session");
            return HttpResponse::ServiceUnavailable().finish();
        }
    };

    info!(?peer, free_sessions = state.sessions.available_permits(), "Stream session started");

    let frames =
        FrameStream::new(Arc::clone(&state.source), state.tick_interval, state.cancel.clone());

    HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, multipart_content_type()))
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .streaming(StreamSession::new(frames, permit, peer))
}
