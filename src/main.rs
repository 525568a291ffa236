use anyhow::Context;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use fbstream::server::STREAM_PATH;
use fbstream::{
    Config, Geometry, GeometryResolver, Lifecycle, MappedFramebuffer, ServerConfig, StreamError,
    StreamServer, SystemdNotifier,
};

#[actix_web::main]
async fn main() -> ExitCode {
    let config = Config::load();
    init_tracing(config.as_ref().map_or(LevelFilter::INFO, |config| config.log_level));

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` overrides the configured level
fn init_tracing(level: LevelFilter) {
    let filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();
}

async fn run(config: fbstream::Result<Config>) -> anyhow::Result<()> {
    let config = config.context("Cannot load configuration")?;
    config.log_summary();

    let resolved = GeometryResolver::sysfs(&config.device).resolve(&config.geometry_request());
    let geometry =
        Geometry::try_from(resolved).context("Cannot determine the framebuffer geometry")?;
    info!(
        device = %geometry.device(),
        width = geometry.width(),
        height = geometry.height(),
        depth = geometry.depth(),
        "Framebuffer geometry resolved"
    );

    let source = MappedFramebuffer::open(geometry).context("Cannot open the framebuffer")?;
    info!(path = %source.path().display(), "Framebuffer mapped");

    let lifecycle = Lifecycle::new();
    let _signals = lifecycle.watch_signals();

    let server = StreamServer::bind(
        &ServerConfig::from(&config),
        Arc::new(source),
        lifecycle.token(),
        &SystemdNotifier,
    )
    .context("Cannot start the HTTP server")?;
    info!(addrs = ?server.local_addrs(), path = STREAM_PATH, "Streaming");

    server.run().await.context("HTTP server failed")?;
    if !lifecycle.is_shutting_down() {
        warn!("HTTP server stopped without a shutdown request");
    }
    Ok(())
}

fn report(err: &anyhow::Error) {
    error!("{:#}", err);
    if let Some(cause) = err.downcast_ref::<StreamError>() {
        for suggestion in cause.recovery_suggestions() {
            info!("Suggestion: {}", suggestion);
        }
    }
}
