//! Process lifecycle: termination signals and readiness notification
//!
//! A single [`CancellationToken`] represents "the process is shutting down".
//! The HTTP server stops its listener when it fires and every frame stream
//! ends within one tick.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{Result, StreamError};

/// Owner of the process-wide shutdown token
#[derive(Debug, Clone, Default)]
pub struct Lifecycle {
    cancel: CancellationToken,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token observed by the server and every stream session
    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Begin an orderly shutdown
    pub fn shutdown(&self) {
        if !self.cancel.is_cancelled() {
            info!("Shutting down");
        }
        self.cancel.cancel();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Spawn a task that starts the shutdown on SIGINT or SIGTERM
    ///
    /// The task exits without cancelling if the shutdown starts elsewhere.
    pub fn watch_signals(&self) -> JoinHandle<()> {
        let lifecycle = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = lifecycle.cancel.cancelled() => {
                    debug!("Signal watcher stopped");
                }
                signal = shutdown_signal() => match signal {
                    Ok(name) => {
                        info!(signal = name, "Caught termination signal");
                        lifecycle.shutdown();
                    }
                    Err(e) => {
                        error!("Cannot listen for termination signals: {}", e);
                    }
                },
            }
        })
    }
}

/// Wait for SIGINT or SIGTERM and return its name
pub async fn shutdown_signal() -> std::io::Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result.map(|_| "SIGINT"),
            _ = terminate.recv() => Ok("SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.map(|_| "SIGINT")
    }
}

/// Tells a process supervisor that the server is ready
pub trait ReadinessNotifier: Send + Sync {
    fn notify_ready(&self) -> Result<()>;
}

/// systemd `sd_notify` readiness (`READY=1`)
///
/// Without `NOTIFY_SOCKET` in the environment this is a no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemdNotifier;

impl ReadinessNotifier for SystemdNotifier {
    fn notify_ready(&self) -> Result<()> {
        sd_notify::notify(false, &[sd_notify::NotifyState::Ready])
            .map_err(|e| StreamError::server_error("readiness notification failed", e))
    }
}

/// Notifier that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl ReadinessNotifier for NoopNotifier {
    fn notify_ready(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn shutdown_cancels_every_token_clone() {
        let lifecycle = Lifecycle::new();
        let token = lifecycle.token();
        assert!(!lifecycle.is_shutting_down());

        lifecycle.shutdown();

        assert!(token.is_cancelled());
        assert!(lifecycle.is_shutting_down());
        // Idempotent
        lifecycle.shutdown();
    }

    #[tokio::test]
    async fn signal_watcher_exits_when_shutdown_starts_elsewhere() {
        let lifecycle = Lifecycle::new();
        let watcher = lifecycle.watch_signals();

        lifecycle.shutdown();

        tokio::time::timeout(Duration::from_secs(1), watcher)
            .await
            .expect("watcher did not exit")
            .unwrap();
    }

    #[test]
    fn noop_notifier_always_succeeds() {
        assert!(NoopNotifier.notify_ready().is_ok());
    }
}
