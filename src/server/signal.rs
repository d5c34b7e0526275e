// Signal handling module
//
// SIGTERM and SIGINT (Ctrl+C) trigger a graceful shutdown: listeners stop
// accepting and in-flight connections are given time to finish.

use std::sync::Arc;

use tokio::sync::watch;

/// Broadcast handle for the shutdown request
///
/// Backed by a `watch` channel so loops that subscribe late, or are busy when
/// the signal fires, still observe it.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Ask every subscriber to stop
    pub fn trigger(&self, reason: &str) {
        if !*self.tx.borrow() {
            crate::logger::log_shutdown(reason);
        }
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once `trigger` has been called (immediately if it already was)
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // Err means the sender is gone, which only happens when nothing can trigger any more
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Listen for termination signals in a background task
///
/// Registration happens before spawning so a failure is reported to the caller.
#[cfg(unix)]
pub fn start_signal_handler(shutdown: Shutdown) -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tracing::debug!(pid = std::process::id(), "signal handlers registered");

    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => shutdown.trigger("SIGTERM"),
            _ = sigint.recv() => shutdown.trigger("SIGINT"),
        }
    });
    Ok(())
}

/// Non-Unix fallback: Ctrl+C only
#[cfg(not(unix))]
pub fn start_signal_handler(shutdown: Shutdown) -> std::io::Result<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.trigger("Ctrl+C");
        }
    });
    Ok(())
}
