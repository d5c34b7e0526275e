// Server loop module
// Accepts connections until shutdown, then waits for active ones to drain

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use super::connection::{accept_connection, Role};
use super::signal::Shutdown;
use crate::config::AppState;

/// How often the drain phase re-checks the active connection count
const DRAIN_POLL: Duration = Duration::from_millis(50);

/// Per-listener loop settings
pub struct ServerLoopConfig {
    pub role: Role,
    pub check_connection_limits: bool,
    pub shutdown: Shutdown,
    /// Upper bound on the drain phase after shutdown
    pub drain_timeout: Duration,
}

/// Accept loop shared by the content and management listeners
pub async fn start_server_loop(
    listener: TcpListener,
    state: Arc<AppState>,
    active_connections: Arc<AtomicUsize>,
    config: ServerLoopConfig,
) -> std::io::Result<()> {
    let local_addr = listener.local_addr()?;
    tracing::debug!(addr = %local_addr, role = config.role.as_str(), "accept loop started");

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => accept_connection(
                        stream,
                        peer_addr,
                        &state,
                        &active_connections,
                        config.check_connection_limits,
                        config.role,
                        &config.shutdown,
                    ),
                    Err(e) => {
                        tracing::error!(addr = %local_addr, error = %e, "failed to accept connection");
                    }
                }
            }
            () = config.shutdown.wait() => break,
        }
    }

    drop(listener);
    drain(&active_connections, config.drain_timeout, config.role).await;
    Ok(())
}

/// Wait until no connection is active or `limit` elapses
async fn drain(active_connections: &AtomicUsize, limit: Duration, role: Role) {
    let deadline = tokio::time::Instant::now() + limit;
    loop {
        let active = active_connections.load(Ordering::SeqCst);
        if active == 0 {
            tracing::debug!(role = role.as_str(), "all connections drained");
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            tracing::warn!(role = role.as_str(), active, "drain timeout, abandoning connections");
            return;
        }
        tokio::time::sleep(DRAIN_POLL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_drain_returns_when_idle() {
        let counter = AtomicUsize::new(0);
        tokio::time::timeout(
            Duration::from_secs(1),
            drain(&counter, Duration::from_secs(10), Role::Content),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_drain_gives_up_at_deadline() {
        let counter = AtomicUsize::new(3);
        drain(&counter, Duration::from_millis(200), Role::Management).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }
}
