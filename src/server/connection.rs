// Connection handling module
// Accepts a single TCP connection and serves it with hyper's HTTP/1 stack

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;

use super::signal::Shutdown;
use crate::config::AppState;
use crate::{api, handler, logger};

/// Which surface a listener serves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Every path answers with the configured dish
    Content,
    /// Cache inspection and invalidation endpoints
    Management,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::Management => "management",
        }
    }
}

/// Decrements the active connection count when the connection task ends
struct ConnectionGuard(Arc<AtomicUsize>);

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Accept a connection, enforcing `performance.max_connections` when asked to.
pub fn accept_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: &Arc<AppState>,
    conn_counter: &Arc<AtomicUsize>,
    check_limits: bool,
    role: Role,
    shutdown: &Shutdown,
) {
    // Increment first, then check, so concurrent accepts cannot overshoot
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);
    let guard = ConnectionGuard(Arc::clone(conn_counter));

    if check_limits {
        if let Some(max_conn) = state.config.performance.max_connections {
            if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
                tracing::warn!(
                    active = prev_count,
                    max = max_conn,
                    peer = %peer_addr,
                    "max connections reached, connection rejected"
                );
                drop(stream);
                return;
            }
        }
    }

    if state.access_log() {
        logger::log_connection_accepted(&peer_addr);
    }

    handle_connection(stream, peer_addr, Arc::clone(state), guard, role, shutdown.clone());
}

/// Serve one connection in its own task
///
/// The whole connection is bounded by `max(read_timeout, write_timeout)`;
/// on shutdown hyper is asked to finish the current request and close.
fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
    guard: ConnectionGuard,
    role: Role,
    shutdown: Shutdown,
) {
    tokio::spawn(async move {
        let _guard = guard;
        let io = TokioIo::new(stream);

        let performance = &state.config.performance;
        let timeout_duration =
            Duration::from_secs(std::cmp::max(performance.read_timeout, performance.write_timeout));

        let mut builder = http1::Builder::new();
        builder.keep_alive(performance.keep_alive_timeout > 0);

        let service_state = Arc::clone(&state);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| {
                let state = Arc::clone(&service_state);
                async move {
                    match role {
                        Role::Content => handler::handle_request(req, state, peer_addr).await,
                        Role::Management => api::handle_api_request(req, state).await,
                    }
                }
            }),
        );

        let serve = async move {
            tokio::pin!(conn);
            tokio::select! {
                res = conn.as_mut() => res,
                () = shutdown.wait() => {
                    conn.as_mut().graceful_shutdown();
                    conn.as_mut().await
                }
            }
        };

        match tokio::time::timeout(timeout_duration, serve).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => logger::log_connection_error(&err),
            Err(_) => {
                tracing::debug!(
                    peer = %peer_addr,
                    role = role.as_str(),
                    timeout_secs = timeout_duration.as_secs(),
                    "connection timed out"
                );
            }
        }
    });
}
