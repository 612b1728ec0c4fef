// Server module entry
// Listener setup, the accept loop and graceful shutdown

pub mod connection;
pub mod listener;
pub mod signal;

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::Notify;

use crate::config::AppState;
use crate::logger;
use connection::ConnectionTracker;

pub use listener::create_reusable_listener;

/// Accept connections until `shutdown` fires, then wait for open
/// connections to finish, bounded by the request timeout.
pub async fn run(listener: TcpListener, state: Arc<AppState>, shutdown: Arc<Notify>) {
    let tracker = ConnectionTracker::default();

    loop {
        tokio::select! {
            accept_result = listener.accept() => match accept_result {
                Ok((stream, peer_addr)) => {
                    connection::accept_connection(stream, peer_addr, &state, &tracker);
                }
                Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
            },
            () = shutdown.notified() => break,
        }
    }

    drop(listener);
    let grace = Duration::from_secs(state.config.performance.request_timeout);
    let open = tracker.active();
    if open > 0 {
        logger::log_info(&format!(
            "Waiting up to {}s for {open} open connection(s)",
            grace.as_secs()
        ));
    }
    if tokio::time::timeout(grace, tracker.wait_idle()).await.is_err() {
        logger::log_warning(&format!(
            "{} connection(s) still open after {}s, exiting",
            tracker.active(),
            grace.as_secs()
        ));
    }
    logger::log_info("Server stopped");
}
