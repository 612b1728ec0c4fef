// Connection handling module
// Accepts TCP connections, enforces the connection limit and serves HTTP/1.1

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use hyper::body::{Body, Incoming};
use hyper::header::{HeaderName, HeaderValue, REFERER, SERVER, USER_AGENT};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::TokioIo;
use tokio::sync::Notify;

use crate::config::AppState;
use crate::handler;
use crate::http::HttpResponse;
use crate::logger::{self, AccessLogEntry};

/// Counts live connections and signals when the last one closes
#[derive(Clone, Default)]
pub struct ConnectionTracker {
    inner: Arc<TrackerInner>,
}

#[derive(Default)]
struct TrackerInner {
    active: AtomicUsize,
    drained: Notify,
}

/// Held for the lifetime of one connection
pub struct ConnectionGuard {
    tracker: ConnectionTracker,
}

impl ConnectionTracker {
    /// Register a connection unless `limit` is already reached
    pub fn try_acquire(&self, limit: Option<u64>) -> Option<ConnectionGuard> {
        // Increment first, then check, so concurrent accepts cannot both slip in
        let prev = self.inner.active.fetch_add(1, Ordering::SeqCst);
        if let Some(max) = limit {
            if prev >= usize::try_from(max).unwrap_or(usize::MAX) {
                self.inner.active.fetch_sub(1, Ordering::SeqCst);
                return None;
            }
        }
        Some(ConnectionGuard {
            tracker: self.clone(),
        })
    }

    pub fn active(&self) -> usize {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Resolve once no connection is open
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.active() == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if self.tracker.inner.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.tracker.inner.drained.notify_waiters();
        }
    }
}

/// Accept a connection: check the limit, then serve it on its own task.
pub fn accept_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    state: &Arc<AppState>,
    tracker: &ConnectionTracker,
) {
    let Some(guard) = tracker.try_acquire(state.config.performance.max_connections) else {
        logger::log_warning(&format!(
            "Max connections reached ({}), rejected {peer_addr}",
            tracker.active()
        ));
        drop(stream);
        return;
    };

    logger::log_connection_accepted(&peer_addr);
    tokio::spawn(handle_connection(stream, peer_addr, Arc::clone(state), guard));
}

/// Serve one connection until it closes or the request timeout elapses.
async fn handle_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
    _guard: ConnectionGuard,
) {
    let io = TokioIo::new(stream);
    let timeout = Duration::from_secs(state.config.performance.request_timeout);
    let server_header = HeaderValue::from_str(&state.config.http.server_name).ok();

    let mut builder = http1::Builder::new();
    builder.keep_alive(state.config.performance.keep_alive);

    let conn = builder.serve_connection(
        io,
        service_fn(move |req| {
            let state = Arc::clone(&state);
            let server_header = server_header.clone();
            async move { serve_request(req, peer_addr, state, server_header).await }
        }),
    );

    match tokio::time::timeout(timeout, conn).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => logger::log_connection_error(&err),
        Err(_) => logger::log_warning(&format!(
            "Connection from {peer_addr} timed out after {} seconds",
            timeout.as_secs()
        )),
    }
}

/// Dispatch one request, stamp the `Server` header and write the access log
async fn serve_request(
    req: Request<Incoming>,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
    server_header: Option<HeaderValue>,
) -> Result<HttpResponse, Infallible> {
    let started = Instant::now();
    let entry = state
        .config
        .logging
        .access_log
        .then(|| access_entry(&req, peer_addr));

    let mut resp = handler::handle_request(req, Arc::clone(&state)).await?;
    if let Some(value) = server_header {
        resp.headers_mut().insert(SERVER, value);
    }

    if let Some(mut entry) = entry {
        entry.status = resp.status().as_u16();
        entry.body_bytes = resp.body().size_hint().exact().unwrap_or(0);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }
    Ok(resp)
}

fn access_entry<B>(req: &Request<B>, peer_addr: SocketAddr) -> AccessLogEntry {
    let header = |name: HeaderName| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = match req.version() {
        hyper::Version::HTTP_10 => "1.0",
        hyper::Version::HTTP_2 => "2",
        _ => "1.1",
    }
    .to_string();
    entry.referer = header(REFERER);
    entry.user_agent = header(USER_AGENT);
    entry
}
