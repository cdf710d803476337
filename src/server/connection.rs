// Connection handling module
// Serves one accepted TCP connection on its own task

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::watch;

use crate::config::AppState;
use crate::handler;
use crate::logger;

/// Accept a connection, enforcing `performance.max_connections`.
///
/// # Arguments
///
/// * `stream` - The TCP stream to handle
/// * `peer_addr` - The peer's socket address
/// * `state` - Shared application state
/// * `conn_counter` - Active connection counter
/// * `draining` - Flips to `true` when the server starts shutting down
pub fn accept_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: &Arc<AppState>,
    conn_counter: &Arc<AtomicUsize>,
    draining: watch::Receiver<bool>,
) {
    // Increment counter first, then check limit (prevents race condition)
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = state.config.performance.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            conn_counter.fetch_sub(1, Ordering::SeqCst);
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection from {peer_addr} rejected."
            ));
            drop(stream);
            return;
        }
    }

    logger::log_connection_accepted(&peer_addr);
    tokio::spawn(serve_connection(
        stream,
        peer_addr,
        Arc::clone(state),
        Arc::clone(conn_counter),
        draining,
    ));
}

/// Serve HTTP/1.1 on one connection until the peer closes it, the
/// configured timeout expires, or a shutdown drains it.
async fn serve_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
    conn_counter: Arc<AtomicUsize>,
    mut draining: watch::Receiver<bool>,
) {
    let io = TokioIo::new(stream);
    let timeout_secs = state.config.performance.connection_timeout;

    let mut builder = http1::Builder::new();
    builder.keep_alive(state.config.performance.keep_alive);

    let service_state = Arc::clone(&state);
    let conn = builder.serve_connection(
        io,
        service_fn(move |req| handler::handle_request(req, Arc::clone(&service_state), peer_addr)),
    );

    let serve = async move {
        let mut conn = std::pin::pin!(conn);
        let mut shutting_down = *draining.borrow();
        if shutting_down {
            conn.as_mut().graceful_shutdown();
        }
        loop {
            tokio::select! {
                res = conn.as_mut() => break res,
                _ = draining.changed(), if !shutting_down => {
                    // Finish the in-flight response, then close
                    shutting_down = true;
                    conn.as_mut().graceful_shutdown();
                }
            }
        }
    };

    // 0 disables the timeout
    let outcome = if timeout_secs == 0 {
        Ok(serve.await)
    } else {
        tokio::time::timeout(Duration::from_secs(timeout_secs), serve).await
    };

    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(err)) => logger::log_connection_error(&err),
        Err(_) => logger::log_warning(&format!(
            "Connection from {peer_addr} closed after {timeout_secs}s timeout"
        )),
    }

    conn_counter.fetch_sub(1, Ordering::SeqCst);
}
