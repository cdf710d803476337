// Server loop module
// Accepts connections until shutdown, then drains the active ones

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{watch, Notify};
use tokio::time::Instant;

use super::connection::accept_connection;
use crate::config::AppState;
use crate::logger;

/// Longest wait for in-flight connections after shutdown
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);
const DRAIN_POLL: Duration = Duration::from_millis(50);

/// Run the accept loop on `listener` until `shutdown` is notified
///
/// Once notified, the listener is closed, every open connection is asked to
/// finish its current response and close, and the loop waits for them (at
/// most [`DRAIN_TIMEOUT`]).
pub async fn start_server_loop(listener: TcpListener, state: Arc<AppState>, shutdown: Arc<Notify>) {
    let active_connections = Arc::new(AtomicUsize::new(0));
    let (drain_tx, drain_rx) = watch::channel(false);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(
                            stream,
                            peer_addr,
                            &state,
                            &active_connections,
                            drain_rx.clone(),
                        );
                    }
                    Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                }
            }
            () = shutdown.notified() => break,
        }
    }

    drop(listener);
    logger::log_shutdown(active_connections.load(Ordering::SeqCst));
    let _ = drain_tx.send(true);

    let deadline = Instant::now() + DRAIN_TIMEOUT;
    while active_connections.load(Ordering::SeqCst) > 0 && Instant::now() < deadline {
        tokio::time::sleep(DRAIN_POLL).await;
    }
}
