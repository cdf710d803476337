//! Logger module
//!
//! Provides logging utilities for the server including:
//! - Server lifecycle logging
//! - Access logging with multiple formats
//! - Error, warning and debug logging
//! - File-based logging support

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use crate::config::{AppState, Config};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};

/// Whether `debug` messages are emitted
static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &Config) -> std::io::Result<()> {
    DEBUG_ENABLED.store(
        config.logging.level.eq_ignore_ascii_case("debug"),
        Ordering::Relaxed,
    );
    writer::init(
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
    )
}

/// Write to info/access log
fn write_info(message: &str) {
    match writer::get() {
        Some(w) => w.write_info(message),
        None => println!("{message}"),
    }
}

/// Write to error log
fn write_error(message: &str) {
    match writer::get() {
        Some(w) => w.write_error(message),
        None => eprintln!("{message}"),
    }
}

/// Write to access log specifically
fn write_access(message: &str) {
    match writer::get() {
        Some(w) => w.write_access(message),
        None => println!("{message}"),
    }
}

pub fn log_server_start(addr: &SocketAddr, state: &AppState) {
    let config = &state.config;
    write_info("======================================");
    write_info(&format!("{} started", config.http.server_name));
    write_info(&format!("Listening on: http://{addr}"));
    write_info(&format!("Log level: {}", config.logging.level));
    if let Some(workers) = config.server.workers {
        write_info(&format!("Worker threads: {workers}"));
    }
    for key in state.roots.keys() {
        if let Some(root) = state.roots.get(key) {
            write_info(&format!("Root /{key}/ -> {}", root.base_dir.display()));
        }
    }
    if config.archive.enabled {
        write_info(&format!(
            "Archives: enabled, {} concurrent",
            config.archive.max_concurrent
        ));
    } else {
        write_info("Archives: disabled");
    }
    if let Some(ref path) = config.logging.access_log_file {
        write_info(&format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        write_info(&format!("Error log: {path}"));
    }
    write_info("======================================\n");
}

pub fn log_shutdown_requested(signal: &str) {
    write_info(&format!("\n[Signal] {signal} received, shutting down"));
}

pub fn log_shutdown(active: usize) {
    write_info(&format!(
        "[Shutdown] No longer accepting connections ({active} still active)"
    ));
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    log_debug(&format!("[Connection] Accepted from: {peer_addr}"));
}

pub fn log_connection_error(err: &impl std::fmt::Display) {
    write_error(&format!("[ERROR] Failed to serve connection: {err}"));
}

pub fn log_error(message: &str) {
    write_error(&format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write_error(&format!("[WARN] {message}"));
}

pub fn debug_enabled() -> bool {
    DEBUG_ENABLED.load(Ordering::Relaxed)
}

pub fn log_debug(message: &str) {
    if debug_enabled() {
        write_info(&format!("[DEBUG] {message}"));
    }
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    write_access(&entry.format(format));
}
