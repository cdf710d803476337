use clap::Parser;
use std::sync::Arc;
use tokio::sync::Notify;

use audiotree::cli::Cli;
use audiotree::config::{AppState, Config};
use audiotree::{logger, server};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut cfg = Config::load_from(&cli.config)?;
    cli.apply(&mut cfg);

    let state = AppState::from_config(cfg, cli.roots)?;
    if state.roots.is_empty() {
        return Err("no roots configured: pass NAME=PATH or add a [roots] section".into());
    }

    // Build the Tokio runtime, sized from `server.workers` when set
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = state.config.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(state))
}

async fn async_main(state: AppState) -> Result<(), Box<dyn std::error::Error>> {
    logger::init(&state.config)?;

    let addr = state.config.get_socket_addr()?;
    let listener = server::create_listener(addr)?;
    let state = Arc::new(state);

    logger::log_server_start(&addr, &state);

    let shutdown = Arc::new(Notify::new());
    server::start_signal_handler(Arc::clone(&shutdown));
    server::start_server_loop(listener, state, shutdown).await;
    Ok(())
}
