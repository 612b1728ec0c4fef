use std::sync::Arc;

use clap::Parser;
use tokio::sync::Notify;

mod config;
mod error;
mod handler;
mod http;
mod logger;
mod rebuild;
mod server;

/// Static site server with a signed rebuild webhook
#[derive(Debug, Parser)]
#[command(name = "pisocnet", version, about)]
struct Cli {
    /// Configuration file, with or without extension
    #[arg(short, long, env = "PISOCNET_CONFIG", default_value = config::DEFAULT_CONFIG_PATH)]
    config: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let cfg = config::Config::load_from(&cli.config)?;
    logger::init(&cfg.logging)?;

    // Worker threads follow server.workers, CPU count otherwise
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let listener = server::create_reusable_listener(addr, cfg.server.backlog)?;
    logger::log_server_start(&addr, &cfg);

    let state = Arc::new(config::AppState::new(cfg)?);
    let shutdown = Arc::new(Notify::new());
    server::signal::start_signal_handler(Arc::clone(&shutdown));

    server::run(listener, state, shutdown).await;
    Ok(())
}
