use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use dish::config::{AppState, Config, DEFAULT_CONFIG_PATH};
use dish::logger;
use dish::server::{self, Role, ServerLoopConfig, Shutdown};

/// Upper bound on waiting for open connections after a shutdown signal
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Serve one static payload with conditional GET and gzip/deflate negotiation
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (TOML); missing file means defaults
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Serve this file, overriding `dish.source`
    #[arg(long)]
    file: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut cfg = Config::load_from(&args.config)?;
    if let Some(path) = args.file {
        cfg.dish.source = path;
        cfg.dish.options.file = true;
    }

    logger::init(&cfg.logging)?;

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    let app_addr = cfg.get_socket_addr()?;
    let api_addr = cfg.get_api_socket_addr()?;

    let state = Arc::new(AppState::new(&cfg)?);
    let app_listener = server::create_reusable_listener(app_addr)?;
    let api_listener = server::create_reusable_listener(api_addr)?;

    let shutdown = Shutdown::new();
    server::start_signal_handler(shutdown.clone())?;
    let sweeper = server::spawn_sweeper(
        Arc::clone(&state.store),
        Duration::from_secs(cfg.cache.sweep_interval_secs),
        shutdown.clone(),
    );

    logger::log_server_start(&app_addr, &api_addr, &cfg);

    let api_task = tokio::spawn(server::start_server_loop(
        api_listener,
        Arc::clone(&state),
        Arc::new(AtomicUsize::new(0)),
        ServerLoopConfig {
            role: Role::Management,
            check_connection_limits: false,
            shutdown: shutdown.clone(),
            drain_timeout: DRAIN_TIMEOUT,
        },
    ));

    let app_result = server::start_server_loop(
        app_listener,
        state,
        Arc::new(AtomicUsize::new(0)),
        ServerLoopConfig {
            role: Role::Content,
            check_connection_limits: true,
            shutdown: shutdown.clone(),
            drain_timeout: DRAIN_TIMEOUT,
        },
    )
    .await;

    // The content loop only returns on shutdown or a listener failure
    shutdown.trigger("content server stopped");
    match api_task.await {
        Ok(Err(e)) => tracing::error!(error = %e, "management server failed"),
        Err(e) => tracing::error!(error = %e, "management server task panicked"),
        Ok(Ok(())) => {}
    }
    if let Some(sweeper) = sweeper {
        let _ = sweeper.await;
    }

    app_result?;
    tracing::info!("shutdown complete");
    Ok(())
}
