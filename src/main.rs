use anyhow::{Context, Result};
use tokio::{
    net::TcpListener,
    signal::unix::{SignalKind, signal},
};

use codecritic::{
    app::build_state,
    cli::config_path_from_args,
    config::Config,
    http::{build_router, serve},
    logging::init_tracing,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = config_path_from_args()?;
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    let logging_guard = init_tracing(&config.logging).context("failed to initialize logging")?;

    let state = build_state(&config).await?;
    let router = build_router(state, &config.server);
    let listener = TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind))?;

    tracing::info!(
        target: "http",
        instance_id = logging_guard.instance_id(),
        log_dir = %logging_guard.log_dir().display(),
        bind = %config.server.bind,
        "codecritic_started"
    );

    let mut sigint =
        signal(SignalKind::interrupt()).context("unable to listen for SIGINT (Ctrl+C)")?;
    let mut sigterm = signal(SignalKind::terminate()).context("unable to listen for SIGTERM")?;
    let shutdown = async move {
        let signal_name = tokio::select! {
            _ = sigint.recv() => "SIGINT",
            _ = sigterm.recv() => "SIGTERM",
        };
        tracing::info!(target: "http", signal = signal_name, "shutdown_requested");
    };

    serve(listener, router, shutdown).await?;
    tracing::info!(target: "http", "codecritic_stopped");
    drop(logging_guard);
    Ok(())
}
