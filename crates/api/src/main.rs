use anyhow::Context;
use tokio_util::sync::CancellationToken;

use userserver_api::{AppState, Config, build_app, middleware};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("invalid configuration")?;
    userserver_observability::init(&config.log);
    middleware::install_panic_hook();
    for var in config.dev_secrets() {
        tracing::warn!("{var} not set; using insecure dev default");
    }

    let shutdown = CancellationToken::new();
    let app = build_app(AppState::from_config(&config, shutdown.clone()));

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown requested");
        }
        signal.cancel();
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .context("server error")?;

    Ok(())
}
