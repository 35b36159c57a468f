use std::net::SocketAddr;

use anyhow::{Context, Result};
use bookdrop::{
    config::Config,
    proxy::{self, ProxyState},
};
use tracing::{error, info};

pub async fn start(config: &Config, listen: Option<&str>) -> Result<()> {
    let listen = listen.unwrap_or(&config.listen);
    let addr: SocketAddr = listen
        .parse()
        .with_context(|| format!("Invalid listen address {listen}"))?;

    let app = proxy::router(ProxyState::from_config(config));

    info!("Listening on {addr}.");
    axum::Server::try_bind(&addr)
        .with_context(|| format!("Couldn't bind {addr}"))?
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Proxy server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Couldn't listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutting down.");
}
