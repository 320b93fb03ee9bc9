use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use turnstile_store::Store;

mod config;
mod error;
mod resolver;
mod routes;
mod service;

use config::Config;
use service::{App, LogNotifier};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("turnstiled starting");

    let config = Config::from_env();
    if let Some(dir) = config.db_path.parent() {
        std::fs::create_dir_all(dir)?;
    }

    let store = Store::open(&config.db_path).await?;
    let bind_addr = config.bind_addr.clone();
    let app = Arc::new(App::new(store, &config, Arc::new(LogNotifier)));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "turnstiled ready");

    axum::serve(listener, routes::router(app))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("turnstiled shutting down");
        })
        .await?;

    Ok(())
}
