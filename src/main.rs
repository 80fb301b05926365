//! Reaction result service entrypoint wiring REST, SSE and the blob store.

use std::{env, net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::{Context, bail};
use axum::Router;
use reflex_board::{
    config::AppConfig,
    dao::{blob::BlobStore, fs::FsBlobStore, memory::MemoryBlobStore},
    routes,
    services::storage_supervisor,
    state::{AppState, SharedState},
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_STORE_DIR: &str = "data";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let (blobs, backend) = open_blob_store()?;
    info!(backend, key_prefix = %config.key_prefix, "result storage configured");

    let app_state = AppState::new(config, blobs, backend);

    tokio::spawn(storage_supervisor::run(app_state.clone()));
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Select the blob store from `STORE_BACKEND` (`memory`, `fs` or `http`).
fn open_blob_store() -> anyhow::Result<(Arc<dyn BlobStore>, &'static str)> {
    let backend = env::var("STORE_BACKEND").unwrap_or_else(|_| "fs".into());
    let selected: (Arc<dyn BlobStore>, &'static str) =
        match backend.trim().to_ascii_lowercase().as_str() {
            "memory" => (Arc::new(MemoryBlobStore::new()), "memory"),
            "fs" => {
                let dir = env::var_os("STORE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_DIR));
                info!(dir = %dir.display(), "using filesystem result storage");
                (Arc::new(FsBlobStore::new(dir)), "fs")
            }
            #[cfg(feature = "http")]
            "http" => {
                use reflex_board::dao::http::{HttpBlobStore, HttpStoreConfig};

                let config =
                    HttpStoreConfig::from_env().context("reading object storage settings")?;
                let store =
                    HttpBlobStore::connect(config).context("building object storage client")?;
                (Arc::new(store), "http")
            }
            other => bail!("unsupported STORE_BACKEND `{other}`"),
        };
    Ok(selected)
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
