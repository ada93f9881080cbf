mod config;
mod notifications;
mod scheduler;
mod search;

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use convo_api::AppStateInner;
use convo_core::clients::{NullSearch, TracingMail};
use convo_core::{SearchClient, Services};
use convo_db::Database;

use crate::config::Config;
use crate::notifications::JwtNotifications;
use crate::search::HttpSearchClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "convo_server=debug,convo_api=debug,convo_core=debug,convo_db=debug,tower_http=debug".into()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("FATAL: {:#}. Set it in your .env file and restart.", e);
            std::process::exit(1);
        }
    };

    let db = Arc::new(Database::open(&config.db_path)?);

    let search: Arc<dyn SearchClient> = match &config.search_url {
        Some(url) => {
            info!("Indexing users at {}", url);
            Arc::new(HttpSearchClient::new(url))
        }
        None => Arc::new(NullSearch),
    };

    let services = Services {
        db,
        mail: Arc::new(TracingMail),
        search,
        notifications: Arc::new(JwtNotifications::new(&config.realtime_secret)),
    };

    match config.digest_interval {
        Some(every) => {
            info!("Digest sweep every {} seconds", every.as_secs());
            tokio::spawn(scheduler::run_digest_loop(services.clone(), every));
        }
        None => info!("Digest sweep disabled"),
    }

    let state = Arc::new(AppStateInner {
        services,
        jwt_secret: config.jwt_secret.clone(),
    });

    let app = convo_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Convo server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
