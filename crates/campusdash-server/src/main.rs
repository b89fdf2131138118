mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Utc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use campusdash_api::routes::router;
use campusdash_api::state::{AppState, AppStateInner};
use campusdash_api::tokens::TokenService;
use campusdash_db::{Database, format_timestamp};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "campusdash=debug,campusdash_api=debug,campusdash_db=info,tower_http=debug".into()
            }),
        )
        .init();

    let config = Config::from_env()?;

    let db = Database::open(&config.db_path)?;
    if config.seed_demo {
        db.seed_demo()?;
    }
    let purged = db.purge_expired_otps(&format_timestamp(Utc::now()))?;
    if purged > 0 {
        info!("Purged {} expired OTP codes", purged);
    }

    if config.options.service_mode {
        warn!("Service mode is on: anonymous callers may act as any named user");
    }
    if config.options.otp_preview {
        warn!("OTP preview is on: codes are returned in API responses");
    }

    let state: AppState = Arc::new(AppStateInner {
        db,
        tokens: TokenService::new(&config.tokens),
        options: config.options,
    });

    let app = router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("CampusDash API listening on {}", addr);

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
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
