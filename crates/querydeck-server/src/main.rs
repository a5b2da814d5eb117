mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use querydeck_api::auth::{AppState, AppStateInner};
use querydeck_api::policy::EmailPolicy;
use querydeck_api::session::{self, SessionProvider};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "querydeck=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = querydeck_db::Database::open(&config.db_path)?;

    // Shared state
    let email_policy = EmailPolicy::new(&config.email_domain);
    let sessions = SessionProvider::new(chrono::Duration::hours(config.session_ttl_hours));
    // Expired session sweep (runs every 10 minutes)
    tokio::spawn(session::run_sweep_loop(sessions.clone(), 600));

    let state: AppState = Arc::new(AppStateInner {
        db,
        sessions,
        jwt_secret: config.jwt_secret,
        email_policy: email_policy.clone(),
        page_size: config.page_size,
    });

    let app = querydeck_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!(
        "querydeck listening on {} (page size {}, sign-in restricted to {})",
        addr,
        config.page_size,
        email_policy.suffix()
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
