use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::http::{HeaderValue, Method, header};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use mystic_api::auth::{AppState, AppStateInner};
use mystic_api::routes;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mystic=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let access_secret = std::env::var("MYSTIC_ACCESS_TOKEN_SECRET")
        .unwrap_or_else(|_| "dev-access-secret-change-me".into());
    let refresh_secret = std::env::var("MYSTIC_REFRESH_TOKEN_SECRET")
        .unwrap_or_else(|_| "dev-refresh-secret-change-me".into());
    let db_path = std::env::var("MYSTIC_DB_PATH").unwrap_or_else(|_| "mystic.db".into());
    let host = std::env::var("MYSTIC_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("MYSTIC_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let cors_origin =
        std::env::var("MYSTIC_CORS_ORIGIN").unwrap_or_else(|_| "http://localhost:5173".into());

    // Init database
    let db = mystic_db::Database::open(&PathBuf::from(&db_path))?;

    // Shared state
    let state: AppState = Arc::new(AppStateInner {
        db,
        access_secret,
        refresh_secret,
    });

    // Cookie auth needs credentialed CORS, so no wildcard origin here
    let cors = CorsLayer::new()
        .allow_origin(cors_origin.parse::<HeaderValue>()?)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);

    let app = routes::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Mystic Feedback server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
