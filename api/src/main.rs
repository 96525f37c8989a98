use axum::http::{header::CONTENT_TYPE, HeaderValue, Method};
use r2d2_sqlite::SqliteConnectionManager;
use tokio::signal::{
    ctrl_c,
    unix::{signal, SignalKind},
};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use cuisine_api::{config::Config, db, router, token::TokenKeys, AppState};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = Config::load();

    let manager = SqliteConnectionManager::file(&config.database_url);
    let pool = r2d2::Pool::new(manager).expect("Failed to create DB pool");
    db::run_migrations(&pool).expect("Failed to run migrations");

    let state = AppState {
        db: pool,
        keys: TokenKeys::new(&config.jwt_secret),
    };

    // Credentials must be allowed for the token cookie, which rules out
    // wildcard origins/methods/headers.
    let cors = CorsLayer::new()
        .allow_origin(
            config
                .cors_origin
                .parse::<HeaderValue>()
                .expect("Invalid CORS_ORIGIN"),
        )
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(true);

    let app = router(state).layer(cors);

    let addr = format!("0.0.0.0:{}", config.port);
    info!("API server listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    info!("Server shutting down");
}

async fn shutdown_signal() {
    let interrupt = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => {},
        _ = terminate => {},
    }
}
