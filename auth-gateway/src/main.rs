//! Auth Gateway - Main entry point
//!
//! REST gateway in front of AWS Cognito plus a local PostgreSQL user
//! table. Cookies carry the provider's tokens verbatim.

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use auth_gateway::config::Config;
use auth_gateway::db::{Database, UserRepo};
use auth_gateway::services::identity::CognitoIdentityProvider;
use auth_gateway::{api, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "auth_gateway=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    tracing::info!("Configuration loaded successfully");

    let db = Database::connect(&config).await?;
    db.run_migrations().await?;

    let aws_config = aws_config::load_from_env().await;
    let identity = CognitoIdentityProvider::new(
        aws_sdk_cognitoidentityprovider::Client::new(&aws_config),
        config.cognito.client_id.clone(),
        config.cognito.client_secret.clone(),
    );
    tracing::info!("Cognito client initialized");

    let state = AppState {
        users: Arc::new(UserRepo::new(db.pg.clone())),
        identity: Arc::new(identity),
        config: config.clone(),
    };

    let origins: Vec<HeaderValue> = config
        .allowed_origins()
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    // Credentials are cookies here, so no wildcard origins.
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    let app = Router::new()
        .route("/health", get(health_check))
        .nest("/auth", api::routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}
