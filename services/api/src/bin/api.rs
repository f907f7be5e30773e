//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{GeminiImageAdapter, GhlLedgerAdapter, HttpImageFetcher, InMemoryAgencyStore},
    config::Config,
    error::ApiError,
    web::{router, state::AppState, ApiDoc},
};
use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    Method,
};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Initialize Service Adapters ---
    let http_client = reqwest::Client::new();

    let images = Arc::new(GeminiImageAdapter::new(
        http_client.clone(),
        config.gemini_api_key.clone(),
        config.image_model.clone(),
        config.text_model.clone(),
        config.imagen_model.clone(),
    ));
    let ledger = Arc::new(GhlLedgerAdapter::new(
        http_client.clone(),
        config.ghl_api_key.clone(),
        config.ghl_base_url.clone(),
        config.crm_fields.clone(),
    ));
    let fetcher = Arc::new(HttpImageFetcher::new(http_client));
    let agency = Arc::new(InMemoryAgencyStore::new());

    // --- 3. Build the Shared AppState ---
    let app_state = AppState {
        config: config.clone(),
        images,
        ledger,
        fetcher,
        agency,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 4. Create the Web Router ---
    let app = Router::new()
        .merge(router(app_state).layer(cors))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
