pub mod agency;
pub mod auth;
pub mod batch;
pub mod gemini_api;
pub mod generate;
pub mod protocol;
pub mod state;
pub mod webhook;

#[cfg(test)]
pub mod testutil;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use utoipa::OpenApi;

use crate::web::state::AppState;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::login_handler,
        auth::register_handler,
        webhook::webhook_handler,
        generate::generate_handler,
        gemini_api::gemini_handler,
        batch::batch_handler,
        agency::get_agency_config_handler,
        agency::save_agency_config_handler,
    ),
    components(
        schemas(
            protocol::ErrorBody,
            protocol::UserProfile,
            protocol::AuthSuccess,
            protocol::MessageResponse,
            auth::LoginRequest,
            auth::RegisterRequest,
            webhook::WebhookRequest,
            generate::GenerateRequest,
            generate::GenerateResponse,
            gemini_api::GeminiData,
            agency::SaveAgencyRequest,
            agency::AgencyConfigBody,
            agency::AgencyConfigResponse,
        )
    ),
    tags(
        (name = "Cardsmith API", description = "Personalized greeting-card generation endpoints.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Router
//=========================================================================================

/// Builds the full API router. Only POST (resp. GET) routes are mounted,
/// so other methods are rejected by routing.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/login", post(auth::login_handler))
        .route("/api/register", post(auth::register_handler))
        .route("/api/ghl-webhook", post(webhook::webhook_handler))
        .route("/api/generate", post(generate::generate_handler))
        .route("/api/gemini", post(gemini_api::gemini_handler))
        .route("/api/batch", post(batch::batch_handler))
        .route(
            "/api/agency/config",
            get(agency::get_agency_config_handler).post(agency::save_agency_config_handler),
        )
        .layer(DefaultBodyLimit::max(25 * 1024 * 1024))
        .with_state(state)
}
