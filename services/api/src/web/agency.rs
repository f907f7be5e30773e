//! services/api/src/web/agency.rs
//!
//! Agency whitelabel configuration, read and written through the injected
//! `AgencyConfigStore` port.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use cardsmith_core::domain::AgencyConfig;
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

use crate::web::protocol::{reject, MessageResponse, Rejection};
use crate::web::state::AppState;

#[derive(Deserialize, ToSchema)]
pub struct AgencyQuery {
    pub agency_id: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveAgencyRequest {
    pub agency_id: String,
    pub config: AgencyConfigBody,
}

/// The agency config as it crosses the wire.
#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AgencyConfigBody {
    pub agency_name: String,
    pub primary_color: String,
    pub support_email: String,
    pub legal_text: String,
}

impl From<AgencyConfig> for AgencyConfigBody {
    fn from(config: AgencyConfig) -> Self {
        Self {
            agency_name: config.agency_name,
            primary_color: config.primary_color,
            support_email: config.support_email,
            legal_text: config.legal_text,
        }
    }
}

impl From<AgencyConfigBody> for AgencyConfig {
    fn from(body: AgencyConfigBody) -> Self {
        Self {
            agency_name: body.agency_name,
            primary_color: body.primary_color,
            support_email: body.support_email,
            legal_text: body.legal_text,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AgencyConfigResponse {
    pub success: bool,
    pub config: Option<AgencyConfigBody>,
}

/// GET /api/agency/config - Load an agency's whitelabel settings
#[utoipa::path(
    get,
    path = "/api/agency/config",
    params(("agency_id" = String, Query, description = "The agency identifier")),
    responses(
        (status = 200, description = "The stored config, or null when unset", body = AgencyConfigResponse),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_agency_config_handler(
    State(state): State<AppState>,
    Query(query): Query<AgencyQuery>,
) -> Result<impl IntoResponse, Rejection> {
    let config = state.agency.get(&query.agency_id).await.map_err(|e| {
        error!("Agency config read failed: {:?}", e);
        reject(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Could not load the agency configuration.",
        )
    })?;

    Ok((
        StatusCode::OK,
        Json(AgencyConfigResponse {
            success: true,
            config: config.map(Into::into),
        }),
    ))
}

/// POST /api/agency/config - Save an agency's whitelabel settings
#[utoipa::path(
    post,
    path = "/api/agency/config",
    request_body = SaveAgencyRequest,
    responses(
        (status = 200, description = "Saved", body = MessageResponse),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn save_agency_config_handler(
    State(state): State<AppState>,
    Json(req): Json<SaveAgencyRequest>,
) -> Result<impl IntoResponse, Rejection> {
    state
        .agency
        .put(&req.agency_id, req.config.into())
        .await
        .map_err(|e| {
            error!("Agency config write failed: {:?}", e);
            reject(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Could not save the agency configuration.",
            )
        })?;

    Ok((
        StatusCode::OK,
        Json(MessageResponse {
            success: true,
            message: "Agency configuration saved.".to_string(),
        }),
    ))
}

//=========================================================================================
// Tests
//=========================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::testutil::{body_json, get, post_json, test_router, MockLedger};

    #[tokio::test]
    async fn config_round_trips_through_the_store() {
        let app = test_router(MockLedger::empty());

        let response = get(&app, "/api/agency/config?agency_id=a1").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body["config"].is_null());

        let response = post_json(
            &app,
            "/api/agency/config",
            serde_json::json!({
                "agencyId": "a1",
                "config": {
                    "agencyName": "Acme Cards",
                    "primaryColor": "#aa33ff",
                    "supportEmail": "hi@acme.test",
                    "legalText": "All rights reserved."
                }
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = get(&app, "/api/agency/config?agency_id=a1").await;
        let body = body_json(response).await;
        assert_eq!(body["config"]["agencyName"], "Acme Cards");
    }
}
