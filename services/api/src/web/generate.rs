//! services/api/src/web/generate.rs
//!
//! The credit-gated single-image generation endpoint for authenticated
//! users. The CRM holds the quota and used-count custom fields.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use utoipa::ToSchema;

use crate::web::protocol::{reject, Rejection};
use crate::web::state::AppState;

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub contact_id: String,
    /// Optional; when absent the account is resolved by contact id.
    pub email: Option<String>,
    pub prompt: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub generated_image: String,
    pub remaining_credits: u32,
}

/// POST /api/generate - Consume one credit, then generate one image
#[utoipa::path(
    post,
    path = "/api/generate",
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "Image generated", body = GenerateResponse),
        (status = 403, description = "Credit quota exhausted"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn generate_handler(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> Result<impl IntoResponse, Rejection> {
    // 1. Read the current usage from the CRM, by email when the client
    //    sends one and by contact id otherwise.
    let lookup = match &req.email {
        Some(email) => state.ledger.get_account(email).await,
        None => state.ledger.get_account_by_id(&req.contact_id).await,
    };
    let account = lookup.map_err(|e| {
        error!("CRM lookup failed before generation: {:?}", e);
        reject(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Generation is temporarily unavailable.",
        )
    })?;

    // 2. Reject when the quota is spent.
    if account.used >= account.quota {
        return Err(reject(
            StatusCode::FORBIDDEN,
            "You have used all of your credits.",
        ));
    }

    // 3. Deduct the credit BEFORE the paid generation call. Business
    //    rule: a failure after this point means charged-but-not-delivered,
    //    never delivered-but-not-charged.
    let new_used = account.used + 1;
    state
        .ledger
        .set_usage(&req.contact_id, new_used)
        .await
        .map_err(|e| {
            error!("CRM usage write failed: {:?}", e);
            reject(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Generation is temporarily unavailable.",
            )
        })?;

    // 4. Perform the generation call.
    let generated_image = state
        .images
        .generate_card_image(&req.prompt)
        .await
        .map_err(|e| {
            error!("Image generation failed after credit deduction: {:?}", e);
            reject(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Image generation failed.",
            )
        })?;

    let remaining_credits = account.quota - new_used;
    info!(contact_id = %req.contact_id, remaining_credits, "credit-gated generation succeeded");
    Ok((
        StatusCode::OK,
        Json(GenerateResponse {
            generated_image,
            remaining_credits,
        }),
    ))
}

//=========================================================================================
// Tests
//=========================================================================================
