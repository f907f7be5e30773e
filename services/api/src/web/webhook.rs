//! services/api/src/web/webhook.rs
//!
//! The CRM automation webhook that grants bonus credits. The calling
//! automation tool treats any non-200 as a broken workflow, so every
//! no-op outcome is reported as a success-shaped message.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use cardsmith_core::ports::PortError;
use serde::Deserialize;
use tracing::{error, info};
use utoipa::ToSchema;

use crate::web::protocol::{reject, MessageResponse, Rejection};
use crate::web::state::AppState;

/// The tag a contact must carry to receive the bonus.
pub const BONUS_ELIGIBLE_TAG: &str = "bonus-eligible";
/// The tag applied once the bonus has been granted.
pub const BONUS_GRANTED_TAG: &str = "bonus-granted";
/// Credits added on top of the supplied base quota.
pub const BONUS_CREDITS: u32 = 5;

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRequest {
    pub email: String,
    pub base_quota: u32,
}

fn ok(message: impl Into<String>) -> (StatusCode, Json<MessageResponse>) {
    (
        StatusCode::OK,
        Json(MessageResponse {
            success: true,
            message: message.into(),
        }),
    )
}

/// POST /api/ghl-webhook - Grant bonus credits to a tagged contact
#[utoipa::path(
    post,
    path = "/api/ghl-webhook",
    request_body = WebhookRequest,
    responses(
        (status = 200, description = "Processed; the message says whether a bonus applied", body = MessageResponse),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn webhook_handler(
    State(state): State<AppState>,
    Json(req): Json<WebhookRequest>,
) -> Result<impl IntoResponse, Rejection> {
    // 1. Look the contact up; a missing contact is a successful no-op.
    let account = match state.ledger.get_account(&req.email).await {
        Ok(account) => account,
        Err(PortError::NotFound(_)) => {
            return Ok(ok("Contact not found, no bonus applied."));
        }
        Err(e) => {
            error!("CRM lookup failed in webhook: {:?}", e);
            return Err(reject(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Webhook processing failed.",
            ));
        }
    };

    // 2. Check eligibility. Both no-bonus outcomes stay success-shaped.
    if !account.tags.iter().any(|t| t == BONUS_ELIGIBLE_TAG) {
        return Ok(ok("Contact is not eligible, no bonus applied."));
    }
    if account.tags.iter().any(|t| t == BONUS_GRANTED_TAG) {
        return Ok(ok("Bonus was already granted, no bonus applied."));
    }

    // 3. Raise the quota and mark the grant. The base quota comes from
    //    an external automation payload, so the add must not overflow.
    let new_quota = req.base_quota.saturating_add(BONUS_CREDITS);
    state
        .ledger
        .apply_bonus(&account.contact_id, new_quota, BONUS_GRANTED_TAG)
        .await
        .map_err(|e| {
            error!("CRM bonus update failed: {:?}", e);
            reject(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Webhook processing failed.",
            )
        })?;

    info!(email = %req.email, new_quota, "bonus credits granted");
    Ok(ok(format!("Bonus applied, new quota is {new_quota}.")))
}

//=========================================================================================
// Tests
//=========================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::testutil::{body_json, post_json, test_router, MockLedger};

    #[tokio::test]
    async fn unknown_contact_is_a_success_shaped_no_op() {
        let app = test_router(MockLedger::empty());

        let response = post_json(
            &app,
            "/api/ghl-webhook",
            serde_json::json!({ "email": "ghost@x.com", "baseQuota": 10 }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Contact not found, no bonus applied.");
    }

    #[tokio::test]
    async fn ineligible_contact_gets_no_bonus_but_still_200() {
        let ledger = MockLedger::with_tagged_contact("ann@x.com", "customer");
        let app = test_router(ledger.clone());

        let response = post_json(
            &app,
            "/api/ghl-webhook",
            serde_json::json!({ "email": "ann@x.com", "baseQuota": 10 }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Contact is not eligible, no bonus applied.");
        assert_eq!(ledger.write_count(), 0);
    }

    #[tokio::test]
    async fn eligible_contact_gets_base_quota_plus_bonus() {
        let ledger = MockLedger::with_tagged_contact("vip@x.com", BONUS_ELIGIBLE_TAG);
        let app = test_router(ledger.clone());

        let response = post_json(
            &app,
            "/api/ghl-webhook",
            serde_json::json!({ "email": "vip@x.com", "baseQuota": 10 }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Bonus applied, new quota is 15.");
        assert_eq!(ledger.last_bonus(), Some((15, BONUS_GRANTED_TAG.to_string())));
    }

    #[tokio::test]
    async fn extreme_base_quota_saturates_instead_of_overflowing() {
        let ledger = MockLedger::with_tagged_contact("vip@x.com", BONUS_ELIGIBLE_TAG);
        let app = test_router(ledger.clone());

        let response = post_json(
            &app,
            "/api/ghl-webhook",
            serde_json::json!({ "email": "vip@x.com", "baseQuota": u32::MAX }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            ledger.last_bonus(),
            Some((u32::MAX, BONUS_GRANTED_TAG.to_string()))
        );
    }

    #[tokio::test]
    async fn bonus_is_not_granted_twice() {
        let ledger =
            MockLedger::with_tags("vip@x.com", &[BONUS_ELIGIBLE_TAG, BONUS_GRANTED_TAG]);
        let app = test_router(ledger.clone());

        let response = post_json(
            &app,
            "/api/ghl-webhook",
            serde_json::json!({ "email": "vip@x.com", "baseQuota": 10 }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Bonus was already granted, no bonus applied.");
        assert_eq!(ledger.write_count(), 0);
    }
}
