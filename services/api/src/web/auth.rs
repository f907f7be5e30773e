//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for login and registration. Accounts live on
//! the CRM; the password hash is a custom field on the contact record.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use cardsmith_core::ports::{AccountUpsert, PortError};
use serde::Deserialize;
use tracing::error;
use utoipa::ToSchema;

use crate::web::protocol::{reject, AuthSuccess, Rejection};
use crate::web::state::AppState;

/// Contacts carrying this tag at registration time get the launch offer.
pub const PROMO_TAG: &str = "cardsmith-launch-offer";
const PROMO_QUOTA: u32 = 25;
const PROMO_PLAN: &str = "launch";
const DEFAULT_QUOTA: u32 = 10;
const DEFAULT_PLAN: &str = "free";

const INVALID_CREDENTIALS: &str = "Invalid email or password.";

//=========================================================================================
// Request Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/login - Verify credentials against the CRM-stored hash
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthSuccess),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, Rejection> {
    // 1. Look the contact up on the CRM. A missing account is reported
    //    the same way as a wrong password.
    let account = match state.ledger.get_account(&req.email).await {
        Ok(account) => account,
        Err(PortError::NotFound(_)) => {
            return Err(reject(StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS))
        }
        Err(e) => {
            error!("CRM lookup failed during login: {:?}", e);
            return Err(reject(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Login is temporarily unavailable.",
            ));
        }
    };

    // 2. Extract the stored hash; an account without one cannot log in.
    let stored_hash = account
        .password_hash
        .as_deref()
        .ok_or_else(|| reject(StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS))?;

    // 3. Verify the password. No CRM write happens on this path.
    let parsed_hash = PasswordHash::new(stored_hash).map_err(|e| {
        error!("Stored password hash is unparsable: {:?}", e);
        reject(StatusCode::INTERNAL_SERVER_ERROR, "Authentication error.")
    })?;

    let valid = Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .is_ok();
    if !valid {
        return Err(reject(StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS));
    }

    // 4. Return the minimal profile.
    Ok((
        StatusCode::OK,
        Json(AuthSuccess {
            success: true,
            user: account.profile().into(),
        }),
    ))
}

/// POST /api/register - Create (or refresh) an account on the CRM
#[utoipa::path(
    post,
    path = "/api/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created", body = AuthSuccess),
        (status = 400, description = "Invalid request"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn register_handler(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, Rejection> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(reject(
            StatusCode::BAD_REQUEST,
            "Email and password are required.",
        ));
    }

    // 1. Hash the password.
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            reject(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Could not create the account.",
            )
        })?
        .to_string();

    // 2. Check the existing contact (if any) for the launch-offer tag to
    //    decide the initial quota and plan.
    let (quota, plan) = match state.ledger.get_account(&req.email).await {
        Ok(existing) if existing.tags.iter().any(|t| t == PROMO_TAG) => {
            (PROMO_QUOTA, PROMO_PLAN)
        }
        Ok(_) | Err(PortError::NotFound(_)) => (DEFAULT_QUOTA, DEFAULT_PLAN),
        Err(e) => {
            error!("CRM lookup failed during registration: {:?}", e);
            return Err(reject(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Could not create the account.",
            ));
        }
    };

    // 3. Upsert the contact with the hashed password and initial fields.
    let account = state
        .ledger
        .create_or_update_account(AccountUpsert {
            email: req.email.trim().to_string(),
            first_name: req.first_name,
            last_name: req.last_name,
            password_hash,
            quota,
            plan: plan.to_string(),
        })
        .await
        .map_err(|e| {
            error!("CRM upsert failed during registration: {:?}", e);
            reject(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Could not create the account.",
            )
        })?;

    // 4. Return the new profile.
    Ok((
        StatusCode::OK,
        Json(AuthSuccess {
            success: true,
            user: account.profile().into(),
        }),
    ))
}

//=========================================================================================
// Tests
//=========================================================================================
