//! services/api/src/web/protocol.rs
//!
//! The shared JSON envelope types returned by the API handlers, plus the
//! helpers for the user-safe error responses.

use axum::http::StatusCode;
use axum::Json;
use cardsmith_core::domain::AccountProfile;
use serde::Serialize;
use utoipa::ToSchema;

/// The error body every failure path returns: a user-safe message, never
/// internals or secrets.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

/// The rejection type shared by all handlers.
pub type Rejection = (StatusCode, Json<ErrorBody>);

/// Builds a rejection with a user-safe message.
pub fn reject(status: StatusCode, message: impl Into<String>) -> Rejection {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

/// The minimal user profile echoed back after login/register.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub quota: u32,
    pub used: u32,
    pub plan: String,
}

impl From<AccountProfile> for UserProfile {
    fn from(profile: AccountProfile) -> Self {
        Self {
            id: profile.id,
            email: profile.email,
            quota: profile.quota,
            used: profile.used,
            plan: profile.plan,
        }
    }
}

/// The success envelope carrying a user profile.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthSuccess {
    pub success: bool,
    pub user: UserProfile,
}

/// A success envelope carrying only a descriptive message.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}
