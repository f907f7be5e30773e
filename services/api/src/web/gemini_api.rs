//! services/api/src/web/gemini_api.rs
//!
//! The multiplexed image/text endpoint: one POST route taking an
//! `action` discriminator plus its payload, answering `{ data }` or
//! `{ error }`.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use cardsmith_core::domain::BrandKit;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::error;
use utoipa::ToSchema;

use crate::web::protocol::{reject, Rejection};
use crate::web::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(tag = "action")]
enum GeminiAction {
    #[serde(rename = "generatePromptConcept")]
    PromptConcept { topic: String },
    #[serde(rename = "generateGreetingCardImage")]
    CardImage { prompt: String },
    #[serde(rename = "editGreetingCardImage")]
    EditImage { image: String, instruction: String },
    #[serde(rename = "brandCardImage")]
    BrandImage {
        image: String,
        #[serde(default)]
        brand: BrandKit,
    },
    #[serde(rename = "generateImageWithImagen")]
    Imagen { prompt: String },
}

#[derive(Serialize, ToSchema)]
pub struct GeminiData {
    pub data: String,
}

/// POST /api/gemini - Multiplexed generation actions
#[utoipa::path(
    post,
    path = "/api/gemini",
    responses(
        (status = 200, description = "Action result", body = GeminiData),
        (status = 400, description = "Unknown action or malformed payload"),
        (status = 500, description = "The model call failed")
    )
)]
pub async fn gemini_handler(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, Rejection> {
    // Parse the action by hand so an unknown action is a clean 400
    // instead of an extractor rejection.
    let action: GeminiAction = serde_json::from_value(body)
        .map_err(|_| reject(StatusCode::BAD_REQUEST, "Unknown or malformed action."))?;

    let result = match action {
        GeminiAction::PromptConcept { topic } => {
            state.images.generate_prompt_concept(&topic).await
        }
        GeminiAction::CardImage { prompt } => state.images.generate_card_image(&prompt).await,
        GeminiAction::EditImage { image, instruction } => {
            state.images.edit_card_image(&image, &instruction).await
        }
        GeminiAction::BrandImage { image, brand } => {
            state.images.brand_card_image(&image, &brand).await
        }
        GeminiAction::Imagen { prompt } => state.images.generate_image_with_imagen(&prompt).await,
    };

    let data = result.map_err(|e| {
        error!("Gemini action failed: {:?}", e);
        reject(
            StatusCode::INTERNAL_SERVER_ERROR,
            "The generation service is unavailable.",
        )
    })?;

    Ok((StatusCode::OK, Json(GeminiData { data })))
}

//=========================================================================================
// Tests
//=========================================================================================
