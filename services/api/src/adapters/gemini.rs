//! services/api/src/adapters/gemini.rs
//!
//! This module contains the adapter for the Gemini image/text API.
//! It implements the `ImageGenerationService` port from the `core` crate
//! over the Generative Language REST endpoints.

use async_trait::async_trait;
use cardsmith_core::domain::BrandKit;
use cardsmith_core::ports::{ImageGenerationService, PortError, PortResult};
use serde::Deserialize;
use serde_json::{json, Value};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

//=========================================================================================
// Response Shapes
//=========================================================================================

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    parts: Option<Vec<Part>>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
    #[serde(rename = "inlineData")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: Option<String>,
    data: String,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `ImageGenerationService` port using the
/// Gemini REST API for card images/edits/branding, the Gemini text model
/// for prompt concepts, and Imagen for general text-to-image.
#[derive(Clone)]
pub struct GeminiImageAdapter {
    client: reqwest::Client,
    api_key: String,
    image_model: String,
    text_model: String,
    imagen_model: String,
}

impl GeminiImageAdapter {
    /// Creates a new `GeminiImageAdapter`.
    pub fn new(
        client: reqwest::Client,
        api_key: String,
        image_model: String,
        text_model: String,
        imagen_model: String,
    ) -> Self {
        Self {
            client,
            api_key,
            image_model,
            text_model,
            imagen_model,
        }
    }

    /// Splits a `data:<mime>;base64,<payload>` URI into its mime type and
    /// base64 payload for inline request parts.
    fn split_data_uri(data_uri: &str) -> PortResult<(&str, &str)> {
        let rest = data_uri
            .strip_prefix("data:")
            .ok_or_else(|| PortError::Unexpected("expected a data: URI image".to_string()))?;
        let (mime, payload) = rest
            .split_once(";base64,")
            .ok_or_else(|| PortError::Unexpected("expected a base64 data URI".to_string()))?;
        Ok((mime, payload))
    }

    async fn generate_content(&self, model: &str, body: Value) -> PortResult<GenerateContentResponse> {
        let url = format!("{API_BASE}/models/{model}:generateContent");
        let response = self
            .client
            .post(url)
            .header("X-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("Gemini request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PortError::Unexpected(format!(
                "Gemini returned HTTP {status}"
            )));
        }

        response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| PortError::Unexpected(format!("Gemini response parse failed: {e}")))
    }

    /// Pulls the first inline image out of a response and re-wraps it as
    /// a data URI.
    fn first_image(response: GenerateContentResponse) -> PortResult<String> {
        let inline = response
            .candidates
            .into_iter()
            .flatten()
            .filter_map(|c| c.content)
            .filter_map(|c| c.parts)
            .flatten()
            .find_map(|p| p.inline_data)
            .ok_or_else(|| {
                PortError::Unexpected("Gemini returned no inline image data".to_string())
            })?;

        let mime = inline.mime_type.unwrap_or_else(|| "image/png".to_string());
        Ok(format!("data:{mime};base64,{}", inline.data))
    }

    fn first_text(response: GenerateContentResponse) -> PortResult<String> {
        response
            .candidates
            .into_iter()
            .flatten()
            .filter_map(|c| c.content)
            .filter_map(|c| c.parts)
            .flatten()
            .find_map(|p| p.text)
            .filter(|t| !t.is_empty())
            .map(|t| t.trim().to_string())
            .ok_or_else(|| PortError::Unexpected("Gemini returned no text".to_string()))
    }

    fn image_generation_body(parts: Vec<Value>) -> Value {
        json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": { "responseModalities": ["IMAGE", "TEXT"] }
        })
    }
}

//=========================================================================================
// `ImageGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ImageGenerationService for GeminiImageAdapter {
    /// Produces one greeting-card image for a fully rendered prompt.
    async fn generate_card_image(&self, prompt: &str) -> PortResult<String> {
        let body = Self::image_generation_body(vec![json!({ "text": prompt })]);
        let response = self.generate_content(&self.image_model, body).await?;
        Self::first_image(response)
    }

    /// Applies a free-form edit instruction to an existing card image.
    async fn edit_card_image(
        &self,
        image_data_uri: &str,
        instruction: &str,
    ) -> PortResult<String> {
        let (mime, payload) = Self::split_data_uri(image_data_uri)?;
        let body = Self::image_generation_body(vec![
            json!({ "inlineData": { "mimeType": mime, "data": payload } }),
            json!({ "text": instruction }),
        ]);
        let response = self.generate_content(&self.image_model, body).await?;
        Self::first_image(response)
    }

    /// Overlays the brand kit onto a card image. Returns the input
    /// unchanged when no brand inputs are set.
    async fn brand_card_image(&self, image_data_uri: &str, brand: &BrandKit) -> PortResult<String> {
        if brand.is_empty() {
            return Ok(image_data_uri.to_string());
        }

        let (mime, payload) = Self::split_data_uri(image_data_uri)?;
        let mut parts = vec![json!({ "inlineData": { "mimeType": mime, "data": payload } })];

        let mut instruction = String::from(
            "Place a small, tasteful brand mark in the bottom-right corner of this card image \
             without altering the rest of the artwork.",
        );
        if let Some(name) = brand.brand_name.as_deref().filter(|n| !n.is_empty()) {
            instruction.push_str(&format!(" The brand name to display is \"{name}\"."));
        }
        if let Some(logo) = brand.logo_data_uri.as_deref().filter(|l| !l.is_empty()) {
            let (logo_mime, logo_payload) = Self::split_data_uri(logo)?;
            parts.push(json!({ "inlineData": { "mimeType": logo_mime, "data": logo_payload } }));
            instruction.push_str(" Use the second attached image as the logo.");
        }
        parts.push(json!({ "text": instruction }));

        let response = self
            .generate_content(&self.image_model, Self::image_generation_body(parts))
            .await?;
        Self::first_image(response)
    }

    /// Expands a short topic into a richer card-prompt concept using the
    /// text model.
    async fn generate_prompt_concept(&self, topic: &str) -> PortResult<String> {
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": format!(
                    "Write a single, vivid prompt for an AI image generator that would make a \
                     beautiful greeting card about: {topic}. Respond with the prompt only."
                ) }]
            }]
        });
        let response = self.generate_content(&self.text_model, body).await?;
        Self::first_text(response)
    }

    /// Single-image generation through the Imagen predict endpoint.
    async fn generate_image_with_imagen(&self, prompt: &str) -> PortResult<String> {
        let url = format!("{API_BASE}/models/{}:predict", self.imagen_model);
        let body = json!({
            "instances": [{ "prompt": prompt }],
            "parameters": { "sampleCount": 1 }
        });

        let response = self
            .client
            .post(url)
            .header("X-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("Imagen request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PortError::Unexpected(format!(
                "Imagen returned HTTP {status}"
            )));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("Imagen response parse failed: {e}")))?;

        let payload = value
            .get("predictions")
            .and_then(|p| p.get(0))
            .and_then(|p| p.get("bytesBase64Encoded"))
            .and_then(|b| b.as_str())
            .ok_or_else(|| {
                PortError::Unexpected("Imagen returned no image payload".to_string())
            })?;

        Ok(format!("data:image/png;base64,{payload}"))
    }
}

//=========================================================================================
// Tests
//=========================================================================================
