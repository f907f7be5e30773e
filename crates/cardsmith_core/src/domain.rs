//! crates/cardsmith_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any transport or storage format;
//! serde derives exist only on the types that cross the HTTP boundary
//! verbatim.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A recipient record, created from one CSV row or one typed-in name.
///
/// Name and email are guaranteed non-empty by the importer's row filter.
/// A `Contact` is immutable once created and consumed once by a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub email: String,
    pub custom_prompt_detail: Option<String>,
}

impl Contact {
    /// The text before the first space of the full name, used to
    /// personalize prompt templates.
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }
}

/// A contact paired with the image produced for it.
///
/// `image_url` is either a `data:` URI or a remote URL. The identity key
/// of a card is its contact's email: editing or branding a card replaces
/// the entry with the same email rather than appending a new one.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedCard {
    pub contact: Contact,
    pub image_url: String,
    pub generated_at: DateTime<Utc>,
}

/// One entry of the static prompt-template catalog.
///
/// `template` contains the `{firstName}` placeholder that the renderer
/// substitutes with the contact's first name.
#[derive(Debug, Clone, Serialize)]
pub struct PromptTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub template: &'static str,
}

/// The minimal account profile surfaced to clients after login/register.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountProfile {
    pub id: String,
    pub email: String,
    pub quota: u32,
    pub used: u32,
    pub plan: String,
}

/// Optional brand inputs applied by the post-processing step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrandKit {
    pub brand_name: Option<String>,
    pub logo_data_uri: Option<String>,
}

impl BrandKit {
    /// True when neither a brand name nor a logo is set; the branding
    /// collaborator passes images through unchanged in that case.
    pub fn is_empty(&self) -> bool {
        self.brand_name.as_deref().map_or(true, str::is_empty)
            && self.logo_data_uri.as_deref().map_or(true, str::is_empty)
    }
}

/// Whitelabel settings a reseller configures for their instance.
///
/// Held by an injected `AgencyConfigStore` rather than ambient browser
/// storage, so the schema is explicit and the access path is a port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgencyConfig {
    pub agency_name: String,
    pub primary_color: String,
    pub support_email: String,
    pub legal_text: String,
}

/// The record of one finished batch run.
#[derive(Debug)]
pub struct BatchOutcome {
    pub batch_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub cards: Vec<GeneratedCard>,
    pub failures: Vec<BatchFailure>,
}

/// A per-contact generation failure; non-fatal to the batch.
#[derive(Debug, Clone)]
pub struct BatchFailure {
    pub contact: Contact,
    pub message: String,
}
