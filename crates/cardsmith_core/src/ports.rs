//! crates/cardsmith_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like the image API or CRM.

use async_trait::async_trait;

use crate::domain::{AccountProfile, AgencyConfig, BrandKit};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (image API, CRM, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Credit quota exhausted ({used}/{quota})")]
    QuotaExceeded { used: u32, quota: u32 },
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The image-generation collaborator. All image payloads are data URIs
/// (`data:image/...;base64,...`) unless a remote URL is passed through.
#[async_trait]
pub trait ImageGenerationService: Send + Sync {
    /// Produces a greeting-card image for a fully rendered prompt.
    async fn generate_card_image(&self, prompt: &str) -> PortResult<String>;

    /// Applies a free-form edit instruction to an existing image.
    async fn edit_card_image(&self, image_data_uri: &str, instruction: &str)
        -> PortResult<String>;

    /// Overlays the brand kit onto an image. Implementations must return
    /// the input unchanged when `brand.is_empty()`.
    async fn brand_card_image(&self, image_data_uri: &str, brand: &BrandKit)
        -> PortResult<String>;

    /// Expands a short topic into a richer prompt concept via the text model.
    async fn generate_prompt_concept(&self, topic: &str) -> PortResult<String>;

    /// Single-image generation through the general text-to-image model.
    async fn generate_image_with_imagen(&self, prompt: &str) -> PortResult<String>;
}

/// An account on the external CRM ledger, including the custom fields
/// this application reads and writes.
#[derive(Debug, Clone)]
pub struct LedgerAccount {
    pub contact_id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub password_hash: Option<String>,
    pub quota: u32,
    pub used: u32,
    pub plan: String,
    pub tags: Vec<String>,
}

impl LedgerAccount {
    pub fn profile(&self) -> AccountProfile {
        AccountProfile {
            id: self.contact_id.clone(),
            email: self.email.clone(),
            quota: self.quota,
            used: self.used,
            plan: self.plan.clone(),
        }
    }
}

/// The fields written when registering (or re-registering) an account.
#[derive(Debug, Clone)]
pub struct AccountUpsert {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password_hash: String,
    pub quota: u32,
    pub plan: String,
}

/// The CRM-backed account ledger. The CRM is the sole source of truth;
/// reads and writes are separate HTTP calls with no transaction between
/// them, so callers own the check-then-act ordering.
#[async_trait]
pub trait AccountLedger: Send + Sync {
    async fn get_account(&self, email: &str) -> PortResult<LedgerAccount>;

    /// Fetches a contact record directly by its CRM id.
    async fn get_account_by_id(&self, contact_id: &str) -> PortResult<LedgerAccount>;

    async fn create_or_update_account(&self, upsert: AccountUpsert) -> PortResult<LedgerAccount>;

    /// Writes the used-count custom field on the CRM contact record.
    async fn set_usage(&self, contact_id: &str, used: u32) -> PortResult<()>;

    /// Writes a new quota and appends a tag, used by the bonus webhook.
    async fn apply_bonus(&self, contact_id: &str, new_quota: u32, tag: &str) -> PortResult<()>;
}

/// Resolves a card's image reference to raw bytes for archiving.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url_or_data_uri: &str) -> PortResult<Vec<u8>>;
}

/// The externally-owned store for agency whitelabel configuration.
#[async_trait]
pub trait AgencyConfigStore: Send + Sync {
    async fn get(&self, agency_id: &str) -> PortResult<Option<AgencyConfig>>;
    async fn put(&self, agency_id: &str, config: AgencyConfig) -> PortResult<()>;
}
