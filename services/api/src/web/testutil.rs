//! services/api/src/web/testutil.rs
//!
//! Shared fixtures for the handler tests: mock port implementations with
//! call recording, a router builder and small request helpers.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use base64::Engine;
use cardsmith_core::domain::BrandKit;
use cardsmith_core::ports::{
    AccountLedger, AccountUpsert, ImageGenerationService, LedgerAccount, PortError, PortResult,
};
use http_body_util::BodyExt;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use tracing::Level;

use crate::adapters::{HttpImageFetcher, InMemoryAgencyStore};
use crate::config::{Config, CrmFieldIds};
use crate::web::state::AppState;

//=========================================================================================
// Mock Account Ledger
//=========================================================================================

#[derive(Default)]
struct LedgerInner {
    account: Option<LedgerAccount>,
    writes: u32,
    last_usage: Option<(String, u32)>,
    last_bonus: Option<(u32, String)>,
}

/// A scripted `AccountLedger` holding at most one account and recording
/// every write it receives.
#[derive(Clone, Default)]
pub struct MockLedger {
    inner: Arc<Mutex<LedgerInner>>,
}

impl MockLedger {
    pub fn empty() -> Self {
        Self::default()
    }

    fn with(account: LedgerAccount) -> Self {
        Self {
            inner: Arc::new(Mutex::new(LedgerInner {
                account: Some(account),
                ..Default::default()
            })),
        }
    }

    pub fn with_account(email: &str, password_hash: String) -> Self {
        Self::with(LedgerAccount {
            contact_id: "c-1".to_string(),
            email: email.to_string(),
            first_name: None,
            password_hash: Some(password_hash),
            quota: 10,
            used: 0,
            plan: "free".to_string(),
            tags: vec![],
        })
    }

    pub fn with_tagged_contact(email: &str, tag: &str) -> Self {
        Self::with_tags(email, &[tag])
    }

    pub fn with_tags(email: &str, tags: &[&str]) -> Self {
        Self::with(LedgerAccount {
            contact_id: "c-1".to_string(),
            email: email.to_string(),
            first_name: None,
            password_hash: None,
            quota: 10,
            used: 0,
            plan: "free".to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        })
    }

    pub fn with_usage(email: &str, used: u32, quota: u32) -> Self {
        Self::with(LedgerAccount {
            contact_id: "c-1".to_string(),
            email: email.to_string(),
            first_name: None,
            password_hash: None,
            quota,
            used,
            plan: "free".to_string(),
            tags: vec![],
        })
    }

    /// Argon2-hashes a password the same way the register handler does.
    pub fn hash(password: &str) -> String {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .unwrap()
            .to_string()
    }

    pub fn write_count(&self) -> u32 {
        self.inner.lock().unwrap().writes
    }

    pub fn last_usage(&self) -> Option<(String, u32)> {
        self.inner.lock().unwrap().last_usage.clone()
    }

    pub fn last_bonus(&self) -> Option<(u32, String)> {
        self.inner.lock().unwrap().last_bonus.clone()
    }
}

#[async_trait]
impl AccountLedger for MockLedger {
    async fn get_account(&self, email: &str) -> PortResult<LedgerAccount> {
        self.inner
            .lock()
            .unwrap()
            .account
            .as_ref()
            .filter(|a| a.email == email)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("no CRM contact for {email}")))
    }

    async fn get_account_by_id(&self, contact_id: &str) -> PortResult<LedgerAccount> {
        self.inner
            .lock()
            .unwrap()
            .account
            .as_ref()
            .filter(|a| a.contact_id == contact_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("no CRM contact with id {contact_id}")))
    }

    async fn create_or_update_account(&self, upsert: AccountUpsert) -> PortResult<LedgerAccount> {
        let mut inner = self.inner.lock().unwrap();
        inner.writes += 1;
        let account = LedgerAccount {
            contact_id: "c-1".to_string(),
            email: upsert.email,
            first_name: upsert.first_name,
            password_hash: Some(upsert.password_hash),
            quota: upsert.quota,
            used: 0,
            plan: upsert.plan,
            tags: vec![],
        };
        inner.account = Some(account.clone());
        Ok(account)
    }

    async fn set_usage(&self, contact_id: &str, used: u32) -> PortResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.writes += 1;
        inner.last_usage = Some((contact_id.to_string(), used));
        Ok(())
    }

    async fn apply_bonus(&self, _contact_id: &str, new_quota: u32, tag: &str) -> PortResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.writes += 1;
        inner.last_bonus = Some((new_quota, tag.to_string()));
        Ok(())
    }
}

//=========================================================================================
// Mock Image Generation
//=========================================================================================

/// Answers every generation call with a deterministic data URI.
pub struct MockImages;

fn data_uri(payload: &str) -> String {
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(payload)
    )
}

#[async_trait]
impl ImageGenerationService for MockImages {
    async fn generate_card_image(&self, prompt: &str) -> PortResult<String> {
        Ok(data_uri(prompt))
    }

    async fn edit_card_image(&self, _image: &str, instruction: &str) -> PortResult<String> {
        Ok(data_uri(instruction))
    }

    async fn brand_card_image(&self, image: &str, brand: &BrandKit) -> PortResult<String> {
        if brand.is_empty() {
            return Ok(image.to_string());
        }
        Ok(data_uri("branded"))
    }

    async fn generate_prompt_concept(&self, topic: &str) -> PortResult<String> {
        Ok(format!("A vivid card concept about {topic}"))
    }

    async fn generate_image_with_imagen(&self, prompt: &str) -> PortResult<String> {
        Ok(data_uri(prompt))
    }
}

/// Fails every generation call.
pub struct FailingImages;

#[async_trait]
impl ImageGenerationService for FailingImages {
    async fn generate_card_image(&self, _: &str) -> PortResult<String> {
        Err(PortError::Unexpected("model is down".to_string()))
    }

    async fn edit_card_image(&self, _: &str, _: &str) -> PortResult<String> {
        Err(PortError::Unexpected("model is down".to_string()))
    }

    async fn brand_card_image(&self, _: &str, _: &BrandKit) -> PortResult<String> {
        Err(PortError::Unexpected("model is down".to_string()))
    }

    async fn generate_prompt_concept(&self, _: &str) -> PortResult<String> {
        Err(PortError::Unexpected("model is down".to_string()))
    }

    async fn generate_image_with_imagen(&self, _: &str) -> PortResult<String> {
        Err(PortError::Unexpected("model is down".to_string()))
    }
}

//=========================================================================================
// Router and request helpers
//=========================================================================================

fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        log_level: Level::INFO,
        gemini_api_key: "test-key".to_string(),
        ghl_api_key: "test-key".to_string(),
        ghl_base_url: "http://localhost".to_string(),
        crm_fields: CrmFieldIds {
            password: "f-pass".to_string(),
            quota: "f-quota".to_string(),
            used: "f-used".to_string(),
            plan: "f-plan".to_string(),
        },
        image_model: "image-model".to_string(),
        text_model: "text-model".to_string(),
        imagen_model: "imagen-model".to_string(),
    }
}

fn state_with(
    ledger: MockLedger,
    images: Arc<dyn ImageGenerationService>,
) -> AppState {
    AppState {
        config: Arc::new(test_config()),
        images,
        ledger: Arc::new(ledger),
        fetcher: Arc::new(HttpImageFetcher::new(reqwest::Client::new())),
        agency: Arc::new(InMemoryAgencyStore::new()),
    }
}

pub fn test_router(ledger: MockLedger) -> Router {
    crate::web::router(state_with(ledger, Arc::new(MockImages)))
}

pub fn test_router_with_failing_images(ledger: MockLedger) -> Router {
    crate::web::router(state_with(ledger, Arc::new(FailingImages)))
}

pub async fn post_json(
    app: &Router,
    path: &str,
    body: serde_json::Value,
) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(path)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

pub async fn get(app: &Router, path: &str) -> Response<Body> {
    app.clone()
        .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post_multipart(
    app: &Router,
    path: &str,
    parts: Vec<(&'static str, String)>,
) -> Response<Body> {
    let boundary = "cardsmith-test-boundary";
    let mut body = String::new();
    for (name, value) in parts {
        body.push_str(&format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    body.push_str(&format!("--{boundary}--\r\n"));

    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(path)
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
