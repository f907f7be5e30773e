//! services/api/src/adapters/crm.rs
//!
//! This module contains the GoHighLevel adapter, the concrete implementation
//! of the `AccountLedger` port. The CRM's custom fields act as the system of
//! record for password hash, quota, usage and plan; every read and write is
//! a separate HTTP call with no transaction between them.

use async_trait::async_trait;
use cardsmith_core::ports::{AccountLedger, AccountUpsert, LedgerAccount, PortError, PortResult};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::config::CrmFieldIds;

//=========================================================================================
// "Impure" CRM Record Structs
//=========================================================================================

#[derive(Debug, Deserialize)]
struct LookupResponse {
    contacts: Option<Vec<ContactRecord>>,
}

/// GHL wraps single-contact responses (fetch by id, upsert) the same way.
#[derive(Debug, Deserialize)]
struct ContactEnvelope {
    contact: ContactRecord,
}

#[derive(Debug, Deserialize)]
struct ContactRecord {
    id: String,
    email: Option<String>,
    #[serde(rename = "firstName")]
    first_name: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(rename = "customField", default)]
    custom_fields: Vec<CustomFieldRecord>,
}

#[derive(Debug, Deserialize)]
struct CustomFieldRecord {
    id: String,
    value: Option<Value>,
}

impl ContactRecord {
    fn field(&self, field_id: &str) -> Option<String> {
        self.custom_fields
            .iter()
            .find(|f| f.id == field_id)
            .and_then(|f| f.value.as_ref())
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
    }

    fn numeric_field(&self, field_id: &str) -> u32 {
        self.field(field_id)
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(0)
    }

    fn to_domain(self, fields: &CrmFieldIds) -> LedgerAccount {
        LedgerAccount {
            password_hash: self.field(&fields.password),
            quota: self.numeric_field(&fields.quota),
            used: self.numeric_field(&fields.used),
            plan: self
                .field(&fields.plan)
                .unwrap_or_else(|| "free".to_string()),
            contact_id: self.id,
            email: self.email.unwrap_or_default(),
            first_name: self.first_name,
            tags: self.tags,
        }
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A CRM adapter that implements the `AccountLedger` port against the
/// GoHighLevel v1 REST API.
#[derive(Clone)]
pub struct GhlLedgerAdapter {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    fields: CrmFieldIds,
}

impl GhlLedgerAdapter {
    /// Creates a new `GhlLedgerAdapter`.
    pub fn new(
        client: reqwest::Client,
        api_key: String,
        base_url: String,
        fields: CrmFieldIds,
    ) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            fields,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.base_url))
            .bearer_auth(&self.api_key)
    }

    async fn lookup(&self, email: &str) -> PortResult<Option<ContactRecord>> {
        let response = self
            .request(reqwest::Method::GET, "/contacts/lookup")
            .query(&[("email", email)])
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("CRM lookup failed: {e}")))?;

        // GHL answers the lookup of an unknown email with a non-success
        // status rather than an empty list.
        if response.status() == reqwest::StatusCode::NOT_FOUND
            || response.status() == reqwest::StatusCode::UNPROCESSABLE_ENTITY
        {
            return Ok(None);
        }
        let status = response.status();
        if !status.is_success() {
            return Err(PortError::Unexpected(format!(
                "CRM lookup returned HTTP {status}"
            )));
        }

        let body: LookupResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("CRM lookup parse failed: {e}")))?;
        Ok(body.contacts.into_iter().flatten().next())
    }

    async fn fetch_contact(&self, contact_id: &str) -> PortResult<Option<ContactRecord>> {
        let response = self
            .request(reqwest::Method::GET, &format!("/contacts/{contact_id}"))
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("CRM fetch failed: {e}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let status = response.status();
        if !status.is_success() {
            return Err(PortError::Unexpected(format!(
                "CRM fetch returned HTTP {status}"
            )));
        }

        let body: ContactEnvelope = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("CRM fetch parse failed: {e}")))?;
        Ok(Some(body.contact))
    }

    async fn update_contact(&self, contact_id: &str, body: Value) -> PortResult<()> {
        let response = self
            .request(reqwest::Method::PUT, &format!("/contacts/{contact_id}"))
            .json(&body)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("CRM update failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PortError::Unexpected(format!(
                "CRM update returned HTTP {status}"
            )));
        }
        Ok(())
    }
}

//=========================================================================================
// `AccountLedger` Trait Implementation
//=========================================================================================

#[async_trait]
impl AccountLedger for GhlLedgerAdapter {
    async fn get_account(&self, email: &str) -> PortResult<LedgerAccount> {
        match self.lookup(email).await? {
            Some(record) => Ok(record.to_domain(&self.fields)),
            None => Err(PortError::NotFound(format!(
                "no CRM contact for {email}"
            ))),
        }
    }

    async fn get_account_by_id(&self, contact_id: &str) -> PortResult<LedgerAccount> {
        match self.fetch_contact(contact_id).await? {
            Some(record) => Ok(record.to_domain(&self.fields)),
            None => Err(PortError::NotFound(format!(
                "no CRM contact with id {contact_id}"
            ))),
        }
    }

    /// Upserts the contact by email with the hashed password and the
    /// initial quota/plan custom fields.
    async fn create_or_update_account(&self, upsert: AccountUpsert) -> PortResult<LedgerAccount> {
        let mut custom = serde_json::Map::new();
        custom.insert(
            self.fields.password.clone(),
            Value::String(upsert.password_hash.clone()),
        );
        custom.insert(
            self.fields.quota.clone(),
            Value::String(upsert.quota.to_string()),
        );
        custom.insert(self.fields.used.clone(), Value::String("0".to_string()));
        custom.insert(self.fields.plan.clone(), Value::String(upsert.plan.clone()));

        let body = json!({
            "email": upsert.email.clone(),
            "firstName": upsert.first_name.clone(),
            "lastName": upsert.last_name.clone(),
            "customField": custom,
        });

        let response = self
            .request(reqwest::Method::POST, "/contacts/")
            .json(&body)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("CRM upsert failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PortError::Unexpected(format!(
                "CRM upsert returned HTTP {status}"
            )));
        }

        let created: ContactEnvelope = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("CRM upsert parse failed: {e}")))?;
        let mut account = created.contact.to_domain(&self.fields);

        // The upsert response does not always echo custom fields back;
        // fill the profile from what was just written.
        if account.password_hash.is_none() {
            account.password_hash = Some(upsert.password_hash);
            account.quota = upsert.quota;
            account.used = 0;
            account.plan = upsert.plan;
        }
        if account.email.is_empty() {
            account.email = upsert.email;
        }
        Ok(account)
    }

    async fn set_usage(&self, contact_id: &str, used: u32) -> PortResult<()> {
        let mut custom = serde_json::Map::new();
        custom.insert(self.fields.used.clone(), Value::String(used.to_string()));
        self.update_contact(contact_id, json!({ "customField": custom }))
            .await
    }

    async fn apply_bonus(&self, contact_id: &str, new_quota: u32, tag: &str) -> PortResult<()> {
        // Two writes, no transaction; if the second fails the quota is
        // already raised. The CRM remains the source of truth either way.
        let mut custom = serde_json::Map::new();
        custom.insert(
            self.fields.quota.clone(),
            Value::String(new_quota.to_string()),
        );
        self.update_contact(contact_id, json!({ "customField": custom }))
            .await?;
        if let Err(e) = self
            .update_contact(contact_id, json!({ "tags": [tag] }))
            .await
        {
            warn!(contact_id, error = %e, "bonus quota written but tag update failed");
            return Err(e);
        }
        Ok(())
    }
}

//=========================================================================================
// Tests
//=========================================================================================
