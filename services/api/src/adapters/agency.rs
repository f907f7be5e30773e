//! services/api/src/adapters/agency.rs
//!
//! An in-memory implementation of the `AgencyConfigStore` port. Replaces
//! the browser-local-storage pattern with an injected repository so the
//! whitelabel schema and its access path are explicit.

use std::collections::HashMap;

use async_trait::async_trait;
use cardsmith_core::domain::AgencyConfig;
use cardsmith_core::ports::{AgencyConfigStore, PortResult};
use tokio::sync::RwLock;

/// A process-local agency-config store.
#[derive(Default)]
pub struct InMemoryAgencyStore {
    configs: RwLock<HashMap<String, AgencyConfig>>,
}

impl InMemoryAgencyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AgencyConfigStore for InMemoryAgencyStore {
    async fn get(&self, agency_id: &str) -> PortResult<Option<AgencyConfig>> {
        Ok(self.configs.read().await.get(agency_id).cloned())
    }

    async fn put(&self, agency_id: &str, config: AgencyConfig) -> PortResult<()> {
        self.configs
            .write()
            .await
            .insert(agency_id.to_string(), config);
        Ok(())
    }
}
