//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use cardsmith_core::ports::{
    AccountLedger, AgencyConfigStore, ImageFetcher, ImageGenerationService,
};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub images: Arc<dyn ImageGenerationService>,
    pub ledger: Arc<dyn AccountLedger>,
    pub fetcher: Arc<dyn ImageFetcher>,
    pub agency: Arc<dyn AgencyConfigStore>,
}
