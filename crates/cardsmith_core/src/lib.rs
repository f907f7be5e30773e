pub mod batch;
pub mod csv_import;
pub mod domain;
pub mod pipeline;
pub mod ports;
pub mod templates;

pub use batch::{run_batch, BatchError, BatchPhase, BatchSession, TrialCounter, TRIAL_LIMIT};
pub use csv_import::{parse_contacts, parse_headers, suggest_mapping, ColumnMapping, ImportError};
pub use domain::{
    AccountProfile, AgencyConfig, BatchFailure, BatchOutcome, BrandKit, Contact, GeneratedCard,
    PromptTemplate,
};
pub use ports::{
    AccountLedger, AccountUpsert, AgencyConfigStore, ImageFetcher, ImageGenerationService,
    LedgerAccount, PortError, PortResult,
};
