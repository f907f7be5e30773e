pub mod agency;
pub mod crm;
pub mod fetch;
pub mod gemini;

pub use agency::InMemoryAgencyStore;
pub use crm::GhlLedgerAdapter;
pub use fetch::HttpImageFetcher;
pub use gemini::GeminiImageAdapter;
