pub mod adv;
pub mod analytics;
pub mod api;
pub mod core;
pub mod fetch;
pub mod storage;
pub mod utils;

// Re-exports
pub use adv::parsing::{process_document, process_filing, FilingExtraction, FilingText};
pub use self::core::config::IngestConfig;
