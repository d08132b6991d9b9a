pub mod feed;
pub mod ingest;
pub mod parsing;
pub mod pdf;
pub mod utils;

pub use ingest::{IngestReport, Ingestor};
pub use parsing::{process_filing, FilingText};
