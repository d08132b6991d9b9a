pub mod fields;
pub mod filing;
pub mod funds;
pub mod policy;
pub mod types;

pub use fields::{clean_text, FieldRecognizer};
pub use filing::{process_document, process_filing, FilingProcessor};
pub use funds::{extract_raw_funds, parse_asset_value, private_fund_section, MAX_ASSET_VALUE};
pub use policy::{dedup_funds, last_signatory, max_value, ExtractionPolicy};
pub use types::{FilingExtraction, FilingText, FirmProfile, FundRow, PrivateFundRecord, ProfileField};
