use super::fields::{default_recognizers, FieldRecognizer};
use super::funds::extract_raw_funds;
use super::policy::{dedup_funds, ExtractionPolicy};
use super::types::{FilingExtraction, FilingText, FirmProfile};
use crate::adv::pdf::TextExtractor;

/// Runs the field recognizers and the private fund extraction over one
/// filing. Holds no state between filings.
pub struct FilingProcessor {
    recognizers: Vec<Box<dyn FieldRecognizer>>,
    policy: ExtractionPolicy,
}

impl Default for FilingProcessor {
    fn default() -> Self {
        Self::with_policy(ExtractionPolicy::default())
    }
}

impl FilingProcessor {
    pub fn with_policy(policy: ExtractionPolicy) -> Self {
        Self {
            recognizers: default_recognizers(policy.signatory),
            policy,
        }
    }

    /// Replaces the recognizer registered for the same field.
    pub fn with_recognizer(mut self, recognizer: Box<dyn FieldRecognizer>) -> Self {
        self.recognizers.retain(|r| r.field() != recognizer.field());
        self.recognizers.push(recognizer);
        self
    }

    pub fn profile(&self, firm_id: i64, text: &FilingText) -> FirmProfile {
        let mut profile = FirmProfile::empty(firm_id);
        for recognizer in &self.recognizers {
            let value = recognizer.recognize(text);
            if value.is_none() {
                log::debug!("Firm {}: no {} found", firm_id, recognizer.field());
            }
            profile.set(recognizer.field(), value);
        }
        profile
    }

    pub fn process(&self, firm_id: i64, text: &FilingText) -> FilingExtraction {
        let profile = self.profile(firm_id, text);
        let funds = dedup_funds(extract_raw_funds(text), self.policy.fund_value);
        log::debug!("Firm {}: {} private funds", firm_id, funds.len());
        FilingExtraction { profile, funds }
    }

    /// Extracts the PDF text first. An unreadable document yields an empty
    /// extraction so that one bad filing never stops a batch.
    pub fn process_document(
        &self,
        firm_id: i64,
        pdf: &[u8],
        extractor: &dyn TextExtractor,
    ) -> FilingExtraction {
        match extractor.extract_text(pdf) {
            Ok(raw) => self.process(firm_id, &FilingText::new(raw)),
            Err(e) => {
                log::warn!("Firm {}: could not extract PDF text: {:#}", firm_id, e);
                FilingExtraction::empty(firm_id)
            }
        }
    }
}

pub fn process_filing(firm_id: i64, text: &FilingText) -> FilingExtraction {
    FilingProcessor::default().process(firm_id, text)
}

pub fn process_document(
    firm_id: i64,
    pdf: &[u8],
    extractor: &dyn TextExtractor,
) -> FilingExtraction {
    FilingProcessor::default().process_document(firm_id, pdf, extractor)
}
