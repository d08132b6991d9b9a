use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;

use super::policy::{last_signatory, SignatoryPolicy};
use super::types::{FilingText, ProfileField};

static ADDRESS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?is)Principal Office and Place of Business.*?",
        r"Number and Street 1:?\s*(.*?)\s*",
        r"Number and Street 2:?\s*(.*?)\s*",
        r"City:?\s*(.*?)\s*",
        r"State:?\s*(.*?)\s*",
        r"Country:?\s*(.*?)\s*",
        r"ZIP\+4/Postal Code:?\s*(\S+)",
    ))
    .expect("address pattern")
});

static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    // A parenthesized group must be followed by more digits, so a trailing
    // item number such as "(2)" is never taken as part of the number.
    Regex::new(concat!(
        r"(?i)Telephone number at this location:?\s*",
        r"(\+?(?:\d|\(\d+\)[ \t.\-]*\d)(?:[ \t.\-]*(?:\d|\(\d+\)[ \t.\-]*\d))*)",
    ))
    .expect("phone pattern")
});

static EMPLOYEES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)5\.B\.\(1\).*?how many.*?investment advisory functions.*?(\d+)")
        .expect("employee count pattern")
});

static SIGNATORY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Printed Name:\s*([A-Z][A-Za-z\s]+?)\s+Title:").expect("signatory pattern")
});

/// Collapses every whitespace run to a single space and trims.
pub fn clean_text(s: &str) -> String {
    s.split_whitespace().join(" ")
}

/// Recovers one firm-level field from filing text. A missing anchor is
/// `None`, never an error.
pub trait FieldRecognizer: Send + Sync {
    fn field(&self) -> ProfileField;

    fn recognize(&self, text: &FilingText) -> Option<String>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AddressRecognizer;

impl FieldRecognizer for AddressRecognizer {
    fn field(&self) -> ProfileField {
        ProfileField::Address
    }

    fn recognize(&self, text: &FilingText) -> Option<String> {
        let caps = ADDRESS_RE.captures(text.as_str())?;
        Some(
            (1..=6)
                .map(|i| caps.get(i).map_or(String::new(), |m| clean_text(m.as_str())))
                .join(", "),
        )
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PhoneRecognizer;

impl FieldRecognizer for PhoneRecognizer {
    fn field(&self) -> ProfileField {
        ProfileField::Phone
    }

    fn recognize(&self, text: &FilingText) -> Option<String> {
        PHONE_RE
            .captures(text.as_str())
            .and_then(|caps| caps.get(1))
            .map(|m| clean_text(m.as_str()))
    }
}

/// Item 5.B.(1) head count. Best-effort: the first digit run after the
/// question is taken, which can be an unrelated nearby number.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmployeeCountRecognizer;

impl FieldRecognizer for EmployeeCountRecognizer {
    fn field(&self) -> ProfileField {
        ProfileField::EmployeeCount
    }

    fn recognize(&self, text: &FilingText) -> Option<String> {
        EMPLOYEES_RE
            .captures(text.as_str())
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }
}

#[derive(Clone, Copy)]
pub struct SignatoryRecognizer {
    policy: SignatoryPolicy,
}

impl SignatoryRecognizer {
    pub fn with_policy(policy: SignatoryPolicy) -> Self {
        Self { policy }
    }

    /// All printed names in document order.
    pub fn candidates(text: &FilingText) -> Vec<String> {
        SIGNATORY_RE
            .captures_iter(text.as_str())
            .filter_map(|caps| caps.get(1))
            .map(|m| clean_text(m.as_str()))
            .collect()
    }
}

impl Default for SignatoryRecognizer {
    fn default() -> Self {
        Self::with_policy(last_signatory)
    }
}

impl FieldRecognizer for SignatoryRecognizer {
    fn field(&self) -> ProfileField {
        ProfileField::Signatory
    }

    fn recognize(&self, text: &FilingText) -> Option<String> {
        (self.policy)(&Self::candidates(text))
    }
}

pub fn default_recognizers(signatory: SignatoryPolicy) -> Vec<Box<dyn FieldRecognizer>> {
    vec![
        Box::new(AddressRecognizer),
        Box::new(PhoneRecognizer),
        Box::new(EmployeeCountRecognizer),
        Box::new(SignatoryRecognizer::with_policy(signatory)),
    ]
}
