use serde::{Deserialize, Serialize};
use strum::Display;
use unicode_normalization::char::decompose_compatible;

/// Linear text of one firm's Form ADV filing, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilingText(String);

impl FilingText {
    /// Wraps extractor output. Only the Latin ligatures PDF fonts emit
    /// (U+FB00..U+FB06) and no-break spaces are folded, so anchors match while
    /// fund names keep every other character as reported.
    pub fn new(raw: impl AsRef<str>) -> Self {
        let raw = raw.as_ref();
        let mut text = String::with_capacity(raw.len());
        for c in raw.chars() {
            match c {
                '\u{FB00}'..='\u{FB06}' => decompose_compatible(c, |d| text.push(d)),
                '\u{00A0}' => text.push(' '),
                _ => text.push(c),
            }
        }
        Self(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<&str> for FilingText {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for FilingText {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ProfileField {
    Address,
    Phone,
    EmployeeCount,
    Signatory,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmProfile {
    pub firm_id: i64,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub employee_count: Option<String>,
    pub signatory: Option<String>,
}

impl FirmProfile {
    pub fn empty(firm_id: i64) -> Self {
        Self {
            firm_id,
            ..Default::default()
        }
    }

    pub fn get(&self, field: ProfileField) -> Option<&str> {
        match field {
            ProfileField::Address => self.address.as_deref(),
            ProfileField::Phone => self.phone.as_deref(),
            ProfileField::EmployeeCount => self.employee_count.as_deref(),
            ProfileField::Signatory => self.signatory.as_deref(),
        }
    }

    pub fn set(&mut self, field: ProfileField, value: Option<String>) {
        match field {
            ProfileField::Address => self.address = value,
            ProfileField::Phone => self.phone = value,
            ProfileField::EmployeeCount => self.employee_count = value,
            ProfileField::Signatory => self.signatory = value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrivateFundRecord {
    pub name: String,
    pub fund_id: String,
    pub gross_asset_value: u64,
}

impl PrivateFundRecord {
    pub fn key(&self) -> (&str, &str) {
        (&self.name, &self.fund_id)
    }
}

/// One materialized output row: the firm profile repeated for each fund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundRow {
    pub firm_id: i64,
    pub address: Option<String>,
    pub phone: Option<String>,
    /// Not derived from the PDF text; always empty.
    pub compensation_arrangements: Option<String>,
    pub employee_count: Option<String>,
    /// Not derived from the PDF text; always empty.
    pub client_aum_type: Option<String>,
    pub fund_name: String,
    pub fund_id: String,
    pub gross_asset_value: u64,
    pub signatory: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingExtraction {
    pub profile: FirmProfile,
    pub funds: Vec<PrivateFundRecord>,
}

impl FilingExtraction {
    pub fn empty(firm_id: i64) -> Self {
        Self {
            profile: FirmProfile::empty(firm_id),
            funds: Vec::new(),
        }
    }

    pub fn rows(&self) -> Vec<FundRow> {
        self.funds
            .iter()
            .map(|fund| FundRow {
                firm_id: self.profile.firm_id,
                address: self.profile.address.clone(),
                phone: self.profile.phone.clone(),
                compensation_arrangements: None,
                employee_count: self.profile.employee_count.clone(),
                client_aum_type: None,
                fund_name: fund.name.clone(),
                fund_id: fund.fund_id.clone(),
                gross_asset_value: fund.gross_asset_value,
                signatory: self.profile.signatory.clone(),
            })
            .collect()
    }
}
