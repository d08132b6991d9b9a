use anyhow::{ensure, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::adv::feed::FeedFirm;
use crate::adv::parsing::FundRow;

pub const FUND_TABLE: &str = "private_fund_data";

/// A fund row merged with the firm's feed metadata, as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateFundRow {
    #[serde(rename = "FirmCrdNb")]
    pub firm_crd_nb: i64,
    #[serde(rename = "Address")]
    pub address: Option<String>,
    #[serde(rename = "Phone Number")]
    pub phone_number: Option<String>,
    #[serde(rename = "Compensation Arrangements")]
    pub compensation_arrangements: Option<String>,
    #[serde(rename = "Number of employees performing investment advisory functions")]
    pub employee_count: Option<String>,
    #[serde(rename = "Type of Client and Amount of Regulatory Assets Under Management")]
    pub client_aum_type: Option<String>,
    #[serde(rename = "Private Fund Name")]
    pub private_fund_name: String,
    #[serde(rename = "Private Fund ID")]
    pub private_fund_id: String,
    #[serde(rename = "Gross Asset Value")]
    pub gross_asset_value: u64,
    #[serde(rename = "Signatory")]
    pub signatory: Option<String>,
    #[serde(rename = "SECRgnCD")]
    pub sec_rgn_cd: Option<String>,
    #[serde(rename = "SECNb")]
    pub sec_nb: Option<String>,
    #[serde(rename = "BusNm")]
    pub bus_nm: Option<String>,
    #[serde(rename = "LegalNm")]
    pub legal_nm: Option<String>,
    #[serde(rename = "UmbrRgstn")]
    pub umbr_rgstn: Option<String>,
    #[serde(rename = "DownloadPath")]
    pub download_path: Option<String>,
}

impl PrivateFundRow {
    /// Left join: feed columns stay empty when the firm is not in the feed.
    pub fn merge(row: FundRow, feed: Option<&FeedFirm>) -> Self {
        Self {
            firm_crd_nb: row.firm_id,
            address: row.address,
            phone_number: row.phone,
            compensation_arrangements: row.compensation_arrangements,
            employee_count: row.employee_count,
            client_aum_type: row.client_aum_type,
            private_fund_name: row.fund_name,
            private_fund_id: row.fund_id,
            gross_asset_value: row.gross_asset_value,
            signatory: row.signatory,
            sec_rgn_cd: feed.and_then(|f| f.sec_rgn_cd.clone()),
            sec_nb: feed.and_then(|f| f.sec_nb.clone()),
            bus_nm: feed.and_then(|f| f.bus_nm.clone()),
            legal_nm: feed.and_then(|f| f.legal_nm.clone()),
            umbr_rgstn: feed.and_then(|f| f.umbr_rgstn.clone()),
            download_path: feed.and_then(|f| f.download_path.clone()),
        }
    }

    /// A manually added fund carries no firm profile or feed metadata.
    pub fn manual(fund: &PrivateFund) -> Result<Self> {
        fund.validate()?;
        Ok(Self {
            firm_crd_nb: fund.firm_crd_nb,
            address: None,
            phone_number: None,
            compensation_arrangements: None,
            employee_count: None,
            client_aum_type: None,
            private_fund_name: fund.fund_name.clone(),
            private_fund_id: fund.fund_id.clone(),
            gross_asset_value: u64::try_from(fund.gross_asset_value)?,
            signatory: None,
            sec_rgn_cd: None,
            sec_nb: None,
            bus_nm: None,
            legal_nm: None,
            umbr_rgstn: None,
            download_path: None,
        })
    }

    pub fn to_fund(&self) -> PrivateFund {
        PrivateFund {
            fund_id: self.private_fund_id.clone(),
            fund_name: self.private_fund_name.clone(),
            firm_crd_nb: self.firm_crd_nb,
            gross_asset_value: i64::try_from(self.gross_asset_value).unwrap_or(i64::MAX),
        }
    }
}

/// API view of one fund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateFund {
    #[serde(rename = "Private_Fund_ID")]
    pub fund_id: String,
    #[serde(rename = "Private_Fund_Name")]
    pub fund_name: String,
    #[serde(rename = "FirmCrdNb")]
    pub firm_crd_nb: i64,
    #[serde(rename = "Gross_Asset_Value")]
    pub gross_asset_value: i64,
}

impl PrivateFund {
    /// Every backend rejects a negative value before storing it.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.gross_asset_value >= 0,
            "Gross asset value must be non-negative for fund {}",
            self.fund_id
        );
        Ok(())
    }
}

/// Distinct `(firm, fund, value)` tuple used by the analytics report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundValue {
    pub firm_crd_nb: i64,
    pub fund_name: String,
    pub fund_id: String,
    pub gross_asset_value: i64,
}

/// Core trait implemented by all fund storage backends
#[async_trait]
pub trait FundStorage: Send + Sync {
    /// Create the fund table if it does not exist yet
    async fn init(&self) -> Result<()>;

    /// Append rows, returning how many were written
    async fn insert_rows(&self, rows: &[PrivateFundRow]) -> Result<u64>;

    async fn funds_by_firm(&self, firm_crd_nb: i64) -> Result<Vec<PrivateFund>>;

    /// Largest funds first
    async fn top_funds(&self, limit: u32) -> Result<Vec<PrivateFund>>;

    async fn fund_id_exists(&self, fund_id: &str) -> Result<bool>;

    async fn add_fund(&self, fund: &PrivateFund) -> Result<()>;

    async fn fund_values(&self) -> Result<Vec<FundValue>>;
}

pub mod memory;
pub mod sqlite;

pub use self::memory::InMemoryStorage;
pub use self::sqlite::{SqliteConfig, SqliteStorage};
