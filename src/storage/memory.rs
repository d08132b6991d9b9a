use crate::storage::{FundStorage, FundValue, PrivateFund, PrivateFundRow};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use itertools::Itertools;
use std::sync::RwLock;

/// Process-local store for tests and dry runs.
#[derive(Default)]
pub struct InMemoryStorage {
    rows: RwLock<Vec<PrivateFundRow>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<PrivateFundRow>) -> Self {
        Self {
            rows: RwLock::new(rows),
        }
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Vec<PrivateFundRow>>> {
        self.rows.read().map_err(|_| anyhow!("fund store lock poisoned"))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Vec<PrivateFundRow>>> {
        self.rows.write().map_err(|_| anyhow!("fund store lock poisoned"))
    }
}

#[async_trait]
impl FundStorage for InMemoryStorage {
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    async fn insert_rows(&self, rows: &[PrivateFundRow]) -> Result<u64> {
        self.write()?.extend_from_slice(rows);
        Ok(rows.len() as u64)
    }

    async fn funds_by_firm(&self, firm_crd_nb: i64) -> Result<Vec<PrivateFund>> {
        Ok(self
            .read()?
            .iter()
            .filter(|row| row.firm_crd_nb == firm_crd_nb)
            .map(PrivateFundRow::to_fund)
            .collect())
    }

    async fn top_funds(&self, limit: u32) -> Result<Vec<PrivateFund>> {
        Ok(self
            .read()?
            .iter()
            .sorted_by(|a, b| b.gross_asset_value.cmp(&a.gross_asset_value))
            .take(limit as usize)
            .map(PrivateFundRow::to_fund)
            .collect())
    }

    async fn fund_id_exists(&self, fund_id: &str) -> Result<bool> {
        Ok(self.read()?.iter().any(|row| row.private_fund_id == fund_id))
    }

    async fn add_fund(&self, fund: &PrivateFund) -> Result<()> {
        let row = PrivateFundRow::manual(fund)?;
        self.write()?.push(row);
        Ok(())
    }

    async fn fund_values(&self) -> Result<Vec<FundValue>> {
        Ok(self
            .read()?
            .iter()
            .map(|row| FundValue {
                firm_crd_nb: row.firm_crd_nb,
                fund_name: row.private_fund_name.clone(),
                fund_id: row.private_fund_id.clone(),
                gross_asset_value: i64::try_from(row.gross_asset_value).unwrap_or(i64::MAX),
            })
            .unique_by(|v| {
                (
                    v.firm_crd_nb,
                    v.fund_name.clone(),
                    v.fund_id.clone(),
                    v.gross_asset_value,
                )
            })
            .collect())
    }
}
