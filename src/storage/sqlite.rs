use crate::storage::{FundStorage, FundValue, PrivateFund, PrivateFundRow, FUND_TABLE};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct SqliteConfig {
    pub url: String,
    pub max_connections: u32,
}

impl SqliteConfig {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            max_connections: 16,
        }
    }

    /// Private in-memory database; one connection so every query sees the same data.
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        }
    }
}

pub struct SqliteStorage {
    pool: Arc<SqlitePool>,
}

type FundTuple = (Option<String>, Option<String>, i64, Option<i64>);

fn to_fund((fund_id, fund_name, firm_crd_nb, value): FundTuple) -> PrivateFund {
    PrivateFund {
        fund_id: fund_id.unwrap_or_default(),
        fund_name: fund_name.unwrap_or_default(),
        firm_crd_nb,
        gross_asset_value: value.unwrap_or_default(),
    }
}

impl SqliteStorage {
    pub async fn connect(config: SqliteConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)
            .with_context(|| format!("Invalid SQLite URL: {}", config.url))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database {}", config.url))?;

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl FundStorage for SqliteStorage {
    async fn init(&self) -> Result<()> {
        let ddl = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                firm_crd_nb INTEGER,
                address TEXT,
                phone_number TEXT,
                compensation_arrangements TEXT,
                employee_count TEXT,
                client_aum_type TEXT,
                private_fund_name TEXT,
                private_fund_id TEXT,
                gross_asset_value INTEGER,
                signatory TEXT,
                sec_rgn_cd TEXT,
                sec_nb TEXT,
                bus_nm TEXT,
                legal_nm TEXT,
                umbr_rgstn TEXT,
                download_path TEXT
            )
            "#,
            FUND_TABLE
        );
        sqlx::query(&ddl).execute(&*self.pool).await?;
        Ok(())
    }

    async fn insert_rows(&self, rows: &[PrivateFundRow]) -> Result<u64> {
        let sql = format!(
            "INSERT INTO {} (firm_crd_nb, address, phone_number, compensation_arrangements, \
             employee_count, client_aum_type, private_fund_name, private_fund_id, \
             gross_asset_value, signatory, sec_rgn_cd, sec_nb, bus_nm, legal_nm, umbr_rgstn, \
             download_path) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            FUND_TABLE
        );

        let mut tx = self.pool.begin().await?;
        let mut written = 0;
        for row in rows {
            let value = i64::try_from(row.gross_asset_value).with_context(|| {
                format!("Gross asset value too large for fund {}", row.private_fund_id)
            })?;
            let result = sqlx::query(&sql)
                .bind(row.firm_crd_nb)
                .bind(&row.address)
                .bind(&row.phone_number)
                .bind(&row.compensation_arrangements)
                .bind(&row.employee_count)
                .bind(&row.client_aum_type)
                .bind(&row.private_fund_name)
                .bind(&row.private_fund_id)
                .bind(value)
                .bind(&row.signatory)
                .bind(&row.sec_rgn_cd)
                .bind(&row.sec_nb)
                .bind(&row.bus_nm)
                .bind(&row.legal_nm)
                .bind(&row.umbr_rgstn)
                .bind(&row.download_path)
                .execute(&mut *tx)
                .await?;
            written += result.rows_affected();
        }
        tx.commit().await?;

        Ok(written)
    }

    async fn funds_by_firm(&self, firm_crd_nb: i64) -> Result<Vec<PrivateFund>> {
        let sql = format!(
            "SELECT private_fund_id, private_fund_name, firm_crd_nb, gross_asset_value \
             FROM {} WHERE firm_crd_nb = ?",
            FUND_TABLE
        );
        let rows: Vec<FundTuple> = sqlx::query_as(&sql)
            .bind(firm_crd_nb)
            .fetch_all(&*self.pool)
            .await?;
        Ok(rows.into_iter().map(to_fund).collect())
    }

    async fn top_funds(&self, limit: u32) -> Result<Vec<PrivateFund>> {
        let sql = format!(
            "SELECT private_fund_id, private_fund_name, firm_crd_nb, gross_asset_value \
             FROM {} ORDER BY gross_asset_value DESC LIMIT ?",
            FUND_TABLE
        );
        let rows: Vec<FundTuple> = sqlx::query_as(&sql)
            .bind(i64::from(limit))
            .fetch_all(&*self.pool)
            .await?;
        Ok(rows.into_iter().map(to_fund).collect())
    }

    async fn fund_id_exists(&self, fund_id: &str) -> Result<bool> {
        let sql = format!("SELECT 1 FROM {} WHERE private_fund_id = ? LIMIT 1", FUND_TABLE);
        let row: Option<(i64,)> = sqlx::query_as(&sql)
            .bind(fund_id)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn add_fund(&self, fund: &PrivateFund) -> Result<()> {
        fund.validate()?;
        let sql = format!(
            "INSERT INTO {} (firm_crd_nb, private_fund_id, private_fund_name, gross_asset_value) \
             VALUES (?, ?, ?, ?)",
            FUND_TABLE
        );
        sqlx::query(&sql)
            .bind(fund.firm_crd_nb)
            .bind(&fund.fund_id)
            .bind(&fund.fund_name)
            .bind(fund.gross_asset_value)
            .execute(&*self.pool)
            .await?;
        Ok(())
    }

    async fn fund_values(&self) -> Result<Vec<FundValue>> {
        let sql = format!(
            "SELECT DISTINCT firm_crd_nb, private_fund_name, private_fund_id, gross_asset_value \
             FROM {} WHERE private_fund_name IS NOT NULL AND gross_asset_value IS NOT NULL",
            FUND_TABLE
        );
        let rows: Vec<(i64, String, Option<String>, i64)> =
            sqlx::query_as(&sql).fetch_all(&*self.pool).await?;

        Ok(rows
            .into_iter()
            .map(|(firm_crd_nb, fund_name, fund_id, gross_asset_value)| FundValue {
                firm_crd_nb,
                fund_name,
                fund_id: fund_id.unwrap_or_default(),
                gross_asset_value,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adv::parsing::{process_filing, FilingText};

    fn row(firm: i64, id: &str, name: &str, value: u64) -> PrivateFundRow {
        PrivateFundRow::manual(&PrivateFund {
            fund_id: id.to_string(),
            fund_name: name.to_string(),
            firm_crd_nb: firm,
            gross_asset_value: value as i64,
        })
        .unwrap()
    }

    async fn storage() -> SqliteStorage {
        let storage = SqliteStorage::connect(SqliteConfig::in_memory()).await.unwrap();
        storage.init().await.unwrap();
        storage
    }

    #[tokio::test]
    async fn test_insert_and_query() {
        let storage = storage().await;
        let written = storage
            .insert_rows(&[
                row(160882, "805-1", "Acme Fund", 250),
                row(160882, "805-2", "Beta Fund", 900),
                row(317731, "805-3", "Gamma Fund", 50),
            ])
            .await
            .unwrap();
        assert_eq!(written, 3);

        let funds = storage.funds_by_firm(160882).await.unwrap();
        assert_eq!(funds.len(), 2);
        assert!(storage.funds_by_firm(999999).await.unwrap().is_empty());

        let top = storage.top_funds(2).await.unwrap();
        let ids: Vec<_> = top.iter().map(|f| f.fund_id.as_str()).collect();
        assert_eq!(ids, vec!["805-2", "805-1"]);
        assert!(storage.top_funds(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_fund_and_exists() {
        let storage = storage().await;
        assert!(!storage.fund_id_exists("805-TEST12345").await.unwrap());

        storage
            .add_fund(&PrivateFund {
                fund_id: "805-TEST12345".to_string(),
                fund_name: "TEST FUND".to_string(),
                firm_crd_nb: 160882,
                gross_asset_value: 1_234_567,
            })
            .await
            .unwrap();

        assert!(storage.fund_id_exists("805-TEST12345").await.unwrap());
        let values = storage.fund_values().await.unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].gross_asset_value, 1_234_567);
    }

    #[tokio::test]
    async fn test_negative_value_is_rejected() {
        let storage = storage().await;
        let fund = PrivateFund {
            fund_id: "805-NEG".to_string(),
            fund_name: "NEGATIVE FUND".to_string(),
            firm_crd_nb: 160882,
            gross_asset_value: -1,
        };
        assert!(storage.add_fund(&fund).await.is_err());
        assert!(!storage.fund_id_exists("805-NEG").await.unwrap());
    }

    #[tokio::test]
    async fn test_unstorable_value_does_not_drop_batch() {
        let text = FilingText::new(format!(
            "SECTION 7.B.(1) Private Fund Reporting\n{}{}SECTION 7.B.(2) Private Fund Reporting\n",
            "1.(a)Name of the private fund:Small Fund\n(b)Private fund identification number:\n805-1\n\
             11.Current gross asset value of the private fund:$ 5\n",
            "1.(a)Name of the private fund:Huge Fund\n(b)Private fund identification number:\n805-2\n\
             11.Current gross asset value of the private fund:$ 10,000,000,000,000,000,000\n",
        ));
        let rows: Vec<_> = process_filing(160882, &text)
            .rows()
            .into_iter()
            .map(|row| PrivateFundRow::merge(row, None))
            .collect();
        assert_eq!(rows.len(), 1);

        let storage = storage().await;
        assert_eq!(storage.insert_rows(&rows).await.unwrap(), 1);
        let stored = storage.funds_by_firm(160882).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].fund_id, "805-1");
        assert_eq!(stored[0].gross_asset_value, 5);
    }

    #[tokio::test]
    async fn test_fund_values_are_distinct() {
        let storage = storage().await;
        let rows = vec![row(1, "805-1", "Acme Fund", 10), row(1, "805-1", "Acme Fund", 10)];
        storage.insert_rows(&rows).await.unwrap();

        assert_eq!(storage.fund_values().await.unwrap().len(), 1);
        assert_eq!(storage.funds_by_firm(1).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_init_is_idempotent() {
        let storage = storage().await;
        storage.init().await.unwrap();
    }
}
