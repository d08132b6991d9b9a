use anyhow::{Context, Result};
use itertools::Itertools;
use serde::Serialize;
use std::path::Path;

use crate::storage::FundValue;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FirmAverage {
    pub firm_crd_nb: i64,
    pub avg_gross_asset_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopFund {
    pub firm_crd_nb: i64,
    pub fund_name: String,
    pub fund_id: String,
    pub gross_asset_value: i64,
    pub avg_gross_asset_value: Option<f64>,
}

/// Trims names and drops rows that cannot be ranked.
pub fn clean(values: Vec<FundValue>) -> Vec<FundValue> {
    values
        .into_iter()
        .map(|v| FundValue {
            fund_name: v.fund_name.trim().to_string(),
            fund_id: v.fund_id.trim().to_string(),
            ..v
        })
        .filter(|v| !v.fund_name.is_empty())
        .collect()
}

/// Largest funds first; ties keep their input order.
pub fn top_funds(values: &[FundValue], n: usize) -> Vec<FundValue> {
    values
        .iter()
        .sorted_by(|a, b| b.gross_asset_value.cmp(&a.gross_asset_value))
        .take(n)
        .cloned()
        .collect()
}

pub fn average_per_firm(values: &[FundValue]) -> Vec<FirmAverage> {
    values
        .iter()
        .into_group_map_by(|v| v.firm_crd_nb)
        .into_iter()
        .map(|(firm_crd_nb, funds)| FirmAverage {
            firm_crd_nb,
            avg_gross_asset_value: funds.iter().map(|f| f.gross_asset_value as f64).sum::<f64>()
                / funds.len() as f64,
        })
        .sorted_by_key(|avg| avg.firm_crd_nb)
        .collect()
}

pub fn top_with_firm_average(values: &[FundValue], n: usize) -> Vec<TopFund> {
    let averages = average_per_firm(values);
    top_funds(values, n)
        .into_iter()
        .map(|fund| TopFund {
            avg_gross_asset_value: averages
                .iter()
                .find(|avg| avg.firm_crd_nb == fund.firm_crd_nb)
                .map(|avg| avg.avg_gross_asset_value),
            firm_crd_nb: fund.firm_crd_nb,
            fund_name: fund.fund_name,
            fund_id: fund.fund_id,
            gross_asset_value: fund.gross_asset_value,
        })
        .collect()
}

pub fn write_report_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(firm: i64, name: &str, amount: i64) -> FundValue {
        FundValue {
            firm_crd_nb: firm,
            fund_name: name.to_string(),
            fund_id: format!("805-{}", amount),
            gross_asset_value: amount,
        }
    }

    fn sample() -> Vec<FundValue> {
        vec![
            value(160882, "Acme Fund", 300),
            value(160882, " Beta Fund ", 100),
            value(317731, "Gamma Fund", 500),
            value(317731, "   ", 900),
            value(160021, "Delta Fund", 50),
        ]
    }

    #[test]
    fn test_clean_drops_blank_names() {
        let cleaned = clean(sample());
        assert_eq!(cleaned.len(), 4);
        assert_eq!(cleaned[1].fund_name, "Beta Fund");
    }

    #[test]
    fn test_top_funds() {
        let cleaned = clean(sample());
        let names: Vec<_> = top_funds(&cleaned, 2)
            .into_iter()
            .map(|f| f.fund_name)
            .collect();
        assert_eq!(names, vec!["Gamma Fund", "Acme Fund"]);
        assert!(top_funds(&cleaned, 0).is_empty());
        assert_eq!(top_funds(&cleaned, 10).len(), 4);
    }

    #[test]
    fn test_average_per_firm() {
        let averages = average_per_firm(&clean(sample()));
        assert_eq!(
            averages,
            vec![
                FirmAverage { firm_crd_nb: 160021, avg_gross_asset_value: 50.0 },
                FirmAverage { firm_crd_nb: 160882, avg_gross_asset_value: 200.0 },
                FirmAverage { firm_crd_nb: 317731, avg_gross_asset_value: 500.0 },
            ]
        );
    }

    #[test]
    fn test_top_with_firm_average() {
        let joined = top_with_firm_average(&clean(sample()), 2);
        assert_eq!(joined[0].fund_name, "Gamma Fund");
        assert_eq!(joined[0].avg_gross_asset_value, Some(500.0));
        assert_eq!(joined[1].avg_gross_asset_value, Some(200.0));
    }

    #[test]
    fn test_write_report_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("top_funds_analysis.csv");
        write_report_csv(&path, &top_with_firm_average(&clean(sample()), 1)).unwrap();

        let csv = std::fs::read_to_string(&path).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("firm_crd_nb,fund_name,fund_id,gross_asset_value,avg_gross_asset_value")
        );
        assert_eq!(lines.next(), Some("317731,Gamma Fund,805-500,500,500.0"));
    }
}
