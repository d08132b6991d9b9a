use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use std::path::PathBuf;
use url::Url;

pub const DEFAULT_FEED_BASE_URL: &str =
    "https://reports.adviserinfo.sec.gov/reports/CompilationReports/";
pub const DEFAULT_REPORT_BASE_URL: &str = "https://reports.adviserinfo.sec.gov/reports/ADV/";
pub const DEFAULT_TARGET_FIRMS: [i64; 3] = [160882, 160021, 317731];

#[derive(Clone, Debug)]
pub struct IngestConfig {
    pub database_url: String,
    /// Date of the compiled feed to download.
    pub working_date: NaiveDate,
    pub target_firms: Vec<i64>,
    /// When false only the feed and PDFs are downloaded.
    pub process_data: bool,
    pub data_dir: PathBuf,
    pub pdf_dir: PathBuf,
    pub feed_base_url: Url,
    pub report_base_url: Url,
    pub user_agent: String,
    pub max_concurrent: usize,
    pub export_csv: Option<PathBuf>,
    pub bind_addr: String,
}

impl IngestConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url =
            lookup("DATABASE_URL").unwrap_or_else(|| "sqlite://private_funds.db".to_string());

        let working_date = match lookup("FORMADV_WORKING_DATE") {
            Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                .with_context(|| format!("FORMADV_WORKING_DATE is not a YYYY-MM-DD date: {}", raw))?,
            None => NaiveDate::from_ymd_opt(2025, 4, 24)
                .ok_or_else(|| anyhow!("invalid default working date"))?,
        };

        let target_firms = match lookup("FORMADV_TARGET_FIRMS") {
            Some(raw) => parse_firm_list(&raw)?,
            None => DEFAULT_TARGET_FIRMS.to_vec(),
        };

        let process_data = match lookup("FORMADV_PROCESS_DATA") {
            Some(raw) => parse_flag(&raw)
                .ok_or_else(|| anyhow!("FORMADV_PROCESS_DATA must be true or false, got {}", raw))?,
            None => true,
        };

        let data_dir = PathBuf::from(lookup("FORMADV_DATA_DIR").unwrap_or_else(|| "data".to_string()));
        let pdf_dir = lookup("FORMADV_PDF_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("source_pdf"));

        let feed_base_url = Url::parse(
            &lookup("FORMADV_FEED_BASE_URL").unwrap_or_else(|| DEFAULT_FEED_BASE_URL.to_string()),
        )
        .context("FORMADV_FEED_BASE_URL is not a valid URL")?;
        let report_base_url = Url::parse(
            &lookup("FORMADV_REPORT_BASE_URL")
                .unwrap_or_else(|| DEFAULT_REPORT_BASE_URL.to_string()),
        )
        .context("FORMADV_REPORT_BASE_URL is not a valid URL")?;

        let user_agent =
            lookup("FORMADV_USER_AGENT").unwrap_or_else(|| "software@example.com".to_string());

        let max_concurrent = match lookup("FORMADV_MAX_CONCURRENT") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| anyhow!("FORMADV_MAX_CONCURRENT must be a positive integer"))?,
            None => 10,
        };

        let export_csv = match lookup("FORMADV_EXPORT_CSV") {
            Some(raw) if raw.trim().is_empty() => None,
            Some(raw) => Some(PathBuf::from(raw)),
            None => Some(data_dir.join("merged_data.csv")),
        };

        let bind_addr = lookup("FORMADV_BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8000".to_string());

        Ok(Self {
            database_url,
            working_date,
            target_firms,
            process_data,
            data_dir,
            pdf_dir,
            feed_base_url,
            report_base_url,
            user_agent,
            max_concurrent,
            export_csv,
            bind_addr,
        })
    }

    pub fn pdf_path(&self, firm_crd_nb: i64) -> PathBuf {
        self.pdf_dir.join(format!("{}.pdf", firm_crd_nb))
    }
}

/// Comma or whitespace separated CRD numbers.
pub fn parse_firm_list(raw: &str) -> Result<Vec<i64>> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| anyhow!("Invalid firm CRD number: {}", s))
        })
        .collect()
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<IngestConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        IngestConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.working_date, NaiveDate::from_ymd_opt(2025, 4, 24).unwrap());
        assert_eq!(config.target_firms, vec![160882, 160021, 317731]);
        assert!(config.process_data);
        assert_eq!(config.pdf_path(160882), PathBuf::from("data/source_pdf/160882.pdf"));
        assert_eq!(config.export_csv, Some(PathBuf::from("data/merged_data.csv")));
        assert_eq!(config.max_concurrent, 10);
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("FORMADV_WORKING_DATE", "2024-12-31"),
            ("FORMADV_TARGET_FIRMS", "1, 2 3"),
            ("FORMADV_PROCESS_DATA", "no"),
            ("FORMADV_PDF_DIR", "/tmp/pdfs"),
            ("FORMADV_EXPORT_CSV", ""),
        ])
        .unwrap();
        assert_eq!(config.working_date, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        assert_eq!(config.target_firms, vec![1, 2, 3]);
        assert!(!config.process_data);
        assert_eq!(config.pdf_path(2), PathBuf::from("/tmp/pdfs/2.pdf"));
        assert_eq!(config.export_csv, None);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(config(&[("FORMADV_WORKING_DATE", "04/24/2025")]).is_err());
        assert!(config(&[("FORMADV_TARGET_FIRMS", "160882,abc")]).is_err());
        assert!(config(&[("FORMADV_PROCESS_DATA", "maybe")]).is_err());
        assert!(config(&[("FORMADV_MAX_CONCURRENT", "0")]).is_err());
    }
}
