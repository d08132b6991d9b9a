use anyhow::{Context, Result};
use indicatif::MultiProgress;
use reqwest::Client;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

use super::feed::{self, FeedFirm};
use super::parsing::{FilingExtraction, FilingProcessor};
use super::pdf::{PdfTextExtractor, TextExtractor};
use crate::core::config::IngestConfig;
use crate::fetch::{self, FetchManager, FetchResult, FetchTask};
use crate::storage::{FundStorage, PrivateFundRow};
use crate::utils::dirs::ensure_data_dirs;
use crate::utils::rate_limit::RateLimiter;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub firms_in_feed: usize,
    pub targets_found: usize,
    pub downloaded: usize,
    pub cached: usize,
    pub failed_downloads: usize,
    pub filings_processed: usize,
    pub funds_extracted: usize,
    pub rows_written: u64,
}

pub struct Ingestor {
    config: IngestConfig,
    client: Client,
    processor: Arc<FilingProcessor>,
    extractor: Arc<dyn TextExtractor>,
    multi_progress: Option<Arc<MultiProgress>>,
}

impl Ingestor {
    pub fn new(config: IngestConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            config,
            client,
            processor: Arc::new(FilingProcessor::default()),
            extractor: Arc::new(PdfTextExtractor),
            multi_progress: None,
        })
    }

    pub fn with_processor(mut self, processor: FilingProcessor) -> Self {
        self.processor = Arc::new(processor);
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_progress(mut self, multi_progress: Arc<MultiProgress>) -> Self {
        self.multi_progress = Some(multi_progress);
        self
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Feed → PDFs → extraction → merge → CSV/storage.
    pub async fn run(&self, storage: Option<&dyn FundStorage>) -> Result<IngestReport> {
        let started = Instant::now();
        ensure_data_dirs(&self.config)?;

        let mut report = IngestReport::default();

        let firms = feed::fetch_feed(&self.client, &self.config).await?;
        report.firms_in_feed = firms.len();

        let targets = feed::filter_targets(firms, &self.config.target_firms);
        report.targets_found = targets.len();
        for crd in &self.config.target_firms {
            if !targets.iter().any(|f| f.firm_crd_nb == *crd) {
                log::warn!("Firm {} is not listed in the feed", crd);
            }
        }

        let results = self.download_reports(&targets).await?;
        let (downloaded, cached, failed) = fetch::summarize(&results);
        report.downloaded = downloaded;
        report.cached = cached;
        report.failed_downloads = failed;
        log::info!(
            "Completed the download process in {:.2} minutes.",
            started.elapsed().as_secs_f64() / 60.0
        );

        if !self.config.process_data {
            log::info!("Data processing disabled; stopping after download");
            return Ok(report);
        }

        let extractions = self.process_filings(&self.config.target_firms).await;
        report.filings_processed = extractions.len();
        report.funds_extracted = extractions.iter().map(|e| e.funds.len()).sum();

        let rows = merge_with_feed(&extractions, &targets);
        log::info!("Merged {} fund rows", rows.len());

        if let Some(path) = &self.config.export_csv {
            write_rows_csv(path, &rows)?;
            log::info!("Merged rows written to {}", path.display());
        }

        if let Some(storage) = storage {
            storage.init().await?;
            report.rows_written = storage.insert_rows(&rows).await?;
        }

        log::info!("Data ingestion completed");
        Ok(report)
    }

    pub async fn download_reports(&self, firms: &[FeedFirm]) -> Result<Vec<FetchResult>> {
        let tasks = firms
            .iter()
            .map(|firm| {
                let url = feed::report_url(&self.config.report_base_url, firm.firm_crd_nb)?;
                Ok(FetchTask::firm_report(
                    firm.firm_crd_nb,
                    &url,
                    self.config.pdf_path(firm.firm_crd_nb),
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        let manager = FetchManager::new(
            self.client.clone(),
            &self.config.user_agent,
            RateLimiter::new(self.config.max_concurrent),
            self.multi_progress.clone(),
        );
        manager.execute_tasks(tasks).await
    }

    /// One blocking task per filing; results are ordered by firm id.
    pub async fn process_filings(&self, firm_ids: &[i64]) -> Vec<FilingExtraction> {
        let mut set = JoinSet::new();

        for &firm_id in firm_ids {
            let path = self.config.pdf_path(firm_id);
            let processor = Arc::clone(&self.processor);
            let extractor = Arc::clone(&self.extractor);

            set.spawn_blocking(move || match std::fs::read(&path) {
                Ok(pdf) => processor.process_document(firm_id, &pdf, extractor.as_ref()),
                Err(e) => {
                    log::error!("Error reading {}: {}", path.display(), e);
                    FilingExtraction::empty(firm_id)
                }
            });
        }

        let mut extractions = Vec::with_capacity(firm_ids.len());
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(extraction) => extractions.push(extraction),
                Err(e) => log::error!("Filing task failed: {}", e),
            }
        }

        extractions.sort_by_key(|e| e.profile.firm_id);
        extractions
    }
}

/// Left join of fund rows with feed metadata on the firm CRD number.
pub fn merge_with_feed(extractions: &[FilingExtraction], feed: &[FeedFirm]) -> Vec<PrivateFundRow> {
    let by_crd: HashMap<i64, &FeedFirm> = feed.iter().map(|f| (f.firm_crd_nb, f)).collect();

    extractions
        .iter()
        .flat_map(|extraction| {
            let firm = by_crd.get(&extraction.profile.firm_id).copied();
            extraction
                .rows()
                .into_iter()
                .map(move |row| PrivateFundRow::merge(row, firm))
        })
        .collect()
}

pub fn write_rows_csv(path: &Path, rows: &[PrivateFundRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
