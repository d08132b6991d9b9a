use anyhow::Result;
use indicatif::MultiProgress;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use url::Url;

use crate::adv::utils::fetch_and_save;
use crate::utils::progress::ProgressTracker;
use crate::utils::rate_limit::RateLimiter;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FetchTask {
    FirmReport {
        firm_crd_nb: i64,
        url: String,
        output_path: PathBuf,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResult {
    pub task: FetchTask,
    pub status: FetchStatus,
    pub output_path: Option<PathBuf>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FetchStatus {
    Success,
    Failed,
    /// Already cached on disk.
    Skipped,
}

impl FetchTask {
    pub fn firm_report(firm_crd_nb: i64, url: &Url, output_path: PathBuf) -> Self {
        FetchTask::FirmReport {
            firm_crd_nb,
            url: url.to_string(),
            output_path,
        }
    }

    pub fn name(&self) -> String {
        match self {
            FetchTask::FirmReport { firm_crd_nb, .. } => format!("{}.pdf", firm_crd_nb),
        }
    }

    /// Never returns an error for a failed download: failures are reported
    /// in the result so the rest of the batch keeps going.
    pub async fn execute(
        &self,
        client: &Client,
        user_agent: &str,
        progress: &ProgressTracker,
    ) -> FetchResult {
        match self {
            FetchTask::FirmReport {
                url, output_path, ..
            } => {
                progress.update_message("Downloading...");
                let outcome = match Url::parse(url) {
                    Ok(url) => fetch_and_save(client, &url, output_path, user_agent).await,
                    Err(e) => Err(e.into()),
                };

                match outcome {
                    Ok(downloaded) => FetchResult {
                        task: self.clone(),
                        status: if downloaded {
                            FetchStatus::Success
                        } else {
                            FetchStatus::Skipped
                        },
                        output_path: Some(output_path.clone()),
                        error: None,
                    },
                    Err(e) => {
                        log::error!("Failed to download {}: {:#}", self.name(), e);
                        FetchResult {
                            task: self.clone(),
                            status: FetchStatus::Failed,
                            output_path: None,
                            error: Some(e.to_string()),
                        }
                    }
                }
            }
        }
    }
}

pub struct FetchManager {
    client: Client,
    user_agent: String,
    rate_limiter: RateLimiter,
    multi_progress: Option<Arc<MultiProgress>>,
}

impl FetchManager {
    pub fn new(
        client: Client,
        user_agent: &str,
        rate_limiter: RateLimiter,
        multi_progress: Option<Arc<MultiProgress>>,
    ) -> Self {
        Self {
            client,
            user_agent: user_agent.to_string(),
            rate_limiter,
            multi_progress,
        }
    }

    pub async fn execute_tasks(&self, tasks: Vec<FetchTask>) -> Result<Vec<FetchResult>> {
        let (tx, mut rx) = mpsc::channel(tasks.len().max(1));
        let mut handles = Vec::with_capacity(tasks.len());

        for task in tasks {
            let tx = tx.clone();
            let client = self.client.clone();
            let user_agent = self.user_agent.clone();
            let limiter = self.rate_limiter.clone();
            let progress = ProgressTracker::new(self.multi_progress.as_ref(), &task.name());

            let handle = tokio::spawn(async move {
                let _permit = limiter.acquire().await?;
                let result = task.execute(&client, &user_agent, &progress).await;
                progress.finish(match result.status {
                    FetchStatus::Success => "✓",
                    FetchStatus::Failed => "✗",
                    FetchStatus::Skipped => "-",
                });
                tx.send(result)
                    .await
                    .map_err(|_| anyhow::anyhow!("Fetch result channel closed"))
            });
            handles.push(handle);
        }

        drop(tx);

        let mut results = Vec::with_capacity(handles.len());
        while let Some(result) = rx.recv().await {
            results.push(result);
        }

        for handle in handles {
            handle.await??;
        }

        Ok(results)
    }
}

pub fn summarize(results: &[FetchResult]) -> (usize, usize, usize) {
    results.iter().fold((0, 0, 0), |(ok, cached, failed), r| match r.status {
        FetchStatus::Success => (ok + 1, cached, failed),
        FetchStatus::Skipped => (ok, cached + 1, failed),
        FetchStatus::Failed => (ok, cached, failed + 1),
    })
}
