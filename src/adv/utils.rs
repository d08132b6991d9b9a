use anyhow::{anyhow, Result};
use reqwest::Client;
use std::path::Path;
use url::Url;

pub async fn fetch_bytes(client: &Client, url: &Url, user_agent: &str) -> Result<Vec<u8>> {
    log::debug!("Fetching URL: {}", url);

    let response = client
        .get(url.as_str())
        .header(reqwest::header::USER_AGENT, user_agent)
        .send()
        .await?;

    log::debug!("Response status: {}", response.status());

    if !response.status().is_success() {
        return Err(anyhow!(
            "HTTP request for {} failed with status: {}",
            url,
            response.status()
        ));
    }

    let expected = response.content_length();
    let content = response.bytes().await?;
    log::debug!("Received content length: {}", content.len());

    if let Some(length) = expected {
        if length as usize != content.len() {
            return Err(anyhow!(
                "Content length mismatch: expected {} bytes but received {} bytes",
                length,
                content.len()
            ));
        }
    }

    Ok(content.to_vec())
}

/// Downloads `url` into `filepath` unless the file is already cached.
/// Returns `true` when a download happened.
pub async fn fetch_and_save(
    client: &Client,
    url: &Url,
    filepath: &Path,
    user_agent: &str,
) -> Result<bool> {
    if filepath.is_file() {
        log::info!("File {} already exists. Skipping download.", filepath.display());
        return Ok(false);
    }

    let content = fetch_bytes(client, url, user_agent).await?;

    if let Some(parent) = filepath.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    // Write under a temporary name so an interrupted download is never taken for a cache hit.
    let partial = filepath.with_extension("part");
    tokio::fs::write(&partial, &content).await?;
    tokio::fs::rename(&partial, filepath).await?;
    log::info!("Downloaded {}", filepath.display());

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cached_file_is_not_fetched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("160882.pdf");
        std::fs::write(&path, b"%PDF-cached").unwrap();

        // Unroutable URL: any network attempt would fail the test.
        let url = Url::parse("http://127.0.0.1:9/160882.pdf").unwrap();
        let downloaded = fetch_and_save(&Client::new(), &url, &path, "test@example.com")
            .await
            .unwrap();

        assert!(!downloaded);
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-cached");
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("1.pdf");
        let url = Url::parse("http://127.0.0.1:9/1.pdf").unwrap();

        assert!(fetch_and_save(&Client::new(), &url, &path, "test@example.com")
            .await
            .is_err());
        assert!(!path.exists());
    }
}
