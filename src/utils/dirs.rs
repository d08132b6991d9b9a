use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::core::config::IngestConfig;

pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("Failed to create directory {}", path.display()))?;
    Ok(())
}

pub fn ensure_data_dirs(config: &IngestConfig) -> Result<()> {
    ensure_dir(&config.data_dir)?;
    ensure_dir(&config.pdf_dir)?;
    if let Some(parent) = config.export_csv.as_deref().and_then(Path::parent) {
        if !parent.as_os_str().is_empty() {
            ensure_dir(parent)?;
        }
    }
    Ok(())
}
