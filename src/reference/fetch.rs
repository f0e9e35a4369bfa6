//! One-time downloads of static reference files

use std::fs::{self, File};
use std::path::Path;

use crate::error::Result;

/// Download `url` to `path` unless `path` already exists
///
/// Returns `true` when a download happened. The body is streamed into a
/// `.part` sibling and renamed once complete. Failures are returned as-is;
/// nothing is retried.
pub fn download_once(url: &str, path: &Path) -> Result<bool> {
    if path.exists() {
        log::info!("{} already exists, skipping download", path.display());
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    log::info!("Downloading {} to {}...", url, path.display());
    let mut response = reqwest::blocking::get(url)?.error_for_status()?;

    let partial = path.with_extension("part");
    let mut file = File::create(&partial)?;
    let bytes = response.copy_to(&mut file)?;
    file.sync_all()?;
    fs::rename(&partial, path)?;

    log::info!("Downloaded {} bytes to {}", bytes, path.display());
    Ok(true)
}
