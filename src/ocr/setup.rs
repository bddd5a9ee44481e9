//! Locating the Tesseract executable and its language data.

use anyhow::{anyhow, bail, Context, Result};
use log::{debug, info};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use crate::paths;

const TESSDATA_REPO: &str = "https://github.com/tesseract-ocr/tessdata/raw/main";
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

#[cfg(windows)]
const COMMON_EXECUTABLES: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR\tesseract.exe",
    r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
];

#[cfg(not(windows))]
const COMMON_EXECUTABLES: &[&str] = &[
    "/usr/bin/tesseract",
    "/usr/local/bin/tesseract",
    "/opt/homebrew/bin/tesseract",
];

/// Finds the Tesseract executable: the configured path, then `tesseract`
/// on PATH, then common install locations.
pub fn find_tesseract_executable(configured: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        bail!("Configured Tesseract executable not found: {}", path.display());
    }

    if responds_to_version(Path::new("tesseract")) {
        return Ok(PathBuf::from("tesseract"));
    }

    COMMON_EXECUTABLES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
        .ok_or_else(|| {
            anyhow!("Tesseract not found. Install Tesseract-OCR or set tesseract.executable in the config.")
        })
}

fn responds_to_version(executable: &Path) -> bool {
    Command::new(executable)
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Returns the tessdata directory to pass to Tesseract, if any.
///
/// The configured directory wins. With downloads enabled the per-user cache
/// is used. Otherwise Tesseract's own default (or `TESSDATA_PREFIX`) applies.
pub fn tessdata_dir(configured: Option<&Path>, download_missing: bool) -> Option<PathBuf> {
    match configured {
        Some(dir) => Some(dir.to_path_buf()),
        None if download_missing => Some(paths::tessdata_cache_dir()),
        None => None,
    }
}

/// Ensures every language in `language` (e.g. "eng+deu") has a
/// `.traineddata` file in `dir`, downloading the missing ones.
pub fn ensure_traineddata(dir: &Path, language: &str) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create tessdata directory {}", dir.display()))?;

    for code in language.split('+').map(str::trim).filter(|c| !c.is_empty()) {
        let target = traineddata_path(dir, code);
        if target.exists() {
            debug!("{} present at {}", code, target.display());
            continue;
        }
        download_traineddata(code, &target)?;
    }
    Ok(())
}

pub fn traineddata_path(dir: &Path, code: &str) -> PathBuf {
    dir.join(format!("{}.traineddata", code))
}

fn download_traineddata(code: &str, target: &Path) -> Result<()> {
    let url = format!("{}/{}.traineddata", TESSDATA_REPO, code);
    info!("Downloading {}.traineddata...", code);

    let client = reqwest::blocking::Client::builder()
        .timeout(DOWNLOAD_TIMEOUT)
        .build()?;

    let response = client
        .get(&url)
        .header("User-Agent", "ocr-string-validator")
        .send()
        .with_context(|| format!("Failed to request {}", url))?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "Failed to download {}.traineddata: HTTP {}",
            code,
            response.status()
        ));
    }

    let bytes = response.bytes()?;
    let mut file = fs::File::create(target)
        .with_context(|| format!("Failed to create {}", target.display()))?;
    file.write_all(&bytes)?;

    info!("Downloaded {}.traineddata ({} bytes)", code, bytes.len());
    Ok(())
}
