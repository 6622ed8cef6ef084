//! Input discovery
//!
//! Resolves `--folder` / `--file` selections into the ordered list of local
//! tracks to process.

use crate::error::{Result, StemmixError};
use crate::types::AudioFormat;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Scan a folder (not its subfolders) for MP3 files, sorted by path
pub fn scan_folder(folder: &Path) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(StemmixError::FileNotFound(folder.to_path_buf()));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(folder)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && is_mp3(p))
        .inspect(|p| debug!("Discovered: {}", p.display()))
        .collect();
    files.sort();

    info!("Found {} MP3 files in folder '{}'", files.len(), folder.display());
    if files.is_empty() {
        warn!("No MP3 files found in {}", folder.display());
    }

    Ok(files)
}

fn is_mp3(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(AudioFormat::from_extension)
        == Some(AudioFormat::Mp3)
}

/// Resolve the local inputs of a run
///
/// A folder and explicit files are mutually exclusive. Every explicit file
/// must exist; a folder must contain at least one MP3.
pub fn collect_inputs(folder: Option<&Path>, files: &[PathBuf]) -> Result<Vec<PathBuf>> {
    match (folder, files.is_empty()) {
        (Some(_), false) => Err(StemmixError::ConfigError(
            "Cannot use both --folder and --file arguments together".to_string(),
        )),
        (Some(folder), true) => {
            let found = scan_folder(folder)?;
            if found.is_empty() {
                return Err(StemmixError::ConfigError(format!(
                    "No MP3 files found in folder '{}'",
                    folder.display()
                )));
            }
            Ok(found)
        }
        (None, _) => {
            if let Some(missing) = files.iter().find(|f| !f.is_file()) {
                return Err(StemmixError::FileNotFound(missing.clone()));
            }
            if let Some(unsupported) = files.iter().find(|f| !AudioFormat::is_supported_path(f)) {
                return Err(StemmixError::UnsupportedFormat {
                    path: unsupported.clone(),
                    format: unsupported
                        .extension()
                        .map(|e| e.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "no extension".to_string()),
                });
            }
            if !files.is_empty() {
                info!("Processing {} individual files", files.len());
            }
            Ok(files.to_vec())
        }
    }
}
