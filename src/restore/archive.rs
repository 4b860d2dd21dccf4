// restoretool/src/restore/archive.rs
use log::info;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::errors::RestoreError;

/// Derives the directory a downloaded archive unpacks into.
///
/// The backup producer names archives `<db>_<timestamp>.zip`, and the restore
/// side expects the contents next to the archive in a directory of the same
/// name minus the `.zip` suffix. That naming is an external contract with the
/// producing tool; keep it in this one place. A path without the suffix falls
/// back to dropping its final extension.
pub fn extraction_dir_for(archive_path: &Path) -> PathBuf {
    let raw = archive_path.to_string_lossy();
    match raw.strip_suffix(".zip") {
        Some(stripped) => PathBuf::from(stripped),
        None => archive_path.with_extension(""),
    }
}

/// Unpacks a downloaded zip archive into its derived extraction directory
/// and returns that directory. The directory is left behind after the
/// restore finishes.
pub fn extract_backup(archive_path: &Path) -> Result<PathBuf, RestoreError> {
    if !archive_path.is_file() {
        return Err(extraction_error(archive_path, "archive is not a file"));
    }

    let extract_to = extraction_dir_for(archive_path);
    info!(
        "extracting {} to {}",
        archive_path.display(),
        extract_to.display()
    );
    if !extract_to.exists() {
        std::fs::create_dir_all(&extract_to)?;
    }

    let archive_file = File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(archive_file)
        .map_err(|err| extraction_error(archive_path, &err.to_string()))?;
    archive
        .extract(&extract_to)
        .map_err(|err| extraction_error(archive_path, &err.to_string()))?;

    Ok(extract_to)
}

fn extraction_error(archive_path: &Path, message: &str) -> RestoreError {
    RestoreError::Extraction {
        path: archive_path.display().to_string(),
        message: message.to_string(),
    }
}
