use crate::infrastructure::error::InfraError;
use chrono::NaiveDateTime;
use std::fs;
use std::path::{Path, PathBuf};

/// `<app>_backup_<YYYY-MM-DD>_<HHMM>.json`, from a local wall-clock time.
pub fn backup_file_name(app_name: &str, local_now: NaiveDateTime) -> String {
    format!(
        "{}_backup_{}.json",
        app_name.trim(),
        local_now.format("%Y-%m-%d_%H%M")
    )
}

pub fn write_backup(
    dir: &Path,
    file_name: &str,
    document: &serde_json::Map<String, serde_json::Value>,
) -> Result<PathBuf, InfraError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(file_name);
    let formatted = serde_json::to_string(document)?;
    fs::write(&path, formatted)?;
    Ok(path)
}

pub fn read_backup(path: &Path) -> Result<String, InfraError> {
    Ok(fs::read_to_string(path)?)
}
