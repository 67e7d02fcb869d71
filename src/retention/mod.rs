use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Duration, Local};
use walkdir::WalkDir;

use crate::config::Config;
use crate::errors::{AppError, Result};
use crate::logging::{self, Outcome};
use crate::metrics;

const ARCHIVE_EXTENSION: &str = "tar";

/// Runs the retention phase over the whole backup root, logging the outcome
/// and pushing one gauge sample for it.
pub fn run_retention_phase(config: &Config) -> Result<()> {
    logging::event(
        "RetentionPolicy",
        "RetentionPolicy",
        Outcome::Success,
        "Init Retention Policy for old database backups",
    );

    let result = prune_expired(&config.backup_dir, config.retain_days, Local::now());

    match &result {
        Ok(deleted) => {
            logging::event(
                "RetentionPolicy",
                "RetentionPolicy",
                Outcome::Success,
                format!(
                    "Finished retention policy, {} file(s) deleted",
                    deleted.len()
                ),
            );
            metrics::report(
                &config.pushgateway_url,
                metrics::RETENTION_METRIC,
                metrics::RETENTION_JOB,
                "Retention policy phase outcome",
                Outcome::Success,
            );
        }
        Err(e) => {
            logging::event(
                "RetentionPolicy",
                "RetentionPolicy_error",
                Outcome::Failure,
                format!("Error during deletion of old database backups: {e}"),
            );
            metrics::report(
                &config.pushgateway_url,
                metrics::RETENTION_METRIC,
                metrics::RETENTION_JOB,
                "Retention policy phase outcome",
                Outcome::Failure,
            );
        }
    }

    result.map(|_| ())
}

/// Deletes every `.tar` archive under the root's immediate subdirectories
/// whose age relative to `now` strictly exceeds `retain_days`. Returns the
/// deleted paths. Any filesystem error aborts the pass; files already removed
/// stay removed.
///
/// `now` is a parameter so age arithmetic can be exercised against real
/// directory trees without manipulating file timestamps.
fn prune_expired(
    backup_dir: &Path,
    retain_days: i64,
    now: DateTime<Local>,
) -> Result<Vec<PathBuf>> {
    let mut deleted = Vec::new();

    let folders = fs::read_dir(backup_dir).map_err(|e| AppError::filesystem(backup_dir, e))?;
    for folder in folders {
        let folder = folder.map_err(|e| AppError::filesystem(backup_dir, e))?;
        let folder_path = folder.path();
        if !folder_path.is_dir() {
            continue;
        }

        logging::event(
            "RetentionPolicy",
            "RetentionPolicy",
            Outcome::Success,
            format!(
                "Checking old backups in folder: {}",
                folder_path.display()
            ),
        );

        for entry in WalkDir::new(&folder_path)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| walk_error(&folder_path, e))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ARCHIVE_EXTENSION) {
                continue;
            }

            let metadata = entry
                .metadata()
                .map_err(|e| walk_error(&folder_path, e))?;
            // Birth time is not available on every filesystem; where the
            // platform cannot provide it, the last modification time stands
            // in. Either way this may reflect metadata changes, not true
            // creation.
            let created = metadata
                .created()
                .or_else(|_| metadata.modified())
                .map_err(|e| AppError::filesystem(path, e))?;

            if is_expired(created, now, retain_days) {
                fs::remove_file(path).map_err(|e| AppError::filesystem(path, e))?;
                logging::event(
                    "RetentionPolicy",
                    "RetentionPolicy",
                    Outcome::Success,
                    format!("Deleted file: {}", path.display()),
                );
                deleted.push(path.to_path_buf());
            }
        }

        logging::event(
            "RetentionPolicy",
            "RetentionPolicy",
            Outcome::Success,
            format!(
                "Finished validation of retention policy for folder: {}",
                folder_path.display()
            ),
        );
    }

    Ok(deleted)
}

fn is_expired(created: SystemTime, now: DateTime<Local>, retain_days: i64) -> bool {
    let created: DateTime<Local> = created.into();
    now.signed_duration_since(created) > Duration::days(retain_days)
}

fn walk_error(folder: &Path, error: walkdir::Error) -> AppError {
    let path = error
        .path()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| folder.to_path_buf());
    let source = error
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::other("directory walk failed"));
    AppError::Filesystem { path, source }
}
