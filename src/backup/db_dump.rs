use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::Config;
use crate::errors::{AppError, Result};

/// Timestamp embedded in every backup file name, second resolution.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Destination path for one database's archive:
/// `<backup_dir>/<name>/<name>_full_backup_<YYYYMMDD_HHMMSS>.tar`.
pub fn backup_file_path(backup_dir: &Path, database: &str, timestamp: &str) -> PathBuf {
    backup_dir
        .join(database)
        .join(format!("{database}_full_backup_{timestamp}.tar"))
}

/// Runs `pg_dump` in tar format against one database, writing straight to
/// `destination`. The password is scoped to this child process only.
pub fn dump_database(
    pg_dump: &Path,
    config: &Config,
    database: &str,
    destination: &Path,
) -> Result<()> {
    let output = Command::new(pg_dump)
        .args(["-h", &config.db_host, "-U", &config.db_user])
        .args(["-d", database, "-F", "tar", "-f"])
        .arg(destination)
        .env("PGPASSWORD", &config.db_password)
        .output()
        .map_err(|e| AppError::Dump {
            database: database.to_owned(),
            detail: format!("failed to execute {}: {e}", pg_dump.display()),
        })?;

    if !output.status.success() {
        return Err(AppError::Dump {
            database: database.to_owned(),
            detail: format!(
                "pg_dump exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_path_embeds_database_name_and_timestamp() {
        let path = backup_file_path(Path::new("/backups"), "billing", "20260828_031500");
        assert_eq!(
            path,
            Path::new("/backups/billing/billing_full_backup_20260828_031500.tar")
        );
    }

    #[test]
    fn directory_name_equals_database_name_exactly() {
        let path = backup_file_path(Path::new("/backups"), "my-app_db", "20260101_000000");
        assert_eq!(path.parent().unwrap(), Path::new("/backups/my-app_db"));
    }
}
