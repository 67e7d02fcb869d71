use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use which::which;

use crate::backup::{db_dump, db_list};
use crate::config::{Config, DumpFailurePolicy};
use crate::errors::{AppError, Result};
use crate::logging::{self, Outcome};
use crate::metrics;

/// Runs the full backup phase: enumerate, then dump every database into
/// `<backup_dir>/<name>/`, sharing one timestamp across the run. Logs the
/// phase outcome and pushes exactly one gauge sample for it.
pub fn run_backup_phase(config: &Config) -> Result<()> {
    logging::event("backup", "backup", Outcome::Success, "Init Databases backup");

    let result = BackupPhase::new(config).and_then(|phase| phase.run());

    match &result {
        Ok(produced) => {
            logging::event(
                "backup",
                "backup",
                Outcome::Success,
                format!(
                    "Backup phase completed successfully, {} archive(s) written",
                    produced.len()
                ),
            );
            metrics::report(
                &config.pushgateway_url,
                metrics::BACKUP_METRIC,
                metrics::BACKUP_JOB,
                "Backup databases phase outcome",
                Outcome::Success,
            );
        }
        Err(e) => {
            logging::event(
                "backup",
                "backup_error",
                Outcome::Failure,
                format!("Error during backup phase: {e}"),
            );
            metrics::report(
                &config.pushgateway_url,
                metrics::BACKUP_METRIC,
                metrics::BACKUP_JOB,
                "Backup databases phase outcome",
                Outcome::Failure,
            );
        }
    }

    result.map(|_| ())
}

struct BackupPhase<'a> {
    config: &'a Config,
    psql: PathBuf,
    pg_dump: PathBuf,
}

impl<'a> BackupPhase<'a> {
    fn new(config: &'a Config) -> Result<Self> {
        let psql = which("psql").map_err(|_| AppError::MissingTool("psql".into()))?;
        let pg_dump = which("pg_dump").map_err(|_| AppError::MissingTool("pg_dump".into()))?;
        Ok(Self {
            config,
            psql,
            pg_dump,
        })
    }

    /// Dumps every enumerated database, returning the archive paths written.
    ///
    /// Under [`DumpFailurePolicy::FailFast`] the first dump error aborts the
    /// remaining databases; under `Continue` they are still attempted and the
    /// phase fails at the end naming every failed database.
    fn run(&self) -> Result<Vec<PathBuf>> {
        let databases = db_list::list_databases(&self.psql, self.config)?;
        let timestamp = Local::now().format(db_dump::TIMESTAMP_FORMAT).to_string();

        let mut produced = Vec::new();
        let mut failed = Vec::new();

        for database in &databases {
            let destination =
                db_dump::backup_file_path(&self.config.backup_dir, database, &timestamp);
            match self.dump_one(database, &destination) {
                Ok(()) => {
                    logging::backup_result(database, &destination, Outcome::Success, None);
                    produced.push(destination);
                }
                Err(e) => {
                    logging::backup_result(
                        database,
                        &destination,
                        Outcome::Failure,
                        Some(&e.to_string()),
                    );
                    match self.config.on_dump_error {
                        DumpFailurePolicy::FailFast => return Err(e),
                        DumpFailurePolicy::Continue => failed.push(database.clone()),
                    }
                }
            }
        }

        if !failed.is_empty() {
            return Err(AppError::Dump {
                database: failed.join(", "),
                detail: format!("{} of {} dumps failed", failed.len(), databases.len()),
            });
        }

        Ok(produced)
    }

    fn dump_one(&self, database: &str, destination: &Path) -> Result<()> {
        let directory = self.config.backup_dir.join(database);
        fs::create_dir_all(&directory).map_err(|e| AppError::filesystem(&directory, e))?;
        db_dump::dump_database(&self.pg_dump, self.config, database, destination)
    }
}
