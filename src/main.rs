//! PostgreSQL full backup tool.
//!
//! One run dumps every non-template database on the configured server into
//! `<BACKUP__FOLDER>/<database>/` via `pg_dump`, then deletes archives older
//! than the retention threshold. Each phase emits structured JSON log records
//! on stdout and pushes its outcome to a Prometheus pushgateway. Meant to run
//! under cron or a job scheduler; the scheduler is responsible for ensuring a
//! single instance at a time.

mod backup;
mod config;
mod errors;
mod logging;
mod metrics;
mod retention;

use std::process::ExitCode;

use config::Config;
use errors::AppError;
use logging::Outcome;

fn main() -> ExitCode {
    dotenv::dotenv().ok();

    logging::event("backup", "backup", Outcome::Success, "Init PG Backup Tool");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => return fail(e),
    };

    if let Err(e) = run_phases(&config) {
        return fail(e);
    }

    logging::event(
        "backup",
        "backup",
        Outcome::Success,
        "Finished PG Backup Tool",
    );
    ExitCode::SUCCESS
}

fn run_phases(config: &Config) -> errors::Result<()> {
    run_phases_with(
        config,
        backup::run_backup_phase,
        retention::run_retention_phase,
    )
}

/// Sequences the two phases. Retention runs only after a fully successful
/// backup phase; a backup failure must never race with deletions in the same
/// run.
fn run_phases_with(
    config: &Config,
    backup_phase: impl Fn(&Config) -> errors::Result<()>,
    retention_phase: impl Fn(&Config) -> errors::Result<()>,
) -> errors::Result<()> {
    backup_phase(config)?;
    retention_phase(config)?;
    Ok(())
}

fn fail(error: AppError) -> ExitCode {
    let action = match error {
        AppError::Config(_) => "config_error",
        _ => "error",
    };
    logging::event(
        "pg-backup-tool",
        action,
        Outcome::Failure,
        format!("An error occurred: {error}"),
    );
    ExitCode::from(error.exit_code())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DumpFailurePolicy;
    use std::cell::{Cell, RefCell};
    use std::path::PathBuf;

    fn test_config() -> Config {
        Config {
            db_host: "localhost".into(),
            db_user: "postgres".into(),
            db_password: "secret".into(),
            backup_dir: PathBuf::from("/var/backups/pg"),
            retain_days: 7,
            pushgateway_url: "127.0.0.1:9".into(),
            on_dump_error: DumpFailurePolicy::FailFast,
        }
    }

    #[test]
    fn retention_is_not_invoked_when_a_dump_fails() {
        let config = test_config();
        let retention_ran = Cell::new(false);

        let err = run_phases_with(
            &config,
            |_| {
                Err(AppError::Dump {
                    database: "app".into(),
                    detail: "pg_dump exited with exit status: 1".into(),
                })
            },
            |_| {
                retention_ran.set(true);
                Ok(())
            },
        )
        .unwrap_err();

        assert!(matches!(err, AppError::Dump { .. }));
        assert!(
            !retention_ran.get(),
            "retention must not run after a backup failure"
        );
    }

    #[test]
    fn retention_is_not_invoked_when_enumeration_fails() {
        let config = test_config();
        let retention_ran = Cell::new(false);

        let err = run_phases_with(
            &config,
            |_| Err(AppError::Enumeration("connection refused".into())),
            |_| {
                retention_ran.set(true);
                Ok(())
            },
        )
        .unwrap_err();

        assert!(matches!(err, AppError::Enumeration(_)));
        assert!(!retention_ran.get());
    }

    #[test]
    fn retention_follows_a_successful_backup() -> anyhow::Result<()> {
        let config = test_config();
        let order = RefCell::new(Vec::new());

        run_phases_with(
            &config,
            |_| {
                order.borrow_mut().push("backup");
                Ok(())
            },
            |_| {
                order.borrow_mut().push("retention");
                Ok(())
            },
        )?;

        assert_eq!(*order.borrow(), ["backup", "retention"]);
        Ok(())
    }
}
