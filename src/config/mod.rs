use std::env;
use std::path::PathBuf;

use crate::errors::{AppError, Result};

pub const ENV_SERVER: &str = "POSTGRESQL__SERVER";
pub const ENV_USER: &str = "POSTGRESQL__USER";
pub const ENV_PASSWORD: &str = "POSTGRESQL__PASSWORD";
pub const ENV_BACKUP_FOLDER: &str = "BACKUP__FOLDER";
pub const ENV_RETAIN_DAYS: &str = "RETAIN__BACKUP__IN__DAYS";
pub const ENV_PUSHGATEWAY: &str = "PROMETHEUS__PUSHGATEWAY__SERVER";
pub const ENV_ON_DUMP_ERROR: &str = "BACKUP__ON_DUMP_ERROR";

/// What to do with the remaining databases after one dump fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DumpFailurePolicy {
    #[default]
    FailFast,
    Continue,
}

impl DumpFailurePolicy {
    fn parse(value: &str) -> Result<Self> {
        match value {
            "fail_fast" => Ok(DumpFailurePolicy::FailFast),
            "continue" => Ok(DumpFailurePolicy::Continue),
            other => Err(AppError::Config(format!(
                "{ENV_ON_DUMP_ERROR} must be 'fail_fast' or 'continue', got '{other}'"
            ))),
        }
    }
}

/// Immutable configuration snapshot, read once at startup and never reloaded.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_host: String,
    pub db_user: String,
    pub db_password: String,
    pub backup_dir: PathBuf,
    pub retain_days: i64,
    pub pushgateway_url: String,
    pub on_dump_error: DumpFailurePolicy,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup so tests
    /// never have to mutate the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| -> Result<String> {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| AppError::Config(format!("Missing environment variable: {name}")))
        };

        let retain_raw = required(ENV_RETAIN_DAYS)?;
        let retain_days: i64 = retain_raw.trim().parse().map_err(|_| {
            AppError::Config(format!(
                "{ENV_RETAIN_DAYS} must be an integer, got '{retain_raw}'"
            ))
        })?;
        if retain_days < 0 {
            return Err(AppError::Config(format!(
                "{ENV_RETAIN_DAYS} must not be negative, got {retain_days}"
            )));
        }

        let on_dump_error = match lookup(ENV_ON_DUMP_ERROR) {
            Some(value) => DumpFailurePolicy::parse(value.trim())?,
            None => DumpFailurePolicy::default(),
        };

        Ok(Config {
            db_host: required(ENV_SERVER)?,
            db_user: required(ENV_USER)?,
            db_password: required(ENV_PASSWORD)?,
            backup_dir: PathBuf::from(required(ENV_BACKUP_FOLDER)?),
            retain_days,
            pushgateway_url: required(ENV_PUSHGATEWAY)?,
            on_dump_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn full_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            (ENV_SERVER, "db.internal"),
            (ENV_USER, "postgres"),
            (ENV_PASSWORD, "secret"),
            (ENV_BACKUP_FOLDER, "/var/backups/pg"),
            (ENV_RETAIN_DAYS, "7"),
            (ENV_PUSHGATEWAY, "pushgateway.internal:9091"),
        ])
    }

    fn load(env: &HashMap<&str, &str>) -> Result<Config> {
        Config::from_lookup(|name| env.get(name).map(|v| v.to_string()))
    }

    #[test]
    fn loads_complete_configuration() -> anyhow::Result<()> {
        let config = load(&full_env())?;
        assert_eq!(config.db_host, "db.internal");
        assert_eq!(config.backup_dir, PathBuf::from("/var/backups/pg"));
        assert_eq!(config.retain_days, 7);
        assert_eq!(config.on_dump_error, DumpFailurePolicy::FailFast);
        Ok(())
    }

    #[test]
    fn missing_variable_is_a_config_error() {
        let mut env = full_env();
        env.remove(ENV_PASSWORD);
        let err = load(&env).unwrap_err();
        assert!(matches!(err, AppError::Config(_)), "got {err:?}");
        assert!(err.to_string().contains(ENV_PASSWORD));
    }

    #[test]
    fn non_integer_retention_is_a_config_error() {
        let mut env = full_env();
        env.insert(ENV_RETAIN_DAYS, "seven");
        assert!(matches!(load(&env).unwrap_err(), AppError::Config(_)));
    }

    #[test]
    fn negative_retention_is_rejected() {
        let mut env = full_env();
        env.insert(ENV_RETAIN_DAYS, "-1");
        assert!(matches!(load(&env).unwrap_err(), AppError::Config(_)));
    }

    #[test]
    fn dump_error_policy_is_parsed() -> anyhow::Result<()> {
        let mut env = full_env();
        env.insert(ENV_ON_DUMP_ERROR, "continue");
        assert_eq!(load(&env)?.on_dump_error, DumpFailurePolicy::Continue);

        env.insert(ENV_ON_DUMP_ERROR, "retry");
        assert!(matches!(load(&env).unwrap_err(), AppError::Config(_)));
        Ok(())
    }
}
