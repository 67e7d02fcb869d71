use std::path::Path;
use std::process::Command;

use crate::config::Config;
use crate::errors::{AppError, Result};

const LIST_DATABASES_SQL: &str = "SELECT datname FROM pg_database WHERE datistemplate = false;";

/// Lists every non-template database on the server via `psql`.
///
/// The query runs against the `postgres` maintenance database with tuples-only
/// unaligned output, so stdout is one database name per line. Arguments are
/// passed as a vector and the password only enters the child's environment,
/// so names containing shell metacharacters cannot break out of the command.
pub fn list_databases(psql: &Path, config: &Config) -> Result<Vec<String>> {
    let output = Command::new(psql)
        .args(["-h", &config.db_host, "-U", &config.db_user])
        .args(["-d", "postgres", "-t", "-A"])
        .args(["-c", LIST_DATABASES_SQL])
        .env("PGPASSWORD", &config.db_password)
        .output()
        .map_err(|e| {
            AppError::Enumeration(format!("failed to execute {}: {e}", psql.display()))
        })?;

    if !output.status.success() {
        return Err(AppError::Enumeration(format!(
            "psql exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    Ok(parse_database_names(&String::from_utf8_lossy(&output.stdout)))
}

fn parse_database_names(stdout: &str) -> Vec<String> {
    stdout.split_whitespace().map(str::to_owned).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_one_name_per_token() {
        let stdout = "postgres\napp\nbilling\n\n";
        assert_eq!(parse_database_names(stdout), ["postgres", "app", "billing"]);
    }

    #[test]
    fn empty_output_yields_no_databases() {
        assert!(parse_database_names("").is_empty());
        assert!(parse_database_names(" \n \n").is_empty());
    }
}
