//! Structured event records, one JSON object per line on stdout.
//!
//! The field shape follows the ECS convention consumed by the log pipeline:
//! `@timestamp`, `event.{dataset,action,outcome}`, `message`, plus optional
//! `database.name`, `file.path` and `error.message` blocks.

use std::path::Path;

use chrono::{Local, SecondsFormat};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failure,
}

#[derive(Serialize)]
struct EventFields<'a> {
    dataset: &'a str,
    action: &'a str,
    outcome: Outcome,
}

#[derive(Serialize)]
struct DatabaseFields<'a> {
    name: &'a str,
}

#[derive(Serialize)]
struct FileFields {
    path: String,
}

#[derive(Serialize)]
struct ErrorFields<'a> {
    message: &'a str,
}

#[derive(Serialize)]
struct LogRecord<'a> {
    #[serde(rename = "@timestamp")]
    timestamp: String,
    event: EventFields<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    database: Option<DatabaseFields<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<FileFields>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorFields<'a>>,
}

fn now_timestamp() -> String {
    Local::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

fn emit(record: &LogRecord) {
    match serde_json::to_string(record) {
        Ok(line) => write_line(line),
        Err(e) => eprintln!("failed to serialize log record: {e}"),
    }
}

#[cfg(not(test))]
fn write_line(line: String) {
    println!("{line}");
}

#[cfg(test)]
fn write_line(line: String) {
    capture::push(line);
}

/// Test sink for emitted records. Records are kept per thread, so parallel
/// tests observe only their own log stream.
#[cfg(test)]
pub(crate) mod capture {
    use std::cell::RefCell;

    thread_local! {
        static LINES: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
    }

    pub fn push(line: String) {
        LINES.with(|lines| lines.borrow_mut().push(line));
    }

    /// Returns and clears every record emitted on this thread so far.
    pub fn take() -> Vec<String> {
        LINES.with(|lines| lines.borrow_mut().drain(..).collect())
    }
}

/// Plain phase/progress event.
pub fn event(dataset: &str, action: &str, outcome: Outcome, message: impl Into<String>) {
    emit(&LogRecord {
        timestamp: now_timestamp(),
        event: EventFields {
            dataset,
            action,
            outcome,
        },
        database: None,
        file: None,
        message: message.into(),
        error: None,
    });
}

/// Per-database dump result, success or failure.
pub fn backup_result(database: &str, file_path: &Path, outcome: Outcome, error: Option<&str>) {
    let verdict = match outcome {
        Outcome::Success => "successful",
        Outcome::Failure => "failed",
    };
    emit(&LogRecord {
        timestamp: now_timestamp(),
        event: EventFields {
            dataset: "backup",
            action: match outcome {
                Outcome::Success => "backup_success",
                Outcome::Failure => "backup_error",
            },
            outcome,
        },
        database: Some(DatabaseFields { name: database }),
        file: Some(FileFields {
            path: file_path.display().to_string(),
        }),
        message: format!(
            "Backup {verdict} for database {database}: {}",
            file_path.display()
        ),
        error: error.map(|message| ErrorFields { message }),
    });
}
