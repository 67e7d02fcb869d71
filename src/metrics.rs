//! Push-based phase reporting against a Prometheus pushgateway.
//!
//! Each phase pushes a single gauge: +1 for success, -1 for failure. The
//! gateway timestamps the push itself (`push_time_seconds`), so the value is
//! purely directional.

use std::collections::HashMap;

use prometheus::{Gauge, Opts, Registry};

use crate::errors::{AppError, Result};
use crate::logging::{self, Outcome};

pub const BACKUP_METRIC: &str = "job_backup_databases_success";
pub const BACKUP_JOB: &str = "postgresql_backup_databases";
pub const RETENTION_METRIC: &str = "job_retention_databases_success";
pub const RETENTION_JOB: &str = "postgresql_retention_databases";

/// Best-effort report of a phase outcome. A failed push is logged but never
/// replaces the phase's own result.
pub fn report(gateway: &str, metric: &str, job: &str, help: &str, outcome: Outcome) {
    if let Err(e) = push(gateway, metric, job, help, outcome) {
        logging::event(
            "metrics",
            "push_error",
            Outcome::Failure,
            format!("Failed to push {metric} for job {job}: {e}"),
        );
    }
}

fn push(gateway: &str, metric: &str, job: &str, help: &str, outcome: Outcome) -> Result<()> {
    let registry = Registry::new();
    let gauge = Gauge::with_opts(Opts::new(metric, help))
        .map_err(|e| AppError::MetricsPush(e.to_string()))?;
    registry
        .register(Box::new(gauge.clone()))
        .map_err(|e| AppError::MetricsPush(e.to_string()))?;
    gauge.set(outcome_signal(outcome));

    prometheus::push_metrics(job, HashMap::new(), gateway, registry.gather(), None)
        .map_err(|e| AppError::MetricsPush(e.to_string()))
}

fn outcome_signal(outcome: Outcome) -> f64 {
    match outcome {
        Outcome::Success => 1.0,
        Outcome::Failure => -1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_maps_to_directional_signal() {
        assert_eq!(outcome_signal(Outcome::Success), 1.0);
        assert_eq!(outcome_signal(Outcome::Failure), -1.0);
    }

    #[test]
    fn unreachable_gateway_is_reported_as_push_error() {
        // port 9 is discard; nothing listens there in CI
        let err = push(
            "127.0.0.1:9",
            BACKUP_METRIC,
            BACKUP_JOB,
            "backup phase outcome",
            Outcome::Success,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::MetricsPush(_)));
    }
}
