//! The job scheduler: owns the persisted job definitions and the live
//! trigger registry, and keeps the two in sync through its mutation API.
//!
//! Registry membership is always a subset of persisted job ids; at process
//! start the registry is rebuilt by replaying every persisted job through
//! the same registration path used by `create_job`, without re-persisting.

mod triggers;

pub use triggers::{FireFn, TriggerSet};

use std::str::FromStr;
use std::sync::Arc;

use cron::Schedule;
use futures::FutureExt;
use sqlx::PgPool;
use tracing::{debug, error, info, warn};

use crate::cache::{OrchestratorRegistry, RunOutcome};
use crate::data::jobs::{self, JobChanges};
use crate::data::models::{CachingType, Job};

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// Malformed schedule expression; rejected before any persistence or
    /// registry mutation.
    #[error("invalid schedule expression '{0}': {1}")]
    InvalidSchedule(String, String),
    #[error("a job named '{0}' already exists")]
    DuplicateJobName(String),
    #[error("no job with id {0}")]
    JobNotFound(i32),
    #[error(transparent)]
    Storage(#[from] sqlx::Error),
}

/// A job definition about to be created.
#[derive(Debug, Clone)]
pub struct NewJobDef {
    pub name: String,
    pub caching_type: CachingType,
    pub schedule_expression: String,
    pub disabled: bool,
}

pub struct Scheduler {
    pool: PgPool,
    triggers: TriggerSet,
}

impl Scheduler {
    /// Build the scheduler, wiring trigger fires to the orchestrator
    /// registry. Cron-triggered runs carry no initiating user.
    pub fn new(pool: PgPool, registry: OrchestratorRegistry) -> Self {
        let fire: FireFn = Arc::new(move |job_id, caching_type| {
            let registry = registry.clone();
            async move {
                match registry.run(caching_type, None).await {
                    Ok(RunOutcome::Completed(result)) => {
                        debug!(
                            job_id,
                            caching_type = %caching_type,
                            result_id = result.id,
                            "Scheduled caching run recorded"
                        );
                    }
                    Ok(RunOutcome::Skipped(reason)) => {
                        info!(
                            job_id,
                            caching_type = %caching_type,
                            reason = reason.as_str(),
                            "Scheduled caching run skipped"
                        );
                    }
                    // A failed run is local to itself; the trigger keeps
                    // firing on schedule.
                    Err(e) => {
                        error!(job_id, caching_type = %caching_type, error = ?e, "Scheduled caching run failed");
                    }
                }
            }
            .boxed()
        });

        Self {
            pool,
            triggers: TriggerSet::new(fire),
        }
    }

    /// Replay all persisted jobs into the live registry at process start.
    /// Returns how many triggers were registered.
    pub async fn load_jobs(&self) -> Result<usize, SchedulerError> {
        let all = jobs::list(&self.pool).await?;
        let total = all.len();
        let mut registered = 0usize;

        for job in all {
            match parse_schedule(&job.schedule_expression) {
                Ok(schedule) => {
                    self.triggers
                        .register(job.id, job.caching_type, schedule, !job.disabled);
                    registered += 1;
                }
                // Persisted rows are validated on the way in, so this only
                // happens after out-of-band storage edits.
                Err(e) => {
                    warn!(job_id = job.id, name = %job.name, error = %e, "Skipping job with unparseable persisted schedule");
                }
            }
        }

        info!(total, registered, "Scheduler loaded persisted jobs");
        Ok(registered)
    }

    /// Validate, persist, and register a new job. The trigger starts
    /// immediately unless the definition is disabled.
    pub async fn create_job(&self, def: NewJobDef) -> Result<Job, SchedulerError> {
        let schedule = parse_schedule(&def.schedule_expression)?;

        let job = jobs::insert(
            &self.pool,
            &def.name,
            def.caching_type,
            &def.schedule_expression,
            def.disabled,
        )
        .await
        .map_err(|e| storage_error(e, &def.name))?;

        self.triggers
            .register(job.id, job.caching_type, schedule, !job.disabled);
        info!(
            job_id = job.id,
            name = %job.name,
            caching_type = %job.caching_type,
            schedule = %job.schedule_expression,
            disabled = job.disabled,
            "Job created"
        );
        Ok(job)
    }

    /// Persist a partial change and apply it to the existing live trigger:
    /// a new schedule replaces the firing time, a caching-type change
    /// redirects dispatch, and `disabled` transitions start/stop.
    pub async fn update_job(&self, id: i32, changes: JobChanges) -> Result<Job, SchedulerError> {
        // Validate before touching storage or the registry.
        let schedule = changes
            .schedule_expression
            .as_deref()
            .map(parse_schedule)
            .transpose()?;

        let job = jobs::update(&self.pool, id, &changes)
            .await
            .map_err(|e| storage_error(e, changes.name.as_deref().unwrap_or("")))?
            .ok_or(SchedulerError::JobNotFound(id))?;

        if let Some(schedule) = schedule {
            self.triggers.set_schedule(id, schedule);
        }
        if let Some(caching_type) = changes.caching_type {
            self.triggers.set_caching_type(id, caching_type);
        }
        if let Some(disabled) = changes.disabled {
            if disabled {
                self.triggers.stop(id);
            } else {
                self.triggers.start(id);
            }
        }

        info!(job_id = id, name = %job.name, disabled = job.disabled, "Job updated");
        Ok(job)
    }

    /// Remove the live trigger (no-op when unregistered) and delete the
    /// persisted record.
    pub async fn delete_job(&self, id: i32) -> Result<(), SchedulerError> {
        self.triggers.remove(id);
        if !jobs::delete(&self.pool, id).await? {
            return Err(SchedulerError::JobNotFound(id));
        }
        info!(job_id = id, "Job deleted");
        Ok(())
    }

    /// Cancel all running triggers; in-flight runs finish on their own.
    pub async fn shutdown(&self) {
        self.triggers.shutdown().await;
        info!("Scheduler shut down");
    }
}

/// Parse a job schedule expression.
///
/// Jobs are written with standard 5-field cron; the `cron` crate wants a
/// seconds field, so 5-field input is normalized with `0` seconds. A
/// 6-field form is accepted as-is.
pub fn parse_schedule(expression: &str) -> Result<Schedule, SchedulerError> {
    let trimmed = expression.trim();
    let normalized = if trimmed.split_whitespace().count() == 5 {
        format!("0 {trimmed}")
    } else {
        trimmed.to_owned()
    };

    Schedule::from_str(&normalized)
        .map_err(|e| SchedulerError::InvalidSchedule(expression.to_owned(), e.to_string()))
}

fn storage_error(e: sqlx::Error, name: &str) -> SchedulerError {
    if e.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
    {
        SchedulerError::DuplicateJobName(name.to_owned())
    } else {
        SchedulerError::Storage(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use sqlx::error::DatabaseError;

    #[test]
    fn accepts_five_field_expressions() {
        let schedule = parse_schedule("*/1 * * * *").unwrap();
        let now = Utc.with_ymd_and_hms(2025, 9, 21, 17, 0, 30).unwrap();
        let next = schedule.after(&now).next().unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 9, 21, 17, 1, 0).unwrap());
    }

    #[test]
    fn accepts_six_field_expressions() {
        assert!(parse_schedule("30 0 2 * * *").is_ok());
    }

    #[test]
    fn nightly_expression_fires_once_a_day() {
        let schedule = parse_schedule("0 3 * * *").unwrap();
        let now = Utc.with_ymd_and_hms(2025, 9, 21, 12, 0, 0).unwrap();
        let fires: Vec<_> = schedule.after(&now).take(2).collect();
        assert_eq!(fires[0], Utc.with_ymd_and_hms(2025, 9, 22, 3, 0, 0).unwrap());
        assert_eq!(fires[1], Utc.with_ymd_and_hms(2025, 9, 23, 3, 0, 0).unwrap());
    }

    #[test]
    fn rejects_malformed_expressions() {
        for bad in ["", "not cron", "61 * * * *", "* * * *"] {
            let err = parse_schedule(bad).unwrap_err();
            assert!(matches!(err, SchedulerError::InvalidSchedule(..)), "{bad}");
        }
    }

    /// A constraint-violation shape as the driver would report it, enough
    /// for the `is_unique_violation` check to see its kind.
    #[derive(Debug)]
    struct StubDbError {
        unique: bool,
    }

    impl std::fmt::Display for StubDbError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(self.message())
        }
    }

    impl std::error::Error for StubDbError {}

    impl sqlx::error::DatabaseError for StubDbError {
        fn message(&self) -> &str {
            if self.unique {
                "duplicate key value violates unique constraint \"jobs_name_key\""
            } else {
                "could not serialize access"
            }
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            if self.unique {
                sqlx::error::ErrorKind::UniqueViolation
            } else {
                sqlx::error::ErrorKind::Other
            }
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }
    }

    #[test]
    fn unique_violation_maps_to_duplicate_job_name() {
        let e = sqlx::Error::Database(Box::new(StubDbError { unique: true }));
        match storage_error(e, "games-nightly") {
            SchedulerError::DuplicateJobName(name) => assert_eq!(name, "games-nightly"),
            other => panic!("unexpected mapping: {other:?}"),
        }
    }

    #[test]
    fn other_database_errors_stay_storage_errors() {
        let e = sqlx::Error::Database(Box::new(StubDbError { unique: false }));
        assert!(matches!(
            storage_error(e, "games-nightly"),
            SchedulerError::Storage(_)
        ));
    }
}
