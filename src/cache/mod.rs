//! Cache orchestrators: one fetch-transform-upsert-record pipeline per
//! caching type, selected through a registry keyed by [`CachingType`].
//!
//! Failure semantics: a source or storage error aborts the run and nothing
//! is written to the ledger; a missing upstream dependency skips the run
//! without error. Overlapping runs of the same type are allowed unless
//! `serialize_runs` is enabled, in which case the registry holds a per-type
//! lock for the duration of a run.

pub mod classes;
pub mod games;
pub mod tables;
pub mod weeks;

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::Mutex;
use tracing::info;

use crate::data::caching_results::{self, NewCachingResult};
use crate::data::models::{CacheStatus, CachingResult, CachingType, UpsertCounts};
use crate::hvw::{HvwApi, HvwApiError};

/// Shared handles each orchestrator needs.
#[derive(Clone)]
pub struct CacheContext {
    pub pool: PgPool,
    pub api: Arc<HvwApi>,
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// External fetch failed; the run is aborted and leaves no trace in the
    /// ledger. Callers do not retry automatically.
    #[error(transparent)]
    Source(#[from] HvwApiError),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Why a run was skipped rather than executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Tables caching requires at least one cached class.
    NoClassesCached,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::NoClassesCached => "no classes cached",
        }
    }
}

#[derive(Debug)]
pub enum RunOutcome {
    Completed(CachingResult),
    Skipped(SkipReason),
}

/// One end-to-end caching cycle for one entity type.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    fn caching_type(&self) -> CachingType;

    /// Execute a run. `initiated_by` is the opaque user reference for manual
    /// triggers; cron fires pass `None`.
    async fn run(&self, initiated_by: Option<String>) -> Result<RunOutcome, CacheError>;
}

/// Lookup table from caching type to its orchestrator.
#[derive(Clone)]
pub struct OrchestratorRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    weeks: Arc<weeks::WeeksOrchestrator>,
    classes: Arc<classes::ClassesOrchestrator>,
    games: Arc<games::GamesOrchestrator>,
    tables: Arc<tables::TablesOrchestrator>,
    run_locks: Option<RunLocks>,
}

/// Per-type run serialization, only held when `serialize_runs` is enabled.
#[derive(Default)]
struct RunLocks {
    weeks: Mutex<()>,
    classes: Mutex<()>,
    games: Mutex<()>,
    tables: Mutex<()>,
}

impl RunLocks {
    fn lock_for(&self, caching_type: CachingType) -> &Mutex<()> {
        match caching_type {
            CachingType::Weeks => &self.weeks,
            CachingType::Classes => &self.classes,
            CachingType::Games => &self.games,
            CachingType::Tables => &self.tables,
        }
    }
}

impl OrchestratorRegistry {
    pub fn new(ctx: CacheContext, serialize_runs: bool) -> Self {
        let weeks = Arc::new(weeks::WeeksOrchestrator::new(ctx.clone()));
        let classes = Arc::new(classes::ClassesOrchestrator::new(ctx.clone()));
        // Games resolves its missing-weeks precondition by running the weeks
        // orchestrator itself, so it holds a direct handle.
        let games = Arc::new(games::GamesOrchestrator::new(ctx.clone(), weeks.clone()));
        let tables = Arc::new(tables::TablesOrchestrator::new(ctx));

        Self {
            inner: Arc::new(RegistryInner {
                weeks,
                classes,
                games,
                tables,
                run_locks: serialize_runs.then(RunLocks::default),
            }),
        }
    }

    pub fn get(&self, caching_type: CachingType) -> Arc<dyn Orchestrator> {
        match caching_type {
            CachingType::Weeks => self.inner.weeks.clone(),
            CachingType::Classes => self.inner.classes.clone(),
            CachingType::Games => self.inner.games.clone(),
            CachingType::Tables => self.inner.tables.clone(),
        }
    }

    /// Run the orchestrator for a type, honoring the optional per-type lock.
    pub async fn run(
        &self,
        caching_type: CachingType,
        initiated_by: Option<String>,
    ) -> Result<RunOutcome, CacheError> {
        let _guard = match &self.inner.run_locks {
            Some(locks) => Some(locks.lock_for(caching_type).lock().await),
            None => None,
        };
        self.get(caching_type).run(initiated_by).await
    }
}

/// Append the ledger entry for a completed run and log its counts.
///
/// Reaching this point means the bulk write was acknowledged, so the status
/// is `ok`; aborted runs never get here.
pub(crate) async fn record_run(
    pool: &PgPool,
    caching_type: CachingType,
    started: Instant,
    counts: UpsertCounts,
    initiated_by: Option<String>,
) -> Result<RunOutcome, CacheError> {
    let duration = started.elapsed();
    let result = caching_results::append(
        pool,
        &NewCachingResult {
            caching_type,
            status: CacheStatus::Ok,
            duration_seconds: duration.as_secs_f64(),
            counts,
            initiated_by,
        },
    )
    .await?;

    info!(
        caching_type = %caching_type,
        duration = format!("{duration:.2?}"),
        upserted = counts.upserted,
        matched = counts.matched,
        modified = counts.modified,
        "Caching run completed"
    );
    Ok(RunOutcome::Completed(result))
}
