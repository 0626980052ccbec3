//! Application state shared between the web layer and the scheduler.

use std::sync::Arc;

use sqlx::PgPool;

use crate::cache::OrchestratorRegistry;
use crate::scheduler::Scheduler;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub orchestrators: OrchestratorRegistry,
    pub scheduler: Arc<Scheduler>,
}

impl AppState {
    pub fn new(pool: PgPool, orchestrators: OrchestratorRegistry, scheduler: Arc<Scheduler>) -> Self {
        Self {
            pool,
            orchestrators,
            scheduler,
        }
    }
}
