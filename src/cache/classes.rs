//! Classes orchestrator: mirrors the league classes published for the
//! current season week into the `classes` table.

use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::cache::{CacheContext, CacheError, Orchestrator, RunOutcome, record_run};
use crate::data::classes;
use crate::data::models::{CachingType, NewClass};
use crate::hvw::RawClass;

pub struct ClassesOrchestrator {
    ctx: CacheContext,
}

impl ClassesOrchestrator {
    pub fn new(ctx: CacheContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Orchestrator for ClassesOrchestrator {
    fn caching_type(&self) -> CachingType {
        CachingType::Classes
    }

    #[tracing::instrument(skip_all)]
    async fn run(&self, initiated_by: Option<String>) -> Result<RunOutcome, CacheError> {
        let started = Instant::now();

        // Class listings are published per week; query the selected week,
        // falling back to the first listed one.
        let selection = self.ctx.api.get_week_selection().await?;
        let week = selection
            .selected
            .clone()
            .or_else(|| selection.list.keys().next().cloned());

        let batch = match week {
            Some(week) => {
                let raw = self.ctx.api.get_classes(&week).await?;
                debug!(week = %week, count = raw.len(), "Fetched league classes");
                transform_classes(raw)
            }
            None => {
                warn!("Week selector lists no weeks, nothing to fetch");
                Vec::new()
            }
        };

        let counts = classes::batch_upsert(&self.ctx.pool, &batch).await?;
        record_run(
            &self.ctx.pool,
            self.caching_type(),
            started,
            counts,
            initiated_by,
        )
        .await
    }
}

/// Transform raw classes, deduping by external id (last record wins) so the
/// single-batch upsert never touches one row twice.
pub(crate) fn transform_classes(raw: Vec<RawClass>) -> Vec<NewClass> {
    let mut by_external: std::collections::HashMap<i64, NewClass> = std::collections::HashMap::new();
    for class in raw {
        by_external.insert(
            class.g_class_id,
            NewClass {
                external_id: class.g_class_id,
                short_name: class.g_class_sname,
                long_name: class.g_class_lname,
            },
        );
    }
    let mut batch: Vec<NewClass> = by_external.into_values().collect();
    batch.sort_by_key(|c| c.external_id);
    batch
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(id: i64, short: &str, long: &str) -> RawClass {
        RawClass {
            g_class_id: id,
            g_class_sname: short.to_owned(),
            g_class_lname: long.to_owned(),
        }
    }

    #[test]
    fn dedupes_by_external_id_last_wins() {
        let batch = transform_classes(vec![
            raw(110, "M-BK", "Männer Bezirksklasse"),
            raw(112, "F-BL", "Frauen Bezirksliga"),
            raw(110, "M-BK2", "Männer Bezirksklasse 2"),
        ]);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].external_id, 110);
        assert_eq!(batch[0].short_name, "M-BK2");
        assert_eq!(batch[1].external_id, 112);
    }
}
