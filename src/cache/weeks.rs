//! Weeks orchestrator: mirrors the HVW week selector into the `weeks` table.

use std::time::Instant;

use async_trait::async_trait;
use tracing::debug;

use crate::cache::{CacheContext, CacheError, Orchestrator, RunOutcome, record_run};
use crate::data::models::{CachingType, NewWeek};
use crate::data::weeks;
use crate::hvw::RawWeekSelection;

pub struct WeeksOrchestrator {
    ctx: CacheContext,
}

impl WeeksOrchestrator {
    pub fn new(ctx: CacheContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Orchestrator for WeeksOrchestrator {
    fn caching_type(&self) -> CachingType {
        CachingType::Weeks
    }

    #[tracing::instrument(skip_all)]
    async fn run(&self, initiated_by: Option<String>) -> Result<RunOutcome, CacheError> {
        let started = Instant::now();

        let selection = self.ctx.api.get_week_selection().await?;
        let batch = transform_weeks(&selection);
        debug!(count = batch.len(), "Fetched season weeks");

        let counts = weeks::batch_upsert(&self.ctx.pool, &batch).await?;
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

/// Flatten the selector into upsertable weeks. Upstream marks exactly one
/// week as selected; that one becomes `is_current`.
pub(crate) fn transform_weeks(selection: &RawWeekSelection) -> Vec<NewWeek> {
    selection
        .list
        .keys()
        .map(|date| NewWeek {
            external_date: date.clone(),
            is_current: selection.selected.as_deref() == Some(date.as_str()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn selection(dates: &[&str], selected: Option<&str>) -> RawWeekSelection {
        RawWeekSelection {
            list: dates
                .iter()
                .map(|d| (d.to_string(), d.to_string()))
                .collect::<BTreeMap<_, _>>(),
            selected: selected.map(str::to_owned),
        }
    }

    #[test]
    fn marks_only_selected_week_current() {
        let batch = transform_weeks(&selection(
            &["2025-09-07", "2025-09-14", "2025-09-21"],
            Some("2025-09-14"),
        ));
        assert_eq!(batch.len(), 3);
        let current: Vec<&str> = batch
            .iter()
            .filter(|w| w.is_current)
            .map(|w| w.external_date.as_str())
            .collect();
        assert_eq!(current, ["2025-09-14"]);
    }

    #[test]
    fn no_selected_week_means_no_current() {
        let batch = transform_weeks(&selection(&["2025-09-07"], None));
        assert!(batch.iter().all(|w| !w.is_current));
    }
}
