//! Tables orchestrator: mirrors the standings table of every cached class
//! into the `league_tables` table.

use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::cache::{CacheContext, CacheError, Orchestrator, RunOutcome, SkipReason, record_run};
use crate::data::models::{CachingType, NewLeagueTable, TableScore};
use crate::data::{classes, tables};
use crate::hvw::RawScore;

pub struct TablesOrchestrator {
    ctx: CacheContext,
}

impl TablesOrchestrator {
    pub fn new(ctx: CacheContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Orchestrator for TablesOrchestrator {
    fn caching_type(&self) -> CachingType {
        CachingType::Tables
    }

    #[tracing::instrument(skip_all)]
    async fn run(&self, initiated_by: Option<String>) -> Result<RunOutcome, CacheError> {
        let started = Instant::now();

        let cached_classes = classes::list(&self.ctx.pool).await?;
        if cached_classes.is_empty() {
            info!("No classes cached, skipping tables caching");
            return Ok(RunOutcome::Skipped(SkipReason::NoClassesCached));
        }

        // One sequential call per class.
        let mut batch = Vec::with_capacity(cached_classes.len());
        for class in &cached_classes {
            let raw = self.ctx.api.get_scores(class.external_id).await?;
            debug!(class = %class.short_name, rows = raw.len(), "Fetched standings");
            batch.push(NewLeagueTable {
                class_id: class.id,
                scores: transform_scores(raw),
            });
        }

        let counts = tables::batch_upsert(&self.ctx.pool, &batch).await?;
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

/// Transform raw standings rows into the stored score list, ordered by
/// table position.
pub(crate) fn transform_scores(mut raw: Vec<RawScore>) -> Vec<TableScore> {
    raw.sort_by_key(|s| s.tab_pos);
    raw.into_iter()
        .map(|s| TableScore {
            position: s.tab_pos,
            team_name: s.tab_teamname,
            games_won: s.num_won_games,
            games_equal: s.num_equal_games,
            games_lost: s.num_lost_games,
            games_played: s.num_played_games,
            goals_shot: s.num_goals_shot,
            goals_received: s.num_goals_got,
            points: s.points_plus,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pos: i32, team: &str) -> RawScore {
        RawScore {
            tab_pos: pos,
            tab_teamname: team.to_owned(),
            num_won_games: 5,
            num_equal_games: 1,
            num_lost_games: 0,
            num_played_games: 6,
            num_goals_shot: 182,
            num_goals_got: 150,
            points_plus: 11,
        }
    }

    #[test]
    fn orders_scores_by_position() {
        let scores = transform_scores(vec![raw(3, "C"), raw(1, "A"), raw(2, "B")]);
        let order: Vec<i32> = scores.iter().map(|s| s.position).collect();
        assert_eq!(order, [1, 2, 3]);
        assert_eq!(scores[0].team_name, "A");
        assert_eq!(scores[0].points, 11);
    }
}
