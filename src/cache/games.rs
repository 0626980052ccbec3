//! Games orchestrator: fetches the games of every cached week and mirrors
//! them into the `games` table, resolving class references along the way.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::cache::weeks::WeeksOrchestrator;
use crate::cache::{CacheContext, CacheError, Orchestrator, RunOutcome, record_run};
use crate::data::models::{CachingType, NewGame, UpsertCounts, Week};
use crate::data::{classes, games, weeks};
use crate::hvw::RawGame;

pub struct GamesOrchestrator {
    ctx: CacheContext,
    /// Weeks are the one hard upstream dependency: with none cached there is
    /// nothing to iterate, so a weeks run is triggered first.
    weeks: Arc<WeeksOrchestrator>,
}

impl GamesOrchestrator {
    pub fn new(ctx: CacheContext, weeks: Arc<WeeksOrchestrator>) -> Self {
        Self { ctx, weeks }
    }
}

/// The collaborators one games run touches, split out so the run sequence
/// (weeks precondition before any fetch or upsert) is testable on its own.
#[async_trait]
trait GamesBackend: Send + Sync {
    async fn cached_weeks(&self) -> Result<Vec<Week>, CacheError>;
    async fn run_weeks(&self, initiated_by: Option<String>) -> Result<(), CacheError>;
    async fn fetch_games(&self, week: &str) -> Result<Vec<RawGame>, CacheError>;
    async fn class_id_map(&self) -> Result<HashMap<i64, i32>, CacheError>;
    async fn upsert_games(&self, batch: Vec<NewGame>) -> Result<UpsertCounts, CacheError>;
}

#[async_trait]
impl GamesBackend for GamesOrchestrator {
    async fn cached_weeks(&self) -> Result<Vec<Week>, CacheError> {
        Ok(weeks::list(&self.ctx.pool).await?)
    }

    async fn run_weeks(&self, initiated_by: Option<String>) -> Result<(), CacheError> {
        self.weeks.run(initiated_by).await.map(|_| ())
    }

    async fn fetch_games(&self, week: &str) -> Result<Vec<RawGame>, CacheError> {
        Ok(self.ctx.api.get_games(week).await?)
    }

    async fn class_id_map(&self) -> Result<HashMap<i64, i32>, CacheError> {
        Ok(classes::id_map(&self.ctx.pool).await?)
    }

    async fn upsert_games(&self, batch: Vec<NewGame>) -> Result<UpsertCounts, CacheError> {
        Ok(games::batch_upsert(&self.ctx.pool, &batch).await?)
    }
}

#[async_trait]
impl Orchestrator for GamesOrchestrator {
    fn caching_type(&self) -> CachingType {
        CachingType::Games
    }

    #[tracing::instrument(skip_all)]
    async fn run(&self, initiated_by: Option<String>) -> Result<RunOutcome, CacheError> {
        let started = Instant::now();
        let counts = run_games(self, initiated_by.clone()).await?;
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

/// Fetch-transform-upsert across every cached week, running exactly one
/// weeks cycle first when none are cached yet.
async fn run_games<B: GamesBackend>(
    backend: &B,
    initiated_by: Option<String>,
) -> Result<UpsertCounts, CacheError> {
    let mut cached_weeks = backend.cached_weeks().await?;
    if cached_weeks.is_empty() {
        info!("No weeks cached yet, running weeks caching first");
        backend.run_weeks(initiated_by).await?;
        cached_weeks = backend.cached_weeks().await?;
    }

    let class_ids = backend.class_id_map().await?;

    // One sequential call per week; run duration scales with week count.
    let mut by_external: HashMap<i64, NewGame> = HashMap::new();
    let mut unresolved = 0usize;
    for week in &cached_weeks {
        let raw = backend.fetch_games(&week.external_date).await?;
        debug!(week = %week.external_date, count = raw.len(), "Fetched games");

        let (batch, skipped) = transform_games(raw, &week.external_date, &class_ids);
        unresolved += skipped;
        for game in batch {
            // Re-listed games keep the latest snapshot.
            by_external.insert(game.external_id, game);
        }
    }

    if unresolved > 0 {
        warn!(
            count = unresolved,
            "Skipped games whose class reference did not resolve"
        );
    }

    backend.upsert_games(by_external.into_values().collect()).await
}

/// Transform raw games for one week, resolving the external class id to the
/// local one. Records with an unresolvable class reference are dropped; the
/// returned count says how many.
pub(crate) fn transform_games(
    raw: Vec<RawGame>,
    week: &str,
    class_ids: &HashMap<i64, i32>,
) -> (Vec<NewGame>, usize) {
    let mut batch = Vec::with_capacity(raw.len());
    let mut skipped = 0usize;

    for game in raw {
        let Some(&class_id) = class_ids.get(&game.g_class_id) else {
            debug!(
                game_id = game.g_id,
                class_external_id = game.g_class_id,
                "Dropping game with unresolved class reference"
            );
            skipped += 1;
            continue;
        };

        batch.push(NewGame {
            external_id: game.g_id,
            class_id,
            week: week.to_owned(),
            date: game.g_date,
            time: game.g_time,
            home_team: game.g_home_team,
            guest_team: game.g_guest_team,
            home_goals: parse_goals(game.g_home_goals.as_deref()),
            guest_goals: parse_goals(game.g_guest_goals.as_deref()),
            gymnasium_town: game.g_gymnasium_town,
            gymnasium_name: game.g_gymnasium_name,
            gymnasium_no: game.g_gymnasium_no,
        });
    }

    (batch, skipped)
}

/// Goals arrive as strings and stay blank until the game was played.
fn parse_goals(raw: Option<&str>) -> Option<i32> {
    raw.and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn raw(id: i64, class_id: i64, home_goals: Option<&str>) -> RawGame {
        RawGame {
            g_id: id,
            g_class_id: class_id,
            g_date: "21.09.25".to_owned(),
            g_time: "17:00".to_owned(),
            g_home_team: "SG Schozach".to_owned(),
            g_guest_team: "TV Flein".to_owned(),
            g_home_goals: home_goals.map(str::to_owned),
            g_guest_goals: Some("24".to_owned()),
            g_gymnasium_town: "Flein".to_owned(),
            g_gymnasium_name: "Sporthalle".to_owned(),
            g_gymnasium_no: "4021".to_owned(),
        }
    }

    fn week(id: i32, date: &str) -> Week {
        Week {
            id,
            external_date: date.to_owned(),
            is_current: false,
        }
    }

    /// In-memory backend recording the order of collaborator calls. Its
    /// weeks run caches one week, the way a real weeks cycle would.
    struct FakeBackend {
        weeks: Mutex<Vec<Week>>,
        games_by_week: HashMap<String, Vec<RawGame>>,
        class_ids: HashMap<i64, i32>,
        events: Mutex<Vec<String>>,
        upserted: Mutex<Vec<NewGame>>,
    }

    impl FakeBackend {
        fn new(weeks: Vec<Week>) -> Self {
            Self {
                weeks: Mutex::new(weeks),
                games_by_week: HashMap::from([(
                    "2025-09-21".to_owned(),
                    vec![raw(70231, 110, Some("27"))],
                )]),
                class_ids: HashMap::from([(110, 1)]),
                events: Mutex::new(Vec::new()),
                upserted: Mutex::new(Vec::new()),
            }
        }

        fn record(&self, event: impl Into<String>) {
            self.events.lock().unwrap().push(event.into());
        }

        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GamesBackend for FakeBackend {
        async fn cached_weeks(&self) -> Result<Vec<Week>, CacheError> {
            self.record("cached_weeks");
            Ok(self.weeks.lock().unwrap().clone())
        }

        async fn run_weeks(&self, _initiated_by: Option<String>) -> Result<(), CacheError> {
            self.record("run_weeks");
            *self.weeks.lock().unwrap() = vec![week(1, "2025-09-21")];
            Ok(())
        }

        async fn fetch_games(&self, week: &str) -> Result<Vec<RawGame>, CacheError> {
            self.record(format!("fetch_games {week}"));
            Ok(self.games_by_week.get(week).cloned().unwrap_or_default())
        }

        async fn class_id_map(&self) -> Result<HashMap<i64, i32>, CacheError> {
            self.record("class_id_map");
            Ok(self.class_ids.clone())
        }

        async fn upsert_games(&self, batch: Vec<NewGame>) -> Result<UpsertCounts, CacheError> {
            self.record("upsert_games");
            let counts = UpsertCounts::from_returned_flags(batch.len(), &[true]);
            *self.upserted.lock().unwrap() = batch;
            Ok(counts)
        }
    }

    #[tokio::test]
    async fn missing_weeks_run_exactly_one_weeks_cycle_first() {
        let backend = FakeBackend::new(Vec::new());

        run_games(&backend, None).await.unwrap();

        assert_eq!(
            backend.events(),
            [
                "cached_weeks",
                "run_weeks",
                "cached_weeks",
                "class_id_map",
                "fetch_games 2025-09-21",
                "upsert_games",
            ]
        );
        let upserted = backend.upserted.lock().unwrap();
        assert_eq!(upserted.len(), 1);
        assert_eq!(upserted[0].external_id, 70231);
    }

    #[tokio::test]
    async fn cached_weeks_skip_the_precondition_run() {
        let backend = FakeBackend::new(vec![week(1, "2025-09-21")]);

        run_games(&backend, None).await.unwrap();

        assert!(!backend.events().iter().any(|e| e == "run_weeks"));
    }

    #[test]
    fn resolves_class_references_and_drops_unknown() {
        let class_ids = HashMap::from([(110, 1), (112, 2)]);
        let (batch, skipped) = transform_games(
            vec![raw(1, 110, Some("27")), raw(2, 999, None), raw(3, 112, None)],
            "2025-09-21",
            &class_ids,
        );
        assert_eq!(batch.len(), 2);
        assert_eq!(skipped, 1);
        assert_eq!(batch[0].class_id, 1);
        assert_eq!(batch[1].class_id, 2);
        assert!(batch.iter().all(|g| g.week == "2025-09-21"));
    }

    #[test]
    fn blank_goals_stay_unset() {
        let class_ids = HashMap::from([(110, 1)]);
        let (batch, _) = transform_games(vec![raw(1, 110, Some(" "))], "2025-09-21", &class_ids);
        assert_eq!(batch[0].home_goals, None);
        assert_eq!(batch[0].guest_goals, Some(24));
    }
}
