//! The live trigger registry: one in-memory entry per registered job,
//! holding its parsed schedule and, while enabled, a running task that
//! sleeps until the next cron occurrence and dispatches.
//!
//! State machine per entry: registered+stopped <-> registered+running,
//! terminal removed. Stopping cancels the task before its next fire; a fire
//! already in progress runs to completion.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use cron::Schedule;
use futures::future::BoxFuture;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::data::models::CachingType;

/// Dispatch callback invoked on every trigger fire.
pub type FireFn = Arc<dyn Fn(i32, CachingType) -> BoxFuture<'static, ()> + Send + Sync>;

pub struct TriggerSet {
    fire: FireFn,
    triggers: Mutex<HashMap<i32, LiveTrigger>>,
}

struct LiveTrigger {
    caching_type: CachingType,
    schedule: Schedule,
    running: Option<RunningTrigger>,
}

struct RunningTrigger {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl TriggerSet {
    pub fn new(fire: FireFn) -> Self {
        Self {
            fire,
            triggers: Mutex::new(HashMap::new()),
        }
    }

    /// Register a trigger for a job id, optionally starting it immediately.
    /// Re-registering an id replaces the previous trigger.
    pub fn register(&self, job_id: i32, caching_type: CachingType, schedule: Schedule, start: bool) {
        let running = start.then(|| self.spawn_loop(job_id, caching_type, schedule.clone()));
        let mut triggers = self.triggers.lock().unwrap();
        if let Some(previous) = triggers.insert(
            job_id,
            LiveTrigger {
                caching_type,
                schedule,
                running,
            },
        ) {
            cancel_running(previous.running);
        }
    }

    /// Replace the firing schedule of an existing trigger, restarting its
    /// task if it was running. Returns false for unregistered ids.
    pub fn set_schedule(&self, job_id: i32, schedule: Schedule) -> bool {
        let mut triggers = self.triggers.lock().unwrap();
        let Some(trigger) = triggers.get_mut(&job_id) else {
            return false;
        };
        trigger.schedule = schedule;
        if let Some(previous) = trigger.running.take() {
            cancel_running(Some(previous));
            trigger.running =
                Some(self.spawn_loop(job_id, trigger.caching_type, trigger.schedule.clone()));
        }
        true
    }

    /// Redirect an existing trigger to another caching type, restarting its
    /// task if it was running. Returns false for unregistered ids.
    pub fn set_caching_type(&self, job_id: i32, caching_type: CachingType) -> bool {
        let mut triggers = self.triggers.lock().unwrap();
        let Some(trigger) = triggers.get_mut(&job_id) else {
            return false;
        };
        trigger.caching_type = caching_type;
        if let Some(previous) = trigger.running.take() {
            cancel_running(Some(previous));
            trigger.running =
                Some(self.spawn_loop(job_id, trigger.caching_type, trigger.schedule.clone()));
        }
        true
    }

    /// Start a stopped trigger. Returns false for unregistered ids; a
    /// trigger that is already running is left alone.
    pub fn start(&self, job_id: i32) -> bool {
        let mut triggers = self.triggers.lock().unwrap();
        let Some(trigger) = triggers.get_mut(&job_id) else {
            return false;
        };
        if trigger.running.is_none() {
            trigger.running =
                Some(self.spawn_loop(job_id, trigger.caching_type, trigger.schedule.clone()));
        }
        true
    }

    /// Stop a running trigger without unregistering it. Returns false for
    /// unregistered ids.
    pub fn stop(&self, job_id: i32) -> bool {
        let mut triggers = self.triggers.lock().unwrap();
        let Some(trigger) = triggers.get_mut(&job_id) else {
            return false;
        };
        cancel_running(trigger.running.take());
        true
    }

    /// Remove a trigger entirely, cancelling its task if running. Returns
    /// false if the id was never registered.
    pub fn remove(&self, job_id: i32) -> bool {
        let removed = self.triggers.lock().unwrap().remove(&job_id);
        match removed {
            Some(trigger) => {
                cancel_running(trigger.running);
                true
            }
            None => false,
        }
    }

    #[cfg(test)]
    pub fn is_registered(&self, job_id: i32) -> bool {
        self.triggers.lock().unwrap().contains_key(&job_id)
    }

    #[cfg(test)]
    pub fn is_running(&self, job_id: i32) -> bool {
        self.triggers
            .lock()
            .unwrap()
            .get(&job_id)
            .is_some_and(|t| t.running.is_some())
    }

    /// Cancel every running task and wait for each to exit.
    pub async fn shutdown(&self) {
        let handles: Vec<JoinHandle<()>> = {
            let mut triggers = self.triggers.lock().unwrap();
            triggers
                .values_mut()
                .filter_map(|trigger| trigger.running.take())
                .map(|running| {
                    running.cancel.cancel();
                    running.handle
                })
                .collect()
        };
        for handle in handles {
            let _ = handle.await;
        }
    }

    fn spawn_loop(
        &self,
        job_id: i32,
        caching_type: CachingType,
        schedule: Schedule,
    ) -> RunningTrigger {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let fire = self.fire.clone();

        let handle = tokio::spawn(async move {
            let mut after = Utc::now();
            loop {
                let Some(next) = next_after(&schedule, after) else {
                    warn!(job_id, "Schedule has no upcoming occurrence, trigger going idle");
                    break;
                };
                let delay = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);

                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {
                        debug!(job_id, caching_type = %caching_type, "Trigger fired");
                        // A stop() during this await does not interrupt the run.
                        fire(job_id, caching_type).await;
                        after = next;
                    }
                }
            }
        });

        RunningTrigger { cancel, handle }
    }
}

/// Next occurrence strictly after the one last fired. Computing from the
/// fired occurrence instead of the wall clock means a timer that wakes
/// marginally early can never fire the same occurrence twice.
fn next_after(schedule: &Schedule, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
    schedule.after(&after).next()
}

fn cancel_running(running: Option<RunningTrigger>) {
    if let Some(running) = running {
        running.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::str::FromStr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_set() -> (TriggerSet, Arc<AtomicUsize>) {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let fire: FireFn = Arc::new(move |_, _| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            .boxed()
        });
        (TriggerSet::new(fire), fired)
    }

    fn every_second() -> Schedule {
        Schedule::from_str("* * * * * *").unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn started_trigger_fires() {
        let (set, fired) = counting_set();
        set.register(1, CachingType::Weeks, every_second(), true);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(fired.load(Ordering::SeqCst) >= 1);
        assert!(set.is_registered(1));
        assert!(set.is_running(1));
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_trigger_does_not_fire_until_restarted() {
        let (set, fired) = counting_set();
        set.register(7, CachingType::Games, every_second(), true);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(set.stop(7));
        tokio::time::sleep(Duration::from_millis(10)).await;

        // Still registered, no longer firing.
        let frozen = fired.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(fired.load(Ordering::SeqCst), frozen);
        assert!(set.is_registered(7));
        assert!(!set.is_running(7));

        // Re-enabling resumes without a re-register.
        assert!(set.start(7));
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(fired.load(Ordering::SeqCst) > frozen);
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_registration_stays_stopped() {
        let (set, fired) = counting_set();
        set.register(3, CachingType::Tables, every_second(), false);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(set.is_registered(3));
        assert!(!set.is_running(3));
    }

    #[tokio::test(start_paused = true)]
    async fn removed_trigger_is_gone() {
        let (set, fired) = counting_set();
        set.register(5, CachingType::Classes, every_second(), true);
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert!(set.remove(5));
        tokio::time::sleep(Duration::from_millis(10)).await;
        let frozen = fired.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(fired.load(Ordering::SeqCst), frozen);
        assert!(!set.is_registered(5));
        assert!(!set.remove(5));
    }

    #[tokio::test(start_paused = true)]
    async fn schedule_update_applies_to_running_trigger() {
        let (set, fired) = counting_set();
        // Registered against a schedule that effectively never fires.
        let yearly = Schedule::from_str("0 0 0 1 1 *").unwrap();
        set.register(9, CachingType::Weeks, yearly, true);
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        // Subsequent fires follow the new schedule without a restart.
        assert!(set.set_schedule(9, every_second()));
        assert!(set.is_running(9));
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(fired.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn early_timer_wake_cannot_refire_the_same_occurrence() {
        use chrono::TimeZone;
        let schedule = every_second();
        let start = Utc.with_ymd_and_hms(2025, 9, 21, 17, 0, 0).unwrap();
        let first = next_after(&schedule, start).unwrap();

        // The next occurrence is computed from the fired one, so a wall
        // clock still short of `first` at wake time yields a strictly
        // later occurrence, never `first` again.
        let second = next_after(&schedule, first).unwrap();
        assert!(second > first);
        assert_eq!((second - first).num_seconds(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn mutating_unregistered_id_reports_false() {
        let (set, _) = counting_set();
        assert!(!set.stop(42));
        assert!(!set.start(42));
        assert!(!set.set_schedule(42, every_second()));
        assert!(!set.set_caching_type(42, CachingType::Games));
    }
}
