use std::{collections::BTreeMap, sync::Arc};

use anyhow::{ensure, Result};
use chrono::Duration;
use tracing::{debug, warn};

use crate::utils::{clock::Clock, time::local_day_start};

use super::{
    entities::{ActivityCategory, ActivityRecord, RecordId, StoreSnapshot, DEFAULT_DAILY_GOAL},
    snapshot::SnapshotStorage,
};

/// Owns the canonical list of activity records together with the user
/// configuration. Mutations rewrite the whole snapshot, queries run over the
/// in-memory list.
///
/// The list is kept most recent first. Insertion order coincides with
/// timestamp order because the only source of new records is "now".
pub struct ActivityStore<S: SnapshotStorage> {
    storage: S,
    clock: Box<dyn Clock>,
    activities: Vec<ActivityRecord>,
    daily_goal: f64,
    api_key: String,
    next_id: RecordId,
}

impl<S: SnapshotStorage> ActivityStore<S> {
    /// Reads the persisted snapshot and builds a store on top of it.
    pub async fn load(storage: S, clock: Box<dyn Clock>) -> Result<Self> {
        let snapshot = storage.load().await?;
        let next_id = snapshot
            .activities
            .iter()
            .map(|a| a.id)
            .max()
            .map_or(1, |max| max + 1);

        Ok(Self {
            storage,
            clock,
            activities: snapshot.activities,
            daily_goal: sanitize_goal(snapshot.daily_goal),
            api_key: snapshot.api_key,
            next_id,
        })
    }

    /// Creates a record with a fresh id and the current timestamp, prepends
    /// it and persists. A negative or non-finite amount is a caller error and
    /// is rejected instead of clamped.
    pub async fn add_activity(
        &mut self,
        category: ActivityCategory,
        name: Arc<str>,
        carbon_kg: f64,
        is_reduction: bool,
    ) -> Result<RecordId> {
        ensure!(
            carbon_kg.is_finite() && carbon_kg >= 0.,
            "carbon amount must be a non-negative finite number, got {carbon_kg}"
        );

        let id = self.next_id;
        self.next_id += 1;
        let record = ActivityRecord {
            id,
            category,
            name,
            carbon_kg,
            timestamp: self.clock.now(),
            is_reduction,
        };
        debug!("Adding activity {record:?}");
        self.activities.insert(0, record);
        self.persist().await;
        Ok(id)
    }

    /// Deletes the record with a matching id. Removing an id that's already
    /// gone is a no-op.
    pub async fn remove_activity(&mut self, id: RecordId) {
        let before = self.activities.len();
        self.activities.retain(|a| a.id != id);
        if self.activities.len() == before {
            return;
        }
        self.persist().await;
    }

    pub async fn clear_activities(&mut self) {
        self.activities.clear();
        self.persist().await;
    }

    /// Replaces the daily goal. Goals are a forgiving ui setting, anything
    /// that isn't a positive finite number falls back to the default instead
    /// of failing.
    pub async fn set_daily_goal(&mut self, goal: f64) {
        self.daily_goal = sanitize_goal(goal);
        self.persist().await;
    }

    /// Stores the key verbatim. It's only handed to the external advice
    /// integration, no computation here reads it.
    pub async fn set_api_key(&mut self, key: String) {
        self.api_key = key;
        self.persist().await;
    }

    pub fn daily_goal(&self) -> f64 {
        self.daily_goal
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Read-only view of the records, most recent first.
    pub fn activities(&self) -> &[ActivityRecord] {
        &self.activities
    }

    /// Kg emitted since local midnight.
    pub fn today_emitted(&self) -> f64 {
        self.day_total(false)
    }

    /// Kg avoided since local midnight.
    pub fn today_reduced(&self) -> f64 {
        self.day_total(true)
    }

    fn day_total(&self, reduction: bool) -> f64 {
        let day_start = local_day_start(self.clock.now());
        self.activities
            .iter()
            .filter(|a| a.timestamp >= day_start && a.is_reduction == reduction)
            .map(|a| a.carbon_kg)
            .sum()
    }

    /// Kg emitted in the trailing 7x24h window. Unlike "today" this slides
    /// back from the current instant, a record exactly seven days old is
    /// still inside.
    pub fn week_emitted(&self) -> f64 {
        self.week_total(false)
    }

    /// Kg avoided in the trailing 7x24h window.
    pub fn week_reduced(&self) -> f64 {
        self.week_total(true)
    }

    fn week_total(&self, reduction: bool) -> f64 {
        let week_start = self.clock.now() - Duration::days(7);
        self.activities
            .iter()
            .filter(|a| a.timestamp >= week_start && a.is_reduction == reduction)
            .map(|a| a.carbon_kg)
            .sum()
    }

    /// Kg emitted in the trailing week grouped by category. Every category is
    /// present in the result, zero when it has no records.
    pub fn category_breakdown(&self) -> BTreeMap<ActivityCategory, f64> {
        let mut totals: BTreeMap<ActivityCategory, f64> = ActivityCategory::ALL
            .iter()
            .map(|category| (*category, 0.))
            .collect();

        let week_start = self.clock.now() - Duration::days(7);
        for record in self
            .activities
            .iter()
            .filter(|a| a.timestamp >= week_start && !a.is_reduction)
        {
            *totals
                .get_mut(&record.category)
                .expect("all categories are pre-seeded") += record.carbon_kg;
        }
        totals
    }

    /// Writes the whole state out. The write is best-effort, in-memory state
    /// stays authoritative for the session when it fails and the next
    /// mutation re-attempts a full write.
    async fn persist(&self) {
        let snapshot = StoreSnapshot {
            activities: self.activities.clone(),
            daily_goal: self.daily_goal,
            api_key: self.api_key.clone(),
        };
        if let Err(e) = self.storage.save(&snapshot).await {
            warn!("Failed to persist snapshot: {e:?}");
        }
    }
}

fn sanitize_goal(goal: f64) -> f64 {
    if goal.is_finite() && goal > 0. {
        goal
    } else {
        warn!("Ignoring invalid daily goal {goal}, falling back to {DEFAULT_DAILY_GOAL}");
        DEFAULT_DAILY_GOAL
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use anyhow::{anyhow, Result};
    use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

    use crate::{
        store::{
            entities::{ActivityCategory, StoreSnapshot, DEFAULT_DAILY_GOAL},
            snapshot::SnapshotStorage,
        },
        utils::{
            clock::{Clock, MockClock},
            logging::TEST_LOGGING,
        },
    };

    use super::ActivityStore;

    const TEST_START_DATE: NaiveDateTime = NaiveDateTime::new(
        NaiveDate::from_ymd_opt(2018, 7, 4).unwrap(),
        NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
    );

    fn test_start() -> DateTime<Utc> {
        Utc.from_utc_datetime(&TEST_START_DATE)
    }

    /// Keeps the last saved snapshot in memory so tests can inspect what
    /// would have hit the disk.
    #[derive(Clone, Default)]
    struct MemoryStorage {
        saved: Arc<Mutex<Option<StoreSnapshot>>>,
    }

    impl MemoryStorage {
        fn saved(&self) -> Option<StoreSnapshot> {
            self.saved.lock().unwrap().clone()
        }
    }

    impl SnapshotStorage for MemoryStorage {
        async fn load(&self) -> Result<StoreSnapshot> {
            Ok(self.saved().unwrap_or_default())
        }

        async fn save(&self, snapshot: &StoreSnapshot) -> Result<()> {
            *self.saved.lock().unwrap() = Some(snapshot.clone());
            Ok(())
        }
    }

    /// Every write fails, loads start clean.
    struct FailingStorage;

    impl SnapshotStorage for FailingStorage {
        async fn load(&self) -> Result<StoreSnapshot> {
            Ok(StoreSnapshot::default())
        }

        async fn save(&self, _snapshot: &StoreSnapshot) -> Result<()> {
            Err(anyhow!("disk unplugged"))
        }
    }

    #[derive(Clone)]
    struct AdjustableClock {
        now: Arc<Mutex<DateTime<Utc>>>,
    }

    impl AdjustableClock {
        fn new(start: DateTime<Utc>) -> Self {
            Self {
                now: Arc::new(Mutex::new(start)),
            }
        }

        fn set(&self, to: DateTime<Utc>) {
            *self.now.lock().unwrap() = to;
        }

        fn advance(&self, by: Duration) {
            let mut now = self.now.lock().unwrap();
            *now = *now + by;
        }
    }

    impl Clock for AdjustableClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }

    fn fixed_clock(at: DateTime<Utc>) -> Box<MockClock> {
        let mut clock = MockClock::new();
        clock.expect_now().returning(move || at);
        Box::new(clock)
    }

    async fn fixed_time_store() -> ActivityStore<MemoryStorage> {
        ActivityStore::load(MemoryStorage::default(), fixed_clock(test_start()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_add_assigns_fresh_ids_and_prepends() -> Result<()> {
        *TEST_LOGGING;
        let mut store = fixed_time_store().await;

        let first = store
            .add_activity(ActivityCategory::Transport, "Drive 10km".into(), 2.1, false)
            .await?;
        let second = store
            .add_activity(ActivityCategory::Food, "Beef meal 1meal".into(), 6.61, false)
            .await?;

        assert_ne!(first, second);
        assert_eq!(store.activities().len(), 2);
        assert_eq!(store.activities()[0].id, second);
        assert_eq!(store.activities()[1].id, first);
        Ok(())
    }

    #[tokio::test]
    async fn test_add_rejects_negative_and_non_finite_amounts() -> Result<()> {
        let mut store = fixed_time_store().await;

        for bad in [-1., f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let result = store
                .add_activity(ActivityCategory::Energy, "Electricity".into(), bad, false)
                .await;
            assert!(result.is_err(), "{bad} should be rejected");
        }

        assert!(store.activities().is_empty());
        assert_eq!(store.today_emitted(), 0.);
        Ok(())
    }

    #[tokio::test]
    async fn test_today_aggregates_split_emitted_and_reduced() -> Result<()> {
        let mut store = fixed_time_store().await;

        store
            .add_activity(ActivityCategory::Transport, "Drive 10km".into(), 2.1, false)
            .await?;
        store
            .add_activity(ActivityCategory::Transport, "Bus 11km".into(), 1.0, true)
            .await?;

        assert_eq!(store.today_emitted(), 2.1);
        assert_eq!(store.today_reduced(), 1.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_today_excludes_records_before_local_midnight() -> Result<()> {
        let clock = AdjustableClock::new(test_start());
        let mut store =
            ActivityStore::load(MemoryStorage::default(), Box::new(clock.clone())).await?;

        // Local midnight lies at most 24h behind "now" in every timezone, so
        // a record from 25 hours ago is on a previous day everywhere.
        clock.set(test_start() - Duration::hours(25));
        store
            .add_activity(ActivityCategory::Shopping, "New clothes 1item".into(), 10., false)
            .await?;

        clock.set(test_start());
        store
            .add_activity(ActivityCategory::Transport, "Drive 10km".into(), 2.1, false)
            .await?;

        assert_eq!(store.today_emitted(), 2.1);
        Ok(())
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() -> Result<()> {
        let mut store = fixed_time_store().await;

        let keep = store
            .add_activity(ActivityCategory::Food, "Pork meal 1meal".into(), 1.72, false)
            .await?;
        let removed = store
            .add_activity(ActivityCategory::Food, "Beef meal 1meal".into(), 6.61, false)
            .await?;

        store.remove_activity(removed).await;
        assert_eq!(store.activities().len(), 1);
        assert_eq!(store.today_emitted(), 1.72);

        store.remove_activity(removed).await;
        assert_eq!(store.activities().len(), 1);
        assert_eq!(store.activities()[0].id, keep);
        Ok(())
    }

    #[tokio::test]
    async fn test_clear_zeroes_every_aggregate() -> Result<()> {
        let mut store = fixed_time_store().await;

        store
            .add_activity(ActivityCategory::Transport, "Drive 10km".into(), 2.1, false)
            .await?;
        store
            .add_activity(ActivityCategory::Food, "Vegetarian meal 1meal".into(), 0.39, true)
            .await?;

        store.clear_activities().await;

        assert_eq!(store.today_emitted(), 0.);
        assert_eq!(store.today_reduced(), 0.);
        assert_eq!(store.week_emitted(), 0.);
        assert_eq!(store.week_reduced(), 0.);
        assert!(store.category_breakdown().values().all(|v| *v == 0.));
        Ok(())
    }

    #[tokio::test]
    async fn test_week_window_includes_exactly_seven_day_old_records() -> Result<()> {
        let clock = AdjustableClock::new(test_start());
        let mut store =
            ActivityStore::load(MemoryStorage::default(), Box::new(clock.clone())).await?;

        store
            .add_activity(ActivityCategory::Energy, "Electricity 4kWh".into(), 3.14, false)
            .await?;

        clock.advance(Duration::days(7));
        assert_eq!(store.week_emitted(), 3.14);

        clock.advance(Duration::milliseconds(1));
        assert_eq!(store.week_emitted(), 0.);
        Ok(())
    }

    #[tokio::test]
    async fn test_week_reduced_tracks_reduction_records() -> Result<()> {
        let clock = AdjustableClock::new(test_start());
        let mut store =
            ActivityStore::load(MemoryStorage::default(), Box::new(clock.clone())).await?;

        store
            .add_activity(ActivityCategory::Transport, "Metro 20km".into(), 0.7, true)
            .await?;
        clock.advance(Duration::days(3));

        assert_eq!(store.week_emitted(), 0.);
        assert_eq!(store.week_reduced(), 0.7);
        Ok(())
    }

    #[tokio::test]
    async fn test_category_breakdown_reports_every_category() -> Result<()> {
        let mut store = fixed_time_store().await;

        store
            .add_activity(ActivityCategory::Food, "Beef meal 1meal".into(), 6.61, false)
            .await?;
        store
            .add_activity(ActivityCategory::Transport, "Drive 10km".into(), 2.1, false)
            .await?;

        let breakdown = store.category_breakdown();
        assert_eq!(breakdown.len(), ActivityCategory::ALL.len());
        assert_eq!(breakdown[&ActivityCategory::Transport], 2.1);
        assert_eq!(breakdown[&ActivityCategory::Food], 6.61);
        assert_eq!(breakdown[&ActivityCategory::Energy], 0.);
        assert_eq!(breakdown[&ActivityCategory::Shopping], 0.);
        assert_eq!(breakdown[&ActivityCategory::Other], 0.);
        Ok(())
    }

    #[tokio::test]
    async fn test_category_breakdown_skips_reductions_and_old_records() -> Result<()> {
        let clock = AdjustableClock::new(test_start());
        let mut store =
            ActivityStore::load(MemoryStorage::default(), Box::new(clock.clone())).await?;

        store
            .add_activity(ActivityCategory::Energy, "Electricity 10kWh".into(), 7.85, false)
            .await?;
        clock.advance(Duration::days(8));

        store
            .add_activity(ActivityCategory::Transport, "Cycle 5km".into(), 1.05, true)
            .await?;

        assert!(store.category_breakdown().values().all(|v| *v == 0.));
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_goal_falls_back_to_default() -> Result<()> {
        let mut store = fixed_time_store().await;

        store.set_daily_goal(6.5).await;
        assert_eq!(store.daily_goal(), 6.5);

        for bad in [-1., 0., f64::NAN, f64::INFINITY] {
            store.set_daily_goal(bad).await;
            assert_eq!(store.daily_goal(), DEFAULT_DAILY_GOAL, "for input {bad}");
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_goal_is_sanitized_on_load() -> Result<()> {
        let storage = MemoryStorage::default();
        storage
            .save(&StoreSnapshot {
                daily_goal: -3.,
                ..Default::default()
            })
            .await?;

        let store = ActivityStore::load(storage, fixed_clock(test_start())).await?;
        assert_eq!(store.daily_goal(), DEFAULT_DAILY_GOAL);
        Ok(())
    }

    #[tokio::test]
    async fn test_api_key_is_stored_verbatim() -> Result<()> {
        let storage = MemoryStorage::default();
        let mut store = ActivityStore::load(storage.clone(), fixed_clock(test_start())).await?;

        store.set_api_key("  sk-live 键 \n".into()).await;
        assert_eq!(store.api_key(), "  sk-live 键 \n");
        assert_eq!(storage.saved().unwrap().api_key, "  sk-live 键 \n");
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_persist_keeps_in_memory_state() -> Result<()> {
        *TEST_LOGGING;
        let mut store = ActivityStore::load(FailingStorage, fixed_clock(test_start())).await?;

        let id = store
            .add_activity(ActivityCategory::Transport, "Drive 10km".into(), 2.1, false)
            .await?;

        assert_eq!(store.activities().len(), 1);
        assert_eq!(store.activities()[0].id, id);
        assert_eq!(store.today_emitted(), 2.1);
        Ok(())
    }

    #[tokio::test]
    async fn test_mutations_rewrite_the_whole_snapshot() -> Result<()> {
        let storage = MemoryStorage::default();
        let mut store = ActivityStore::load(storage.clone(), fixed_clock(test_start())).await?;

        store
            .add_activity(ActivityCategory::Food, "Chicken meal 1meal".into(), 0.98, false)
            .await?;
        store.set_daily_goal(5.).await;

        let saved = storage.saved().unwrap();
        assert_eq!(saved.activities.len(), 1);
        assert_eq!(saved.activities[0].carbon_kg, 0.98);
        assert_eq!(saved.daily_goal, 5.);
        Ok(())
    }

    #[tokio::test]
    async fn test_ids_stay_unique_across_reloads() -> Result<()> {
        let storage = MemoryStorage::default();

        let mut store = ActivityStore::load(storage.clone(), fixed_clock(test_start())).await?;
        store
            .add_activity(ActivityCategory::Shopping, "Plastic bag 2bag".into(), 0.02, false)
            .await?;
        let last = store
            .add_activity(ActivityCategory::Shopping, "Electronics 1item".into(), 50., false)
            .await?;
        drop(store);

        let mut reloaded = ActivityStore::load(storage, fixed_clock(test_start())).await?;
        let fresh = reloaded
            .add_activity(ActivityCategory::Other, "Recycling run".into(), 0., false)
            .await?;

        assert!(fresh > last);
        assert_eq!(reloaded.activities().len(), 3);
        Ok(())
    }
}
