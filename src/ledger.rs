// File: src/ledger.rs
use crate::awards::{Award, EarnedAwards};
use crate::persistence::{keys, LedgerSnapshot, StatsStore};
use crate::stats::ReadingStats;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Serialize;

/// Result of one ledger event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionOutcome {
    pub stats: ReadingStats,
    pub newly_earned: Vec<Award>,
}

/// Sole writer of the reading stats and the earned-awards map.
///
/// Every event is a full read-modify-write of both records. `&mut self`
/// keeps writers exclusive; share a ledger across threads only behind a lock.
pub struct StatsLedger<S: StatsStore> {
    store: S,
}

impl<S: StatsStore> StatsLedger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Current stats, or zeroes if nothing usable is stored.
    pub fn stats(&self) -> ReadingStats {
        match self.store.get(keys::READING_STATS) {
            Ok(Some(value)) => ReadingStats::decode(&value),
            Ok(None) => ReadingStats::default(),
            Err(e) => {
                warn!("Could not read reading stats, using defaults: {}", e);
                ReadingStats::default()
            }
        }
    }

    pub fn earned_awards(&self) -> EarnedAwards {
        match self.store.get(keys::EARNED_AWARDS) {
            Ok(Some(value)) => EarnedAwards::decode(&value),
            Ok(None) => EarnedAwards::default(),
            Err(e) => {
                warn!("Could not read earned awards, using defaults: {}", e);
                EarnedAwards::default()
            }
        }
    }

    pub fn record_reading_session<C: AsRef<str>>(
        &mut self,
        pages_added: u64,
        finished: bool,
        finished_categories: &[C],
    ) -> SessionOutcome {
        self.record_reading_session_at(pages_added, finished, finished_categories, Utc::now())
    }

    /// Logs `pages_added` pages read at `now`, optionally finishing a book
    /// with the given categories. Callers must pass a positive page count.
    pub fn record_reading_session_at<C: AsRef<str>>(
        &mut self,
        pages_added: u64,
        finished: bool,
        finished_categories: &[C],
        now: DateTime<Utc>,
    ) -> SessionOutcome {
        let before = self.stats();
        let mut after = before.clone();

        after.pages_read = after.pages_read.saturating_add(pages_added);
        after.session_logs = after.session_logs.saturating_add(1);
        if finished {
            after.record_finish(finished_categories);
        }
        after.advance_streak(now);

        debug!(
            "Reading session: +{} pages (total {}), finished={}",
            pages_added, after.pages_read, finished
        );
        self.commit(before, after, now)
    }

    pub fn record_library_addition(&mut self) -> SessionOutcome {
        self.record_library_addition_at(Utc::now())
    }

    pub fn record_library_addition_at(&mut self, now: DateTime<Utc>) -> SessionOutcome {
        let before = self.stats();
        let mut after = before.clone();
        after.library_adds = after.library_adds.saturating_add(1);

        debug!("Library addition: {} total", after.library_adds);
        self.commit(before, after, now)
    }

    /// Replaces both records with a snapshot's contents.
    pub fn restore(&mut self, snapshot: &LedgerSnapshot) {
        self.save(keys::READING_STATS, snapshot.stats.to_value());
        self.save(keys::EARNED_AWARDS, snapshot.earned.to_value());
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            stats: self.stats(),
            earned: self.earned_awards(),
        }
    }

    fn commit(&mut self, before: ReadingStats, after: ReadingStats, now: DateTime<Utc>) -> SessionOutcome {
        self.save(keys::READING_STATS, after.to_value());

        let mut earned = self.earned_awards();
        let newly_earned = earned.unlock_crossed(&before, &after, now);
        if !newly_earned.is_empty() {
            self.save(keys::EARNED_AWARDS, earned.to_value());
        }

        SessionOutcome { stats: after, newly_earned }
    }

    fn save(&mut self, key: &str, value: serde_json::Value) {
        if let Err(e) = self.store.put(key, value) {
            warn!("Could not persist '{}': {}", key, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::persistence::MemoryStore;
    use chrono::TimeZone;
    use serde_json::{json, Value};

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, d, 18, 0, 0).unwrap()
    }

    fn ledger() -> StatsLedger<MemoryStore> {
        StatsLedger::new(MemoryStore::new())
    }

    const NONE: &[&str] = &[];

    #[test]
    fn first_session_starts_from_zero() {
        let mut ledger = ledger();
        let outcome = ledger.record_reading_session_at(20, false, NONE, day(1));

        assert_eq!(outcome.stats.pages_read, 20);
        assert_eq!(outcome.stats.session_logs, 1);
        assert_eq!(outcome.stats.finished_books, 0);
        assert_eq!(outcome.stats.last_read, Some(day(1)));
        assert_eq!(outcome.newly_earned, vec![Award::FirstLog]);
        assert_eq!(ledger.stats(), outcome.stats);
    }

    #[test]
    fn fifty_page_award_fires_once() {
        let mut ledger = ledger();
        ledger
            .store_mut()
            .put(keys::READING_STATS, json!({"pagesRead": 45, "sessionLogs": 3}))
            .unwrap();

        let first = ledger.record_reading_session_at(10, false, NONE, day(1));
        assert_eq!(first.stats.pages_read, 55);
        assert_eq!(first.newly_earned, vec![Award::Pages50]);

        let second = ledger.record_reading_session_at(10, false, NONE, day(1));
        assert_eq!(second.stats.pages_read, 65);
        assert!(second.newly_earned.is_empty());
        assert!(ledger.earned_awards().contains(Award::Pages50));
    }

    #[test]
    fn stale_before_cannot_refire() {
        let mut ledger = ledger();
        ledger.record_reading_session_at(60, false, NONE, day(1));
        // Wind the stats back as if a stale copy were written over them.
        ledger.store_mut().put(keys::READING_STATS, json!({"pagesRead": 0})).unwrap();

        let outcome = ledger.record_reading_session_at(60, false, NONE, day(1));
        assert!(!outcome.newly_earned.contains(&Award::Pages50));
        assert!(!outcome.newly_earned.contains(&Award::FirstLog));
    }

    #[test]
    fn finishing_can_unlock_several_awards() {
        let mut ledger = ledger();
        ledger
            .store_mut()
            .put(
                keys::READING_STATS,
                json!({
                    "pagesRead": 900,
                    "sessionLogs": 12,
                    "finishedBooks": 4,
                    "genresSeen": ["romance", "poetry"],
                    "fantasyFinished": 2
                }),
            )
            .unwrap();

        let outcome = ledger.record_reading_session_at(150, true, &["Fantasy", "Adventure"], day(2));

        assert_eq!(outcome.stats.finished_books, 5);
        assert_eq!(outcome.stats.genre_variety, 4);
        assert_eq!(outcome.stats.fantasy_finished, 3);
        assert_eq!(
            outcome.newly_earned,
            vec![Award::Pages1000, Award::FiveFinished, Award::GenreExplorer, Award::FantasyFan]
        );
    }

    #[test]
    fn finished_books_moves_only_when_finished() {
        let mut ledger = ledger();
        let a = ledger.record_reading_session_at(5, false, &["fantasy"], day(1));
        assert_eq!(a.stats.finished_books, 0);
        assert!(a.stats.genres_seen.is_empty());
        let b = ledger.record_reading_session_at(5, true, &["fantasy"], day(1));
        assert_eq!(b.stats.finished_books, 1);
        assert!(b.stats.pages_read > a.stats.pages_read);
        assert!(b.stats.session_logs > a.stats.session_logs);
    }

    #[test]
    fn library_additions_unlock_their_awards() {
        let mut ledger = ledger();
        let first = ledger.record_library_addition_at(day(1));
        assert_eq!(first.newly_earned, vec![Award::FirstAdd]);
        for _ in 0..8 {
            assert!(ledger.record_library_addition_at(day(1)).newly_earned.is_empty());
        }
        let tenth = ledger.record_library_addition_at(day(1));
        assert_eq!(tenth.stats.library_adds, 10);
        assert_eq!(tenth.newly_earned, vec![Award::Collector]);
        assert_eq!(tenth.stats.session_logs, 0);
    }

    #[test]
    fn streak_awards_follow_consecutive_days() {
        let mut ledger = ledger();
        ledger.record_reading_session_at(5, false, NONE, day(1));
        ledger.record_reading_session_at(5, false, NONE, day(2));
        let third = ledger.record_reading_session_at(5, false, NONE, day(3));
        assert_eq!(third.stats.current_streak, 3);
        assert_eq!(third.newly_earned, vec![Award::Streak3]);
    }

    #[test]
    fn corrupt_records_read_as_defaults() {
        let mut ledger = ledger();
        ledger.store_mut().put(keys::READING_STATS, json!("garbage")).unwrap();
        ledger.store_mut().put(keys::EARNED_AWARDS, json!(17)).unwrap();

        let outcome = ledger.record_reading_session_at(3, false, NONE, day(1));
        assert_eq!(outcome.stats.pages_read, 3);
        assert_eq!(outcome.newly_earned, vec![Award::FirstLog]);
    }

    #[test]
    fn huge_stored_counters_saturate() {
        let mut ledger = ledger();
        ledger
            .store_mut()
            .put(
                keys::READING_STATS,
                json!({
                    "pagesRead": 1e30,
                    "sessionLogs": "18446744073709551615",
                    "finishedBooks": u64::MAX,
                    "libraryAdds": 1e300,
                    "mysteryFinished": u64::MAX,
                    "currentStreak": u64::MAX,
                    "lastReadISO": "2024-07-01T08:00:00Z"
                }),
            )
            .unwrap();

        let outcome = ledger.record_reading_session_at(10, true, &["mystery"], day(2));
        assert_eq!(outcome.stats.pages_read, u64::MAX);
        assert_eq!(outcome.stats.session_logs, u64::MAX);
        assert_eq!(outcome.stats.finished_books, u64::MAX);
        assert_eq!(outcome.stats.mystery_finished, u64::MAX);
        assert_eq!(outcome.stats.current_streak, u64::MAX);
        assert!(!outcome.newly_earned.contains(&Award::Pages50));

        let added = ledger.record_library_addition_at(day(2));
        assert_eq!(added.stats.library_adds, u64::MAX);
        assert_eq!(ledger.stats().pages_read, u64::MAX);
    }

    struct BrokenStore;

    impl StatsStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<Value>> {
            Err(Error::NotFound("disk gone".into()))
        }
        fn put(&mut self, _key: &str, _value: Value) -> Result<()> {
            Err(Error::NotFound("disk gone".into()))
        }
    }

    #[test]
    fn store_failures_never_surface() {
        let mut ledger = StatsLedger::new(BrokenStore);
        let outcome = ledger.record_reading_session_at(12, true, &["mystery"], day(1));
        assert_eq!(outcome.stats.pages_read, 12);
        assert_eq!(outcome.stats.mystery_finished, 1);
        assert!(outcome.newly_earned.contains(&Award::FirstFinish));
        assert_eq!(ledger.stats(), ReadingStats::default());
    }

    #[test]
    fn snapshot_restore_replaces_state() {
        let mut source = ledger();
        source.record_reading_session_at(75, true, &["romance"], day(4));
        let snapshot = source.snapshot();

        let mut target = ledger();
        target.restore(&snapshot);
        assert_eq!(target.stats(), snapshot.stats);
        assert_eq!(target.earned_awards(), snapshot.earned);
    }
}
