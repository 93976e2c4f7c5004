// File: src/tracker.rs
use crate::awards::{award_progress, AwardProgress, EarnedAwards};
use crate::config::TrackerConfig;
use crate::core::catalog::Catalog;
use crate::core::engine::{RailEntry, RecommendationEngine};
use crate::core::types::PreferenceSet;
use crate::error::Result;
use crate::ledger::{SessionOutcome, StatsLedger};
use crate::library::{AddOutcome, Library, LibraryBook, ReadingProgress};
use crate::persistence::{self, keys, FileStore, StatsStore};
use crate::stats::ReadingStats;
use log::{info, warn};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookAdded {
    pub outcome: AddOutcome,
    /// Ledger update, present only when a new book joined the shelf.
    pub ledger: Option<SessionOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadingLogged {
    pub progress: ReadingProgress,
    /// Ledger update, absent when the log credited no new pages.
    pub ledger: Option<SessionOutcome>,
}

/// Recommendations, shelf and ledger over one store.
pub struct ReadingTracker<S: StatsStore> {
    engine: RecommendationEngine,
    ledger: StatsLedger<S>,
}

impl ReadingTracker<FileStore> {
    /// Opens the file-backed tracker described by `config`.
    pub fn open(config: &TrackerConfig) -> Result<Self> {
        let catalog = match &config.catalog_path {
            Some(path) => Catalog::from_file(path).unwrap_or_else(|e| {
                warn!("Could not load catalog {}: {}, using built-in", path.display(), e);
                Catalog::builtin()
            }),
            None => Catalog::builtin(),
        };
        let store = FileStore::open(&config.store_path())?;
        info!("Tracker ready: {} catalog items", catalog.len());

        let engine = RecommendationEngine::new(catalog).with_rail_cap(config.rail_cap);
        Ok(Self::with_store(store, engine))
    }
}

impl<S: StatsStore> ReadingTracker<S> {
    pub fn with_store(store: S, engine: RecommendationEngine) -> Self {
        Self { engine, ledger: StatsLedger::new(store) }
    }

    /// Reads the stored preference arrays fresh on every call.
    pub fn preferences(&self) -> PreferenceSet {
        let store = self.ledger.store();
        let read = |key: &str| -> Option<Value> {
            store.get(key).unwrap_or_else(|e| {
                warn!("Could not read '{}': {}", key, e);
                None
            })
        };
        PreferenceSet::from_values(read(keys::SELECTED_HOBBIES).as_ref(), read(keys::SELECTED_GENRES).as_ref())
    }

    pub fn set_preferences(&mut self, prefs: &PreferenceSet) -> Result<()> {
        let store = self.ledger.store_mut();
        store.put(keys::SELECTED_HOBBIES, serde_json::to_value(&prefs.hobbies)?)?;
        store.put(keys::SELECTED_GENRES, serde_json::to_value(&prefs.genres)?)?;
        Ok(())
    }

    pub fn recommendations(&self) -> Vec<RailEntry<'_>> {
        self.engine.build_rail(&self.preferences())
    }

    pub fn books(&self) -> Vec<LibraryBook> {
        Library::load(self.ledger.store())
    }

    pub fn add_book(&mut self, book: LibraryBook) -> Result<BookAdded> {
        let outcome = Library::add_book(self.ledger.store_mut(), book)?;
        let ledger = match outcome {
            AddOutcome::Added => Some(self.ledger.record_library_addition()),
            AddOutcome::Merged { .. } => None,
        };
        Ok(BookAdded { outcome, ledger })
    }

    pub fn log_reading(&mut self, index: usize, pages: u32, total_pages: Option<u32>) -> Result<ReadingLogged> {
        let progress = Library::log_reading(self.ledger.store_mut(), index, pages, total_pages)?;
        let ledger = (progress.pages_credited > 0).then(|| {
            self.ledger.record_reading_session(
                u64::from(progress.pages_credited),
                progress.finished_now,
                &progress.categories,
            )
        });
        Ok(ReadingLogged { progress, ledger })
    }

    pub fn toggle_favorite(&mut self, index: usize) -> Result<bool> {
        Library::toggle_favorite(self.ledger.store_mut(), index)
    }

    pub fn stats(&self) -> ReadingStats {
        self.ledger.stats()
    }

    pub fn earned_awards(&self) -> EarnedAwards {
        self.ledger.earned_awards()
    }

    pub fn award_progress(&self) -> Vec<AwardProgress> {
        award_progress(&self.ledger.stats(), &self.ledger.earned_awards())
    }

    pub fn total_points(&self) -> u64 {
        self.ledger.earned_awards().total_points()
    }

    pub fn save_snapshot(&self, path: &Path) -> Result<()> {
        persistence::save_snapshot(&self.ledger.snapshot(), path)
    }

    pub fn restore_snapshot(&mut self, path: &Path) -> Result<()> {
        let snapshot = persistence::load_snapshot(path)?;
        self.ledger.restore(&snapshot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::awards::Award;
    use crate::persistence::MemoryStore;

    fn tracker() -> ReadingTracker<MemoryStore> {
        ReadingTracker::with_store(MemoryStore::new(), RecommendationEngine::new(Catalog::builtin()))
    }

    #[test]
    fn preferences_round_trip_through_store() {
        let mut tracker = tracker();
        assert!(tracker.preferences().is_empty());

        let prefs = PreferenceSet::new(["Gaming"], ["Fantasy", "Mystery"]);
        tracker.set_preferences(&prefs).unwrap();
        assert_eq!(tracker.preferences(), prefs);
    }

    #[test]
    fn rail_follows_preference_changes() {
        let mut tracker = tracker();
        assert!(tracker.recommendations().iter().all(|e| !e.matched));

        tracker.set_preferences(&PreferenceSet::new(["gaming"], ["scifi"])).unwrap();
        let rail = tracker.recommendations();
        assert_eq!(rail[0].item.id, "g1");
        assert_eq!(rail[0].score, 3);
        assert!(rail.iter().all(|e| e.matched));
    }

    #[test]
    fn only_new_books_count_as_additions() {
        let mut tracker = tracker();
        let book = LibraryBook { isbn: Some("9780545162074".into()), ..LibraryBook::new("Legend") };

        let first = tracker.add_book(book.clone()).unwrap();
        assert_eq!(first.ledger.unwrap().newly_earned, vec![Award::FirstAdd]);

        let again = tracker.add_book(book).unwrap();
        assert!(again.ledger.is_none());
        assert_eq!(tracker.stats().library_adds, 1);
        assert_eq!(tracker.books().len(), 1);
    }

    #[test]
    fn finishing_a_book_feeds_the_ledger() {
        let mut tracker = tracker();
        tracker
            .add_book(LibraryBook {
                pages: Some(60),
                categories: vec!["Fantasy".into()],
                ..LibraryBook::new("Short Fantasy")
            })
            .unwrap();

        let logged = tracker.log_reading(0, 100, None).unwrap();
        assert!(logged.progress.finished_now);
        let ledger = logged.ledger.unwrap();
        assert_eq!(ledger.stats.pages_read, 60);
        assert_eq!(ledger.stats.finished_books, 1);
        assert_eq!(ledger.stats.fantasy_finished, 1);
        assert!(ledger.newly_earned.contains(&Award::Pages50));
        assert!(ledger.newly_earned.contains(&Award::FirstFinish));

        let idle = tracker.log_reading(0, 5, None).unwrap();
        assert!(idle.ledger.is_none());
        assert_eq!(tracker.stats().session_logs, 1);
        assert!(tracker.total_points() > 0);
    }

    #[test]
    fn snapshot_backup_and_restore() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.bin");

        let mut source = tracker();
        source.add_book(LibraryBook { pages: Some(10), ..LibraryBook::new("Tiny") }).unwrap();
        source.log_reading(0, 10, None).unwrap();
        source.save_snapshot(&path).unwrap();

        let mut target = tracker();
        target.restore_snapshot(&path).unwrap();
        assert_eq!(target.stats(), source.stats());
        assert_eq!(target.earned_awards(), source.earned_awards());
    }
}
