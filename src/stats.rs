// File: src/stats.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// Named genres with their own "books finished" counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GenreCounter {
    Fantasy,
    Romance,
    Mystery,
}

impl GenreCounter {
    pub const ALL: [GenreCounter; 3] = [GenreCounter::Fantasy, GenreCounter::Romance, GenreCounter::Mystery];

    /// Substrings that mark a category as belonging to this genre.
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            GenreCounter::Fantasy => &["fantasy"],
            GenreCounter::Romance => &["romance"],
            GenreCounter::Mystery => &["mystery", "thriller", "crime"],
        }
    }

    /// Keyword heuristic: "urban-fantasy" counts as fantasy, and so would
    /// any category that merely contains the word.
    pub fn matches(self, category: &str) -> bool {
        self.keywords().iter().any(|k| category.contains(k))
    }
}

/// A `ReadingStats` field that awards can watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    PagesRead,
    FinishedBooks,
    SessionLogs,
    LibraryAdds,
    GenreVariety,
    GenreFinished(GenreCounter),
    LongestStreak,
}

/// Cumulative reading statistics for one user.
///
/// Serialized field names match the blob the web client keeps in storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReadingStats {
    pub pages_read: u64,
    pub finished_books: u64,
    pub session_logs: u64,
    pub library_adds: u64,
    pub genres_seen: BTreeSet<String>,
    pub genre_variety: u64,
    pub fantasy_finished: u64,
    pub romance_finished: u64,
    pub mystery_finished: u64,
    /// Consecutive reading days. Unlike every other counter this one resets.
    pub current_streak: u64,
    pub longest_streak: u64,
    #[serde(rename = "lastReadISO")]
    pub last_read: Option<DateTime<Utc>>,
}

impl ReadingStats {
    /// Decodes a stored stats blob. This is the only place loose values are
    /// coerced: missing, negative or non-numeric counters read as zero and a
    /// non-object blob reads as all defaults.
    pub fn decode(value: &Value) -> Self {
        let count = |key: &str| coerce_count(value.get(key));

        let genres_seen: BTreeSet<String> = value
            .get("genresSeen")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(crate::core::types::coerce_string)
                    .map(|g| crate::core::types::normalize_tag(&g))
                    .filter(|g| !g.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let last_read = value
            .get("lastReadISO")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        let current_streak = count("currentStreak");
        Self {
            pages_read: count("pagesRead"),
            finished_books: count("finishedBooks"),
            session_logs: count("sessionLogs"),
            library_adds: count("libraryAdds"),
            genre_variety: genres_seen.len() as u64,
            genres_seen,
            fantasy_finished: count("fantasyFinished"),
            romance_finished: count("romanceFinished"),
            mystery_finished: count("mysteryFinished"),
            current_streak,
            longest_streak: count("longestStreak").max(current_streak),
            last_read,
        }
    }

    pub fn to_value(&self) -> Value {
        // Plain data with string keys, serialization cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn metric(&self, metric: Metric) -> u64 {
        match metric {
            Metric::PagesRead => self.pages_read,
            Metric::FinishedBooks => self.finished_books,
            Metric::SessionLogs => self.session_logs,
            Metric::LibraryAdds => self.library_adds,
            Metric::GenreVariety => self.genre_variety,
            Metric::GenreFinished(genre) => self.genre_count(genre),
            Metric::LongestStreak => self.longest_streak,
        }
    }

    pub fn genre_count(&self, genre: GenreCounter) -> u64 {
        match genre {
            GenreCounter::Fantasy => self.fantasy_finished,
            GenreCounter::Romance => self.romance_finished,
            GenreCounter::Mystery => self.mystery_finished,
        }
    }

    fn genre_count_mut(&mut self, genre: GenreCounter) -> &mut u64 {
        match genre {
            GenreCounter::Fantasy => &mut self.fantasy_finished,
            GenreCounter::Romance => &mut self.romance_finished,
            GenreCounter::Mystery => &mut self.mystery_finished,
        }
    }

    /// Counts a finished book and folds its categories into the genre stats.
    /// Each named genre counter moves at most once per book.
    pub fn record_finish<S: AsRef<str>>(&mut self, categories: &[S]) {
        self.finished_books = self.finished_books.saturating_add(1);

        let categories: BTreeSet<String> = categories
            .iter()
            .map(|c| crate::core::types::normalize_tag(c.as_ref()))
            .filter(|c| !c.is_empty())
            .collect();

        for genre in GenreCounter::ALL {
            if categories.iter().any(|c| genre.matches(c)) {
                let count = self.genre_count_mut(genre);
                *count = count.saturating_add(1);
            }
        }

        self.genres_seen.extend(categories);
        self.genre_variety = self.genres_seen.len() as u64;
    }

    /// Moves the reading streak forward by UTC calendar day and stamps
    /// `last_read`.
    pub fn advance_streak(&mut self, now: DateTime<Utc>) {
        let gap = self
            .last_read
            .map(|last| (now.date_naive() - last.date_naive()).num_days());

        self.current_streak = match gap {
            Some(days) if days <= 0 => self.current_streak.max(1),
            Some(1) => self.current_streak.saturating_add(1),
            _ => 1,
        };
        self.longest_streak = self.longest_streak.max(self.current_streak);
        self.last_read = Some(now);
    }
}

/// Non-negative whole number from a number or numeric string; anything else
/// is zero. Huge values saturate at `u64::MAX`.
pub(crate) fn coerce_count(value: Option<&Value>) -> u64 {
    let as_float = |f: f64| if f.is_finite() && f > 0.0 { f.floor() as u64 } else { 0 };
    match value {
        Some(Value::Number(n)) => n.as_u64().unwrap_or_else(|| n.as_f64().map(as_float).unwrap_or(0)),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<u64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(as_float))
                .unwrap_or(0)
        }
        _ => 0,
    }
}
