// File: src/awards.rs
use crate::stats::{GenreCounter, Metric, ReadingStats};
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Every achievement the app can hand out. Serialized names match `id()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Award {
    FirstLog,
    #[serde(rename = "pages_50")]
    Pages50,
    #[serde(rename = "pages_500")]
    Pages500,
    #[serde(rename = "pages_1000")]
    Pages1000,
    FirstFinish,
    FiveFinished,
    GenreExplorer,
    FantasyFan,
    RomanceReader,
    MysterySolver,
    FirstAdd,
    Collector,
    #[serde(rename = "streak_3")]
    Streak3,
    #[serde(rename = "streak_7")]
    Streak7,
}

impl Award {
    pub const ALL: [Award; 14] = [
        Award::FirstLog,
        Award::Pages50,
        Award::Pages500,
        Award::Pages1000,
        Award::FirstFinish,
        Award::FiveFinished,
        Award::GenreExplorer,
        Award::FantasyFan,
        Award::RomanceReader,
        Award::MysterySolver,
        Award::FirstAdd,
        Award::Collector,
        Award::Streak3,
        Award::Streak7,
    ];

    /// Stable storage key.
    pub fn id(self) -> &'static str {
        match self {
            Award::FirstLog => "first_log",
            Award::Pages50 => "pages_50",
            Award::Pages500 => "pages_500",
            Award::Pages1000 => "pages_1000",
            Award::FirstFinish => "first_finish",
            Award::FiveFinished => "five_finished",
            Award::GenreExplorer => "genre_explorer",
            Award::FantasyFan => "fantasy_fan",
            Award::RomanceReader => "romance_reader",
            Award::MysterySolver => "mystery_solver",
            Award::FirstAdd => "first_add",
            Award::Collector => "collector",
            Award::Streak3 => "streak_3",
            Award::Streak7 => "streak_7",
        }
    }

    pub fn from_id(id: &str) -> Option<Award> {
        Award::ALL.into_iter().find(|a| a.id() == id)
    }

    pub fn label(self) -> &'static str {
        match self {
            Award::FirstLog => "First Log",
            Award::Pages50 => "Read 50 Pages",
            Award::Pages500 => "Read 500 Pages",
            Award::Pages1000 => "Page Turner: 1,000 Pages",
            Award::FirstFinish => "First Book Finished",
            Award::FiveFinished => "Finish 5 Books",
            Award::GenreExplorer => "Explore 3 Genres",
            Award::FantasyFan => "Fantasy Fan",
            Award::RomanceReader => "Romance Reader",
            Award::MysterySolver => "Mystery Solver",
            Award::FirstAdd => "First Book Added",
            Award::Collector => "Collector: 10 Books Added",
            Award::Streak3 => "3-Day Streak",
            Award::Streak7 => "7-Day Streak",
        }
    }

    pub fn metric(self) -> Metric {
        match self {
            Award::FirstLog => Metric::SessionLogs,
            Award::Pages50 | Award::Pages500 | Award::Pages1000 => Metric::PagesRead,
            Award::FirstFinish | Award::FiveFinished => Metric::FinishedBooks,
            Award::GenreExplorer => Metric::GenreVariety,
            Award::FantasyFan => Metric::GenreFinished(GenreCounter::Fantasy),
            Award::RomanceReader => Metric::GenreFinished(GenreCounter::Romance),
            Award::MysterySolver => Metric::GenreFinished(GenreCounter::Mystery),
            Award::FirstAdd | Award::Collector => Metric::LibraryAdds,
            Award::Streak3 | Award::Streak7 => Metric::LongestStreak,
        }
    }

    pub fn goal(self) -> u64 {
        match self {
            Award::FirstLog | Award::FirstFinish | Award::FirstAdd => 1,
            Award::Pages50 => 50,
            Award::Pages500 => 500,
            Award::Pages1000 => 1000,
            Award::FiveFinished => 5,
            Award::GenreExplorer | Award::FantasyFan | Award::RomanceReader | Award::MysterySolver => 3,
            Award::Collector => 10,
            Award::Streak3 => 3,
            Award::Streak7 => 7,
        }
    }

    /// Points added to the user's total when the award is earned.
    pub fn points(self) -> u64 {
        match self {
            Award::FirstLog | Award::FirstAdd => 10,
            Award::Pages50 | Award::FirstFinish => 25,
            Award::Streak3 => 30,
            Award::GenreExplorer | Award::FantasyFan | Award::RomanceReader | Award::MysterySolver => 40,
            Award::Pages500 | Award::FiveFinished | Award::Collector => 50,
            Award::Streak7 => 70,
            Award::Pages1000 => 100,
        }
    }

    /// True when the watched metric moved from below the goal to at or above it.
    pub fn crossed(self, before: &ReadingStats, after: &ReadingStats) -> bool {
        let goal = self.goal();
        before.metric(self.metric()) < goal && goal <= after.metric(self.metric())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarnedAward {
    pub earned_at: DateTime<Utc>,
}

/// Awards already handed out. Entries are never removed or overwritten.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarnedAwards {
    earned: BTreeMap<Award, EarnedAward>,
}

impl EarnedAwards {
    /// Decodes the stored `{ awardId: { earnedAt } }` map. Unknown ids are
    /// dropped. A known id with a bad timestamp still counts as earned.
    pub fn decode(value: &Value) -> Self {
        let mut earned = BTreeMap::new();
        let Some(entries) = value.as_object() else {
            return Self { earned };
        };
        for (id, record) in entries {
            let Some(award) = Award::from_id(id) else {
                warn!("Ignoring unknown award id '{}'", id);
                continue;
            };
            let earned_at = record
                .get("earnedAt")
                .and_then(Value::as_str)
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_default();
            earned.insert(award, EarnedAward { earned_at });
        }
        Self { earned }
    }

    pub fn to_value(&self) -> Value {
        let map: Map<String, Value> = self
            .earned
            .iter()
            .map(|(award, record)| {
                let record = serde_json::json!({ "earnedAt": record.earned_at.to_rfc3339() });
                (award.id().to_string(), record)
            })
            .collect();
        Value::Object(map)
    }

    pub fn contains(&self, award: Award) -> bool {
        self.earned.contains_key(&award)
    }

    pub fn get(&self, award: Award) -> Option<&EarnedAward> {
        self.earned.get(&award)
    }

    pub fn len(&self) -> usize {
        self.earned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.earned.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Award, &EarnedAward)> {
        self.earned.iter().map(|(a, e)| (*a, e))
    }

    /// Records an award. Returns false if it was already earned, in which
    /// case the original timestamp is kept.
    pub fn grant(&mut self, award: Award, now: DateTime<Utc>) -> bool {
        if self.earned.contains_key(&award) {
            return false;
        }
        self.earned.insert(award, EarnedAward { earned_at: now });
        true
    }

    /// Grants every award whose goal lies between `before` and `after` and
    /// that has not been earned yet. Returns only the newly granted ones, in
    /// table order.
    pub fn unlock_crossed(&mut self, before: &ReadingStats, after: &ReadingStats, now: DateTime<Utc>) -> Vec<Award> {
        let mut unlocked = Vec::new();
        for award in Award::ALL {
            if award.crossed(before, after) && self.grant(award, now) {
                info!("Award unlocked: {} ({})", award.label(), award.id());
                unlocked.push(award);
            }
        }
        unlocked
    }

    pub fn total_points(&self) -> u64 {
        self.earned.keys().map(|a| a.points()).sum()
    }
}

/// Progress toward one award, for badge shelves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AwardProgress {
    pub award: Award,
    pub id: &'static str,
    pub label: &'static str,
    pub current: u64,
    pub goal: u64,
    pub earned: bool,
}

pub fn award_progress(stats: &ReadingStats, earned: &EarnedAwards) -> Vec<AwardProgress> {
    Award::ALL
        .into_iter()
        .map(|award| AwardProgress {
            award,
            id: award.id(),
            label: award.label(),
            current: stats.metric(award.metric()).min(award.goal()),
            goal: award.goal(),
            earned: earned.contains(award),
        })
        .collect()
}
