// File: src/core/scoring.rs
use crate::core::types::{CatalogItem, PreferenceSet};
use serde::Serialize;

/// Weight of a tag found in the user's genres.
pub const GENRE_WEIGHT: u32 = 2;
/// Weight of a tag found only in the user's hobbies.
pub const HOBBY_WEIGHT: u32 = 1;

/// Relevance of one item for one user. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemScore {
    pub score: u32,
    /// Normalized tags that hit either preference set, in tag order.
    pub matched_tags: Vec<String>,
}

/// Scores an item against the user's preferences.
///
/// Each distinct tag contributes at most once: `GENRE_WEIGHT` if it is one of
/// the user's genres, otherwise `HOBBY_WEIGHT` if it is one of their hobbies.
pub fn score_item(item: &CatalogItem, prefs: &PreferenceSet) -> ItemScore {
    let mut score = 0;
    let mut matched_tags = Vec::new();

    for tag in item.normalized_tags() {
        let weight = if prefs.genres.contains(&tag) {
            GENRE_WEIGHT
        } else if prefs.hobbies.contains(&tag) {
            HOBBY_WEIGHT
        } else {
            continue;
        };
        score += weight;
        matched_tags.push(tag);
    }

    ItemScore { score, matched_tags }
}
