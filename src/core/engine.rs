use crate::core::catalog::Catalog;
use crate::core::scoring::score_item;
use crate::core::types::{CatalogItem, PreferenceSet};
use log::debug;
use serde::Serialize;

/// How many catalog items the fallback rail shows.
pub const DEFAULT_RAIL_CAP: usize = 12;

/// One tile on the recommendation rail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RailEntry<'a> {
    pub item: &'a CatalogItem,
    pub score: u32,
    /// Tags to emphasize: the matched subset, or every tag on fallback tiles.
    pub tags: Vec<String>,
    /// False for fallback tiles shown because nothing matched.
    pub matched: bool,
}

/// Ranks the catalog against a user's preferences.
pub struct RecommendationEngine {
    catalog: Catalog,
    rail_cap: usize,
}

impl RecommendationEngine {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog, rail_cap: DEFAULT_RAIL_CAP }
    }

    pub fn with_rail_cap(mut self, rail_cap: usize) -> Self {
        self.rail_cap = rail_cap;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Builds the recommendation rail.
    ///
    /// Items with a positive score are returned best first, ties keeping
    /// catalog order. When nothing scores, the first `rail_cap` catalog items
    /// are returned as-is so the rail is never empty for a non-empty catalog.
    pub fn build_rail(&self, prefs: &PreferenceSet) -> Vec<RailEntry<'_>> {
        let mut matches: Vec<RailEntry<'_>> = self
            .catalog
            .items()
            .iter()
            .filter_map(|item| {
                let scored = score_item(item, prefs);
                (scored.score > 0).then(|| RailEntry {
                    item,
                    score: scored.score,
                    tags: scored.matched_tags,
                    matched: true,
                })
            })
            .collect();

        if !matches.is_empty() {
            // sort_by_key is stable, ties stay in catalog order
            matches.sort_by_key(|entry| std::cmp::Reverse(entry.score));
            debug!("Rail: {} matched items, top score {}", matches.len(), matches[0].score);
            return matches;
        }

        debug!("Rail: no matches, falling back to first {} catalog items", self.rail_cap);
        self.catalog
            .items()
            .iter()
            .take(self.rail_cap)
            .map(|item| RailEntry {
                item,
                score: 0,
                tags: item.normalized_tags(),
                matched: false,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(id: &str, tags: &[&str]) -> CatalogItem {
        CatalogItem {
            id: id.into(),
            title: format!("Book {}", id),
            author: "Someone".into(),
            pages: Some(200),
            cover: String::new(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn catalog_of(n: usize) -> Catalog {
        Catalog::from_items((0..n).map(|i| book(&i.to_string(), &["misc", "Shelf"])).collect())
    }

    fn ids<'a>(rail: &'a [RailEntry<'_>]) -> Vec<&'a str> {
        rail.iter().map(|e| e.item.id.as_str()).collect()
    }

    #[test]
    fn empty_preferences_fall_back_to_catalog_head() {
        let engine = RecommendationEngine::new(catalog_of(20));
        let rail = engine.build_rail(&PreferenceSet::default());

        assert_eq!(rail.len(), DEFAULT_RAIL_CAP);
        let expected: Vec<String> = (0..12).map(|i| i.to_string()).collect();
        assert_eq!(ids(&rail), expected.iter().map(String::as_str).collect::<Vec<_>>());
        for entry in &rail {
            assert!(!entry.matched);
            assert_eq!(entry.score, 0);
            assert_eq!(entry.tags, vec!["misc", "shelf"]);
        }
    }

    #[test]
    fn small_catalog_fallback_returns_everything() {
        let engine = RecommendationEngine::new(catalog_of(3));
        let prefs = PreferenceSet::new(["knitting"], ["westerns"]);
        assert_eq!(engine.build_rail(&prefs).len(), 3);
    }

    #[test]
    fn matches_sorted_descending_with_stable_ties() {
        let catalog = Catalog::from_items(vec![
            book("a", &["gaming"]),
            book("b", &["fantasy", "gaming"]),
            book("c", &["cooking"]),
            book("d", &["fantasy"]),
            book("e", &["gaming", "art"]),
        ]);
        let engine = RecommendationEngine::new(catalog);
        let prefs = PreferenceSet::new(["gaming", "art"], ["fantasy"]);
        let rail = engine.build_rail(&prefs);

        assert_eq!(ids(&rail), vec!["b", "d", "e", "a"]);
        let scores: Vec<u32> = rail.iter().map(|e| e.score).collect();
        assert_eq!(scores, vec![3, 2, 2, 1]);
        assert!(rail.iter().all(|e| e.matched && e.score > 0));
        assert_eq!(rail[0].tags, vec!["fantasy", "gaming"]);
    }

    #[test]
    fn matched_rail_is_not_capped() {
        let catalog = Catalog::from_items((0..30).map(|i| book(&i.to_string(), &["fantasy"])).collect());
        let engine = RecommendationEngine::new(catalog).with_rail_cap(5);
        let rail = engine.build_rail(&PreferenceSet::new(Vec::<&str>::new(), ["fantasy"]));
        assert_eq!(rail.len(), 30);
    }

    #[test]
    fn empty_catalog_gives_empty_rail() {
        let engine = RecommendationEngine::new(Catalog::default());
        assert!(engine.build_rail(&PreferenceSet::new(["x"], ["y"])).is_empty());
    }

    #[test]
    fn builtin_catalog_rail_never_empty() {
        let engine = RecommendationEngine::new(Catalog::builtin());
        for prefs in [
            PreferenceSet::default(),
            PreferenceSet::new(["gaming"], ["fantasy"]),
            PreferenceSet::new(["zzz-nothing"], ["yyy-nothing"]),
        ] {
            assert!(!engine.build_rail(&prefs).is_empty());
        }
    }
}
