// --- File: src/core/catalog.rs
use crate::core::types::CatalogItem;
use crate::error::Result;
use log::warn;
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;

const BUILTIN_CATALOG: &str = include_str!("../../data/catalog.json");

/// The fixed list of recommendable books. Order matters: it is the
/// tie-breaker for ranking and the order of the fallback rail.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: Vec<CatalogItem>,
}

impl Catalog {
    /// The catalog bundled with the application.
    pub fn builtin() -> Self {
        Self::from_json_str(BUILTIN_CATALOG).unwrap_or_else(|e| {
            warn!("Built-in catalog is unreadable, starting empty: {}", e);
            Self::default()
        })
    }

    pub fn from_items(items: Vec<CatalogItem>) -> Self {
        Self { items }
    }

    /// Parses a JSON array of catalog records. Records that cannot be used
    /// are skipped, as are repeated ids (first one wins).
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: Value = serde_json::from_str(json)?;
        let records = raw.as_array().map(Vec::as_slice).unwrap_or_default();

        let mut ids = HashSet::new();
        let mut items = Vec::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            match CatalogItem::from_value(record) {
                Some(item) if ids.insert(item.id.clone()) => items.push(item),
                Some(item) => warn!("Skipping duplicate catalog id '{}'", item.id),
                None => warn!("Skipping malformed catalog record #{}", i),
            }
        }
        Ok(Self { items })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_loads() {
        let catalog = Catalog::builtin();
        assert!(catalog.len() > 12);
        let first = &catalog.items()[0];
        assert_eq!(first.id, "g1");
        assert_eq!(first.title, "Ready Player One");
        assert!(first.tags.iter().any(|t| t == "gaming"));
    }

    #[test]
    fn builtin_tags_are_lowercase() {
        for item in Catalog::builtin().items() {
            for tag in &item.tags {
                assert_eq!(tag, &tag.to_lowercase(), "tag on {}", item.id);
            }
        }
    }

    #[test]
    fn malformed_and_duplicate_records_are_skipped() {
        let json = r#"[
            {"id": "a", "title": "A", "tags": ["x"]},
            {"title": "no id"},
            "garbage",
            {"id": "a", "title": "A again"},
            {"id": "b", "title": "B"}
        ]"#;
        let catalog = Catalog::from_json_str(json).unwrap();
        let ids: Vec<_> = catalog.items().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(catalog.items()[0].title, "A");
    }

    #[test]
    fn non_array_document_is_empty() {
        assert!(Catalog::from_json_str(r#"{"id": "a"}"#).unwrap().is_empty());
        assert!(Catalog::from_json_str("not json").is_err());
    }
}
