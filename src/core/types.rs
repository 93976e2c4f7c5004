// src/core/types.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// A recommendable book from the built-in catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: String,
    pub title: String,
    pub author: String,
    pub pages: Option<u32>,
    pub cover: String,
    /// Topical labels. Hobby-like and genre-like tags live side by side;
    /// they only differ in which preference set they end up matching.
    pub tags: Vec<String>,
}

impl CatalogItem {
    /// Decodes one catalog record, coercing scalar fields where possible.
    /// Returns `None` for records with no usable id or title.
    pub fn from_value(value: &Value) -> Option<Self> {
        let id = coerce_string(value.get("id")?)?;
        let title = coerce_string(value.get("title")?)?;
        if id.is_empty() || title.is_empty() {
            return None;
        }
        let author = value.get("author").and_then(coerce_string).unwrap_or_default();
        let cover = value
            .get("cover")
            .or_else(|| value.get("img"))
            .and_then(coerce_string)
            .unwrap_or_default();
        let pages = value.get("pages").and_then(coerce_positive);
        let tags = value
            .get("tags")
            .and_then(Value::as_array)
            .map(|tags| tags.iter().filter_map(coerce_string).collect())
            .unwrap_or_default();

        Some(Self { id, title, author, pages, cover, tags })
    }

    /// The item's tags lowercased, trimmed and deduplicated, in first-seen order.
    pub fn normalized_tags(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.tags
            .iter()
            .map(|t| normalize_tag(t))
            .filter(|t| !t.is_empty() && seen.insert(t.clone()))
            .collect()
    }
}

/// The user's declared interests. Both sets hold normalized tags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceSet {
    pub hobbies: BTreeSet<String>,
    pub genres: BTreeSet<String>,
}

impl PreferenceSet {
    pub fn new<H, G>(hobbies: H, genres: G) -> Self
    where
        H: IntoIterator,
        H::Item: AsRef<str>,
        G: IntoIterator,
        G::Item: AsRef<str>,
    {
        Self {
            hobbies: normalize_all(hobbies),
            genres: normalize_all(genres),
        }
    }

    /// Builds a set from two loosely-typed JSON arrays. Entries that are not
    /// strings or numbers are skipped.
    pub fn from_values(hobbies: Option<&Value>, genres: Option<&Value>) -> Self {
        Self {
            hobbies: normalize_all(string_array(hobbies)),
            genres: normalize_all(string_array(genres)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hobbies.is_empty() && self.genres.is_empty()
    }
}

/// Canonical form used on both sides of every tag comparison.
pub fn normalize_tag(tag: &str) -> String {
    tag.trim().to_lowercase()
}

fn normalize_all<I>(tags: I) -> BTreeSet<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    tags.into_iter()
        .map(|t| normalize_tag(t.as_ref()))
        .filter(|t| !t.is_empty())
        .collect()
}

fn string_array(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(coerce_string).collect())
        .unwrap_or_default()
}

/// Strings pass through, numbers and booleans are stringified, anything else
/// is rejected.
pub(crate) fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Positive integer from a number or numeric string.
pub(crate) fn coerce_positive(value: &Value) -> Option<u32> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if n.is_finite() && n >= 1.0 && n <= u32::MAX as f64 {
        Some(n as u32)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn catalog_item_coerces_loose_fields() {
        let item = CatalogItem::from_value(&json!({
            "id": 7,
            "title": "Skyward",
            "pages": "513",
            "img": "assets/skyward.jpg",
            "tags": ["SciFi", 42, null, {"x": 1}]
        }))
        .unwrap();

        assert_eq!(item.id, "7");
        assert_eq!(item.pages, Some(513));
        assert_eq!(item.cover, "assets/skyward.jpg");
        assert_eq!(item.tags, vec!["SciFi".to_string(), "42".to_string()]);
        assert_eq!(item.author, "");
    }

    #[test]
    fn catalog_item_without_title_is_rejected() {
        assert!(CatalogItem::from_value(&json!({"id": "x"})).is_none());
        assert!(CatalogItem::from_value(&json!({"id": "", "title": "t"})).is_none());
    }

    #[test]
    fn non_positive_pages_become_none() {
        let item = CatalogItem::from_value(&json!({"id": "a", "title": "b", "pages": 0})).unwrap();
        assert_eq!(item.pages, None);
        let item = CatalogItem::from_value(&json!({"id": "a", "title": "b", "pages": "lots"})).unwrap();
        assert_eq!(item.pages, None);
    }

    #[test]
    fn normalized_tags_dedupe_case_insensitively() {
        let item = CatalogItem {
            id: "1".into(),
            title: "t".into(),
            author: String::new(),
            pages: None,
            cover: String::new(),
            tags: vec!["Fantasy".into(), "fantasy ".into(), "Magic".into(), "".into()],
        };
        assert_eq!(item.normalized_tags(), vec!["fantasy", "magic"]);
    }

    #[test]
    fn preferences_are_normalized() {
        let prefs = PreferenceSet::from_values(
            Some(&json!(["Gaming", " Music ", 3, null])),
            Some(&json!("not-an-array")),
        );
        assert!(prefs.hobbies.contains("gaming"));
        assert!(prefs.hobbies.contains("music"));
        assert!(prefs.hobbies.contains("3"));
        assert!(prefs.genres.is_empty());
        assert!(!prefs.is_empty());
    }
}
