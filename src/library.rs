// File: src/library.rs
use crate::core::types::{coerce_positive, coerce_string};
use crate::error::{Error, Result};
use crate::persistence::{keys, StatsStore};
use crate::stats::coerce_count;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A book on the user's own shelf, as opposed to a catalog suggestion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LibraryBook {
    pub isbn: Option<String>,
    pub title: String,
    pub author: String,
    pub pages: Option<u32>,
    pub current_page: u32,
    pub categories: Vec<String>,
    pub cover: Option<String>,
    pub favorite: bool,
}

impl LibraryBook {
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into(), ..Default::default() }
    }

    /// Reads one stored shelf entry the way the web client writes it:
    /// numbers may arrive as strings or floats and ISBNs as bare numbers.
    /// Only an entry without a usable title is rejected.
    pub fn decode(value: &Value) -> Option<Self> {
        let text = |key: &str| {
            value
                .get(key)
                .and_then(coerce_string)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        let title = text("title")?;
        let categories = value
            .get("categories")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(coerce_string).collect())
            .unwrap_or_default();

        Some(Self {
            isbn: text("isbn"),
            title,
            author: text("author").unwrap_or_default(),
            pages: value.get("pages").and_then(coerce_positive),
            current_page: coerce_count(value.get("currentPage")).min(u64::from(u32::MAX)) as u32,
            categories: dedupe_categories(categories),
            cover: text("cover"),
            favorite: value.get("favorite").and_then(Value::as_bool).unwrap_or(false),
        })
    }

    /// Whole-number percentage read, capped at 100. Zero when the length is
    /// unknown.
    pub fn percent_read(&self) -> u32 {
        match self.pages {
            Some(total) if total > 0 => {
                let pct = (f64::from(self.current_page) / f64::from(total) * 100.0).round();
                (pct as u32).min(100)
            }
            _ => 0,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.pages, Some(total) if total > 0 && self.current_page >= total)
    }

    fn isbn_key(&self) -> Option<String> {
        self.isbn.as_deref().map(normalize_isbn).filter(|k| !k.is_empty())
    }
}

/// Digits only, so "978-0-307-47427-8" and "9780307474278" compare equal.
pub fn normalize_isbn(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AddOutcome {
    /// A new book was placed at the front of the shelf.
    Added,
    /// The ISBN matched the book at this index, which absorbed the new data.
    Merged { index: usize },
}

/// Progress after a reading log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadingProgress {
    pub current_page: u32,
    pub total_pages: u32,
    pub percent: u32,
    /// Pages actually credited after clamping to the book length.
    pub pages_credited: u32,
    /// True only for the log that reached the last page.
    pub finished_now: bool,
    pub categories: Vec<String>,
}

/// The user's shelf, stored newest first under `libraryBooks`.
pub struct Library;

impl Library {
    /// Loads the shelf. Entries without a title are dropped; an unreadable
    /// shelf is empty.
    pub fn load<S: StatsStore>(store: &S) -> Vec<LibraryBook> {
        let raw = match store.get(keys::LIBRARY_BOOKS) {
            Ok(Some(Value::Array(items))) => items,
            Ok(Some(_)) => {
                warn!("Library record is not a list, treating as empty");
                return Vec::new();
            }
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("Could not read library, treating as empty: {}", e);
                return Vec::new();
            }
        };

        raw.into_iter()
            .filter_map(|item| {
                let book = LibraryBook::decode(&item);
                if book.is_none() {
                    warn!("Dropping library entry without a title: {}", item);
                }
                book
            })
            .collect()
    }

    pub fn save<S: StatsStore>(store: &mut S, books: &[LibraryBook]) -> Result<()> {
        store.put(keys::LIBRARY_BOOKS, serde_json::to_value(books)?)
    }

    /// Adds a book, merging into an existing entry when the ISBNs match.
    pub fn add_book<S: StatsStore>(store: &mut S, book: LibraryBook) -> Result<AddOutcome> {
        let title = book.title.trim().to_string();
        if title.is_empty() {
            return Err(Error::InvalidInput("a book needs a title".into()));
        }
        let mut book = LibraryBook { title, ..book };
        book.categories = dedupe_categories(std::mem::take(&mut book.categories));

        let mut books = Self::load(store);
        let existing = book
            .isbn_key()
            .and_then(|key| books.iter().position(|b| b.isbn_key().as_deref() == Some(key.as_str())));

        let outcome = match existing {
            Some(index) => {
                let merged = merge(&books[index], book);
                books[index] = merged;
                debug!("Merged book into library slot {}", index);
                AddOutcome::Merged { index }
            }
            None => {
                debug!("Added '{}' to library", book.title);
                books.insert(0, book);
                AddOutcome::Added
            }
        };

        Self::save(store, &books)?;
        Ok(outcome)
    }

    /// Advances the bookmark on one book. `total_pages` supplies the length
    /// for books that don't know it yet and is remembered.
    pub fn log_reading<S: StatsStore>(
        store: &mut S,
        index: usize,
        pages: u32,
        total_pages: Option<u32>,
    ) -> Result<ReadingProgress> {
        if pages == 0 {
            return Err(Error::InvalidInput("pages read must be positive".into()));
        }

        let mut books = Self::load(store);
        let book = books
            .get_mut(index)
            .ok_or_else(|| Error::NotFound(format!("no library book at index {}", index)))?;

        let total = match (book.pages, total_pages) {
            (Some(total), _) => total,
            (None, Some(total)) if total > 0 => {
                book.pages = Some(total);
                total
            }
            _ => return Err(Error::InvalidInput("book length is unknown".into())),
        };

        let was_finished = book.current_page >= total;
        let previous = book.current_page.min(total);
        book.current_page = previous.saturating_add(pages).min(total);

        let progress = ReadingProgress {
            current_page: book.current_page,
            total_pages: total,
            percent: book.percent_read(),
            pages_credited: book.current_page - previous,
            finished_now: !was_finished && book.current_page >= total,
            categories: book.categories.clone(),
        };

        Self::save(store, &books)?;
        Ok(progress)
    }

    /// Flips the favorite flag and returns the new value.
    pub fn toggle_favorite<S: StatsStore>(store: &mut S, index: usize) -> Result<bool> {
        let mut books = Self::load(store);
        let book = books
            .get_mut(index)
            .ok_or_else(|| Error::NotFound(format!("no library book at index {}", index)))?;
        book.favorite = !book.favorite;
        let favorite = book.favorite;
        Self::save(store, &books)?;
        Ok(favorite)
    }
}

fn dedupe_categories(categories: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(categories.len());
    for c in categories {
        let c = c.trim().to_string();
        if !c.is_empty() && !out.contains(&c) {
            out.push(c);
        }
    }
    out
}

/// Incoming non-empty fields win; categories are unioned, reading progress
/// and the favorite flag stay with the existing entry.
fn merge(existing: &LibraryBook, incoming: LibraryBook) -> LibraryBook {
    let mut categories = existing.categories.clone();
    categories.extend(incoming.categories);

    LibraryBook {
        isbn: incoming.isbn.or_else(|| existing.isbn.clone()),
        title: incoming.title,
        author: if incoming.author.is_empty() { existing.author.clone() } else { incoming.author },
        pages: incoming.pages.or(existing.pages),
        current_page: existing.current_page,
        categories: dedupe_categories(categories),
        cover: incoming.cover.or_else(|| existing.cover.clone()),
        favorite: existing.favorite,
    }
}
