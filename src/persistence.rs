// File: src/persistence.rs
use crate::awards::EarnedAwards;
use crate::error::Result;
use crate::stats::ReadingStats;
use log::{info, warn};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Storage keys shared with the web client.
pub mod keys {
    pub const READING_STATS: &str = "readingStats";
    pub const EARNED_AWARDS: &str = "earnedAwards";
    pub const LIBRARY_BOOKS: &str = "libraryBooks";
    pub const SELECTED_HOBBIES: &str = "selectedHobbies";
    pub const SELECTED_GENRES: &str = "selectedGenres";
}

/// A key-value store of JSON blobs. Values are read and written wholesale.
pub trait StatsStore {
    fn get(&self, key: &str) -> Result<Option<Value>>;
    fn put(&mut self, key: &str, value: Value) -> Result<()>;
}

/// Keeps everything in memory. Used by tests and throwaway sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatsStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: Value) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}

/// One JSON document on disk holding every key. Each `put` rewrites the
/// whole document through a temp file so a crash never leaves it half written.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Map<String, Value>,
}

impl FileStore {
    /// Opens the store, creating parent directories as needed. A missing file
    /// is an empty store; so is an unreadable one, with a warning.
    pub fn open(path: &Path) -> Result<Self> {
        let parent_dir = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent_dir)?;

        let entries = match File::open(path) {
            Ok(file) => match serde_json::from_reader::<_, Value>(BufReader::new(file)) {
                Ok(Value::Object(map)) => map,
                Ok(_) => {
                    warn!("Store {} is not a JSON object, starting empty", path.display());
                    Map::new()
                }
                Err(e) => {
                    warn!("Store {} is corrupt ({}), starting empty", path.display(), e);
                    Map::new()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(e.into()),
        };

        info!("Opened store {} ({} keys)", path.display(), entries.len());
        Ok(Self { path: path.to_path_buf(), entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        let parent_dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let temp_file = NamedTempFile::new_in(parent_dir)?;
        {
            let mut writer = BufWriter::new(&temp_file);
            serde_json::to_writer_pretty(&mut writer, &self.entries)?;
            writer.flush()?;
        }
        temp_file.persist(&self.path)?;
        Ok(())
    }
}

impl StatsStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: Value) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        self.flush()
    }
}

/// The typed ledger state, for binary backup and restore.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LedgerSnapshot {
    pub stats: ReadingStats,
    pub earned: EarnedAwards,
}

pub fn save_snapshot(snapshot: &LedgerSnapshot, path: &Path) -> Result<()> {
    let parent_dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent_dir)?;

    let temp_file = NamedTempFile::new_in(parent_dir)?;
    {
        let mut writer = BufWriter::new(&temp_file);
        bincode::serialize_into(&mut writer, snapshot)?;
        writer.flush()?;
    }
    temp_file.persist(path)?;
    Ok(())
}

pub fn load_snapshot(path: &Path) -> Result<LedgerSnapshot> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let snapshot: LedgerSnapshot = bincode::deserialize_from(reader)?;
    Ok(snapshot)
}
