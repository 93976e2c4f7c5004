// C ABI for the UI shell. Strings cross the boundary as UTF-8 JSON and every
// returned string must be released with `pageturner_free_string`.
use crate::config::TrackerConfig;
use crate::core::types::PreferenceSet;
use crate::library::LibraryBook;
use crate::persistence::FileStore;
use crate::tracker::ReadingTracker;
use log::{error, info};
use serde::Serialize;
use std::ffi::{c_char, CStr, CString};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::ptr;
use std::sync::{Mutex, MutexGuard};

static TRACKER: Mutex<Option<ReadingTracker<FileStore>>> = Mutex::new(None);

fn lock_tracker() -> MutexGuard<'static, Option<ReadingTracker<FileStore>>> {
    // A panic mid-call leaves the tracker usable; every write is wholesale.
    TRACKER.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

unsafe fn read_str<'a>(s: *const c_char) -> Option<&'a str> {
    if s.is_null() {
        return None;
    }
    CStr::from_ptr(s).to_str().ok()
}

fn to_c_string(json: String) -> *mut c_char {
    CString::new(json).map(CString::into_raw).unwrap_or(ptr::null_mut())
}

fn json_reply<T: Serialize>(value: &T) -> *mut c_char {
    to_c_string(serde_json::to_string(value).unwrap_or_else(|_| "null".to_string()))
}

fn error_reply(message: impl std::fmt::Display) -> *mut c_char {
    json_reply(&serde_json::json!({ "error": message.to_string() }))
}

/// Runs `f` against the open tracker and serializes its answer.
fn with_tracker<T, F>(f: F) -> *mut c_char
where
    T: Serialize,
    F: FnOnce(&mut ReadingTracker<FileStore>) -> crate::Result<T>,
{
    let result = catch_unwind(AssertUnwindSafe(|| {
        let mut guard = lock_tracker();
        match guard.as_mut() {
            Some(tracker) => match f(tracker) {
                Ok(value) => json_reply(&value),
                Err(e) => error_reply(e),
            },
            None => error_reply("tracker is not initialized"),
        }
    }));
    result.unwrap_or_else(|_| {
        error!("Panic inside a C API call");
        error_reply("internal error")
    })
}

/// Opens the tracker. `data_dir` may be null to use the configured location.
/// Returns true on success; calling it twice is harmless.
#[no_mangle]
pub extern "C" fn pageturner_init(data_dir: *const c_char) -> bool {
    let data_dir = unsafe { read_str(data_dir) }.map(PathBuf::from);
    let result = catch_unwind(AssertUnwindSafe(|| {
        let mut guard = lock_tracker();
        if guard.is_some() {
            return true;
        }
        let mut config = TrackerConfig::load_or_default(None);
        if data_dir.is_some() {
            config.data_dir = data_dir;
        }
        match ReadingTracker::open(&config) {
            Ok(tracker) => {
                *guard = Some(tracker);
                info!("PageTurner tracker initialized");
                true
            }
            Err(e) => {
                error!("Could not open tracker: {}", e);
                false
            }
        }
    }));
    result.unwrap_or_else(|_| {
        error!("Panic during tracker initialization");
        false
    })
}

#[no_mangle]
pub extern "C" fn pageturner_destroy() {
    *lock_tracker() = None;
}

/// JSON array of rail entries for the stored preferences.
#[no_mangle]
pub extern "C" fn pageturner_recommendations() -> *mut c_char {
    with_tracker(|tracker| Ok(serde_json::to_value(tracker.recommendations())?))
}

/// Takes `{"hobbies": [...], "genres": [...]}`.
#[no_mangle]
pub extern "C" fn pageturner_set_preferences(json: *const c_char) -> *mut c_char {
    let json = unsafe { read_str(json) }.unwrap_or("").to_string();
    with_tracker(move |tracker| {
        let raw: serde_json::Value = serde_json::from_str(&json)?;
        let prefs = PreferenceSet::from_values(raw.get("hobbies"), raw.get("genres"));
        tracker.set_preferences(&prefs)?;
        Ok(prefs)
    })
}

/// Takes a library book object and returns the add outcome.
#[no_mangle]
pub extern "C" fn pageturner_add_book(json: *const c_char) -> *mut c_char {
    let json = unsafe { read_str(json) }.unwrap_or("").to_string();
    with_tracker(move |tracker| {
        let book: LibraryBook = serde_json::from_str(&json)?;
        tracker.add_book(book)
    })
}

/// `total_pages` of 0 means "not supplied".
#[no_mangle]
pub extern "C" fn pageturner_log_reading(index: u32, pages: u32, total_pages: u32) -> *mut c_char {
    let total = (total_pages > 0).then_some(total_pages);
    with_tracker(move |tracker| tracker.log_reading(index as usize, pages, total))
}

#[no_mangle]
pub extern "C" fn pageturner_toggle_favorite(index: u32) -> *mut c_char {
    with_tracker(move |tracker| tracker.toggle_favorite(index as usize))
}

/// Stats, award progress and points in one object.
#[no_mangle]
pub extern "C" fn pageturner_profile() -> *mut c_char {
    with_tracker(|tracker| {
        Ok(serde_json::json!({
            "stats": tracker.stats(),
            "awards": tracker.award_progress(),
            "points": tracker.total_points(),
            "books": tracker.books(),
        }))
    })
}

#[no_mangle]
pub extern "C" fn pageturner_free_string(s: *mut c_char) {
    if !s.is_null() {
        unsafe {
            let _ = CString::from_raw(s);
        }
    }
}
