//! The bounded, ordered, persisted log store.
//!
//! A [`LogStore`] keeps its entries newest-first, never holds more than the
//! entry kind's capacity, and mirrors the full sequence into a durable slot
//! after every mutation. Persistence is best-effort: read and write failures
//! are reported on the diagnostic channel and never reach the caller.

use std::cell::Cell;
use std::collections::VecDeque;
use std::fmt::Debug;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::storage::SlotStorage;

/// Free-form diagnostic fields attached to an entry.
pub type Context = serde_json::Map<String, serde_json::Value>;

/// Capturing-context fields filled in by the store at append time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captured {
    /// When the entry was appended.
    pub timestamp: DateTime<Utc>,
    /// Location identifier of the capturing context.
    pub url: String,
    /// Agent string of the capturing context.
    pub agent: String,
}

/// An entry kind that a [`LogStore`] can hold.
pub trait StoredEntry: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static {
    /// Caller-supplied fields for a new entry.
    type Fields;

    /// Durable slot holding this kind's sequence.
    const STORAGE_KEY: &'static str;

    /// Maximum number of entries retained.
    const CAPACITY: usize;

    /// Prefix identifying the store on the diagnostic channel.
    const CONSOLE_TAG: &'static str;

    /// Build a full entry from caller fields and the capturing context.
    fn build(fields: Self::Fields, captured: Captured) -> Self;

    /// Render the human-readable support report.
    ///
    /// `full_json` is the pretty-printed export of `entries`.
    fn summarize(entries: &[Self], full_json: &str) -> String;
}

thread_local! {
    static MUTATING: Cell<bool> = const { Cell::new(false) };
}

/// Whether the current thread is inside a store mutation.
///
/// The panic hook checks this so a panic raised mid-append never re-enters
/// the store it interrupted.
pub(crate) fn mutating_on_current_thread() -> bool {
    MUTATING.with(Cell::get)
}

struct MutationGuard;

impl MutationGuard {
    fn enter() -> Self {
        MUTATING.with(|m| m.set(true));
        Self
    }
}

impl Drop for MutationGuard {
    fn drop(&mut self) {
        MUTATING.with(|m| m.set(false));
    }
}

/// A capped, newest-first sequence of entries mirrored to a durable slot.
#[derive(Debug)]
pub struct LogStore<E: StoredEntry> {
    entries: Mutex<VecDeque<E>>,
    storage: Arc<dyn SlotStorage>,
    environment: Arc<dyn Environment>,
}

impl<E: StoredEntry> LogStore<E> {
    /// Create a store and load any previously persisted entries.
    ///
    /// A missing slot, an unreadable backend, or unparseable content all
    /// yield an empty store.
    #[must_use]
    pub fn open(storage: Arc<dyn SlotStorage>, environment: Arc<dyn Environment>) -> Self {
        let entries = Self::load(storage.as_ref());
        debug!(
            "Loaded {} entries from slot {} ({})",
            entries.len(),
            E::STORAGE_KEY,
            storage.name()
        );
        Self {
            entries: Mutex::new(entries),
            storage,
            environment,
        }
    }

    /// Append a new entry at the front of the sequence.
    ///
    /// Fills in timestamp, location, and agent from the environment, drops
    /// the oldest entries beyond capacity, persists, and echoes the entry on
    /// the diagnostic channel. Never fails.
    pub fn append(&self, fields: E::Fields) {
        let captured = Captured {
            timestamp: self.environment.now(),
            url: self.environment.location(),
            agent: self.environment.agent(),
        };
        let entry = E::build(fields, captured);

        {
            let _guard = MutationGuard::enter();
            let mut entries = self.lock();
            entries.push_front(entry.clone());
            entries.truncate(E::CAPACITY);
            self.persist(&entries);
        }

        match serde_json::to_string(&entry) {
            Ok(json) => error!("{} {}", E::CONSOLE_TAG, json),
            Err(_) => error!("{} {:?}", E::CONSOLE_TAG, entry),
        }
    }

    /// A copy of all entries, newest first.
    #[must_use]
    pub fn get_all(&self) -> Vec<E> {
        self.lock().iter().cloned().collect()
    }

    /// Remove all entries and persist the empty sequence.
    pub fn clear(&self) {
        let _guard = MutationGuard::enter();
        let mut entries = self.lock();
        entries.clear();
        self.persist(&entries);
    }

    /// Number of entries held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Pretty-printed JSON array of all entries, newest first.
    #[must_use]
    pub fn export_as_json(&self) -> String {
        Self::pretty_json(&self.get_all())
    }

    /// The human-readable support report for the current entries.
    #[must_use]
    pub fn summarize(&self) -> String {
        let entries = self.get_all();
        let json = Self::pretty_json(&entries);
        E::summarize(&entries, &json)
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<E>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn pretty_json(entries: &[E]) -> String {
        serde_json::to_string_pretty(entries)
            .map_err(Error::from)
            .unwrap_or_else(|e| {
                warn!("{} {}", E::CONSOLE_TAG, e);
                "[]".to_string()
            })
    }

    fn load(storage: &dyn SlotStorage) -> VecDeque<E> {
        match Self::read_slot(storage) {
            Ok(mut entries) => {
                entries.truncate(E::CAPACITY);
                entries
            }
            Err(e) if e.is_storage_error() => {
                warn!("{} Failed to load logs: {}", E::CONSOLE_TAG, e);
                VecDeque::new()
            }
            Err(e) => {
                warn!("{} Discarding unreadable logs: {}", E::CONSOLE_TAG, e);
                VecDeque::new()
            }
        }
    }

    /// The stored sequence; a slot never written reads as empty.
    fn read_slot(storage: &dyn SlotStorage) -> Result<VecDeque<E>> {
        match storage.read(E::STORAGE_KEY)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(VecDeque::new()),
        }
    }

    fn persist(&self, entries: &VecDeque<E>) {
        if let Err(e) = self.write_slot(entries) {
            warn!("{} Failed to save logs: {}", E::CONSOLE_TAG, e);
        }
    }

    fn write_slot(&self, entries: &VecDeque<E>) -> Result<()> {
        let json = serde_json::to_string(entries)?;
        self.storage.write(E::STORAGE_KEY, &json)
    }
}

/// Render an error and its source chain, one cause per line.
///
/// Used as the `stack` text for entries reported with an error value.
#[must_use]
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str("\n    caused by: ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::FixedEnvironment;
    use crate::storage::MemoryStorage;
    use chrono::TimeZone;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        timestamp: DateTime<Utc>,
        text: String,
        url: String,
    }

    impl StoredEntry for Note {
        type Fields = String;
        const STORAGE_KEY: &'static str = "notes";
        const CAPACITY: usize = 3;
        const CONSOLE_TAG: &'static str = "[Notes]";

        fn build(text: String, captured: Captured) -> Self {
            Self {
                timestamp: captured.timestamp,
                text,
                url: captured.url,
            }
        }

        fn summarize(entries: &[Self], full_json: &str) -> String {
            format!("{} notes\n{full_json}", entries.len())
        }
    }

    #[derive(Debug)]
    struct BrokenStorage;

    impl SlotStorage for BrokenStorage {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn read(&self, key: &str) -> Result<Option<String>> {
            Err(Error::slot_unavailable(key, "read refused"))
        }

        fn write(&self, key: &str, _value: &str) -> Result<()> {
            Err(Error::slot_unavailable(key, "write refused"))
        }
    }

    fn env() -> Arc<dyn Environment> {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();
        Arc::new(FixedEnvironment::new(at, "https://app.example/", "agent"))
    }

    fn texts(store: &LogStore<Note>) -> Vec<String> {
        store.get_all().into_iter().map(|n| n.text).collect()
    }

    #[test]
    fn test_append_prepends_and_caps() {
        let store = LogStore::<Note>::open(Arc::new(MemoryStorage::new()), env());
        for text in ["a", "b", "c", "d", "e"] {
            store.append(text.to_string());
        }
        assert_eq!(texts(&store), vec!["e", "d", "c"]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_append_fills_captured_fields() {
        let store = LogStore::<Note>::open(Arc::new(MemoryStorage::new()), env());
        store.append("x".to_string());

        let note = &store.get_all()[0];
        assert_eq!(note.url, "https://app.example/");
        assert_eq!(
            note.timestamp,
            Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_get_all_is_a_copy() {
        let store = LogStore::<Note>::open(Arc::new(MemoryStorage::new()), env());
        store.append("kept".to_string());

        let mut copy = store.get_all();
        copy.clear();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_persists_after_each_mutation() {
        let storage = MemoryStorage::new();
        let store = LogStore::<Note>::open(Arc::new(storage.clone()), env());

        store.append("one".to_string());
        let raw = storage.read("notes").unwrap().unwrap();
        assert!(raw.contains("one"));

        store.clear();
        assert_eq!(storage.read("notes").unwrap().as_deref(), Some("[]"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_reload_truncates_oversized_slot() {
        let storage = MemoryStorage::new();
        let seeded = LogStore::<Note>::open(Arc::new(storage.clone()), env());
        for text in ["a", "b", "c"] {
            seeded.append(text.to_string());
        }
        // Grow the slot past capacity behind the store's back
        let mut notes: Vec<Note> = serde_json::from_str(&storage.read("notes").unwrap().unwrap()).unwrap();
        notes.push(notes[0].clone());
        storage
            .write("notes", &serde_json::to_string(&notes).unwrap())
            .unwrap();

        let reopened = LogStore::<Note>::open(Arc::new(storage), env());
        assert_eq!(texts(&reopened), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_broken_storage_is_swallowed() {
        let store = LogStore::<Note>::open(Arc::new(BrokenStorage), env());
        assert!(store.is_empty());

        store.append("still here".to_string());
        assert_eq!(texts(&store), vec!["still here"]);

        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_summarize_receives_export() {
        let store = LogStore::<Note>::open(Arc::new(MemoryStorage::new()), env());
        store.append("hello".to_string());

        let summary = store.summarize();
        assert!(summary.starts_with("1 notes\n"));
        assert!(summary.ends_with(&store.export_as_json()));
    }

    #[test]
    fn test_read_slot_tells_corruption_from_backend_failure() {
        let storage = MemoryStorage::new();
        storage.write("notes", "{truncated").unwrap();
        let corrupt = LogStore::<Note>::read_slot(&storage).unwrap_err();
        assert!(matches!(corrupt, Error::Json(_)));
        assert!(!corrupt.is_storage_error());

        let refused = LogStore::<Note>::read_slot(&BrokenStorage).unwrap_err();
        assert!(refused.is_storage_error());

        assert!(LogStore::<Note>::read_slot(&MemoryStorage::new())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_mutation_guard_resets() {
        assert!(!mutating_on_current_thread());
        {
            let _guard = MutationGuard::enter();
            assert!(mutating_on_current_thread());
        }
        assert!(!mutating_on_current_thread());
    }

    #[test]
    fn test_error_chain_lists_sources() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = Error::DirectoryCreate {
            path: "/srv/logs".into(),
            source: io,
        };
        let chain = error_chain(&err);
        let lines: Vec<&str> = chain.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("/srv/logs"));
        assert!(lines[1].contains("caused by: denied"));
    }
}
