use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

pub mod backend;

pub use backend::{BackendError, KeyValueBackend, MemoryBackend};

/// Storage key holding the whole serialized log.
pub const ENTRIES_KEY: &str = "mm_entries";
/// Throwaway key written and removed by the availability check.
pub const PROBE_KEY: &str = "__mm_probe";

/// User-facing advisory shown once when the startup probe fails.
pub const UNAVAILABLE_WARNING: &str =
    "Local storage is unavailable; journal entries will not persist.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Milliseconds since the Unix epoch, assigned by the store.
    #[serde(rename = "t")]
    pub timestamp: i64,
    pub text: String,
}

impl Entry {
    pub fn recorded_at(&self) -> Option<OffsetDateTime> {
        OffsetDateTime::from_unix_timestamp_nanos(i128::from(self.timestamp) * 1_000_000).ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("journal entry text is empty")]
pub struct EmptyInput;

/// Trimmed, non-blank text ready to hand to [`JournalStore::append`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryText(String);

impl EntryText {
    pub fn parse(input: &str) -> Result<Self, EmptyInput> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(EmptyInput);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Outcome of reading the log key, before any fallback is applied.
#[derive(Debug)]
pub enum LoadedLog {
    Missing,
    Entries(Vec<Entry>),
    Corrupt(serde_json::Error),
    Unavailable(BackendError),
}

pub fn decode_entries(raw: &str) -> Result<Vec<Entry>, serde_json::Error> {
    serde_json::from_str(raw)
}

pub fn encode_entries(entries: &[Entry]) -> Result<String, serde_json::Error> {
    serde_json::to_string(entries)
}

fn system_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// Append-only journal over an injected key-value backend.
///
/// No operation fails: backend errors are logged and absorbed. The error of
/// the most recent `append` or `clear`, if any, is kept in
/// [`last_failure`](Self::last_failure). The store keeps the last
/// log it read or built so a session whose backend cannot be read still sees
/// its own entries.
pub struct JournalStore<B> {
    backend: B,
    clock: fn() -> i64,
    mirror: Vec<Entry>,
    last_failure: Option<BackendError>,
}

impl<B: KeyValueBackend> JournalStore<B> {
    pub fn new(backend: B) -> Self {
        Self::with_clock(backend, system_millis)
    }

    pub fn with_clock(backend: B, clock: fn() -> i64) -> Self {
        Self {
            backend,
            clock,
            mirror: Vec::new(),
            last_failure: None,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn last_failure(&self) -> Option<&BackendError> {
        self.last_failure.as_ref()
    }

    pub fn load(&self) -> LoadedLog {
        match self.backend.get(ENTRIES_KEY) {
            Ok(None) => LoadedLog::Missing,
            Ok(Some(raw)) => match decode_entries(&raw) {
                Ok(entries) => LoadedLog::Entries(entries),
                Err(err) => LoadedLog::Corrupt(err),
            },
            Err(err) => LoadedLog::Unavailable(err),
        }
    }

    /// Records `text` with the current time. Callers reject blank input first
    /// (see [`EntryText`]).
    pub fn append(&mut self, text: &str) -> Entry {
        self.last_failure = None;
        let mut entries = match self.load() {
            LoadedLog::Missing => Vec::new(),
            LoadedLog::Entries(entries) => entries,
            LoadedLog::Corrupt(err) => {
                tracing::warn!(?err, key = ENTRIES_KEY, "discarding corrupt journal payload");
                Vec::new()
            }
            LoadedLog::Unavailable(err) => {
                tracing::warn!(?err, "journal unreadable, appending to session copy");
                self.last_failure = Some(err);
                std::mem::take(&mut self.mirror)
            }
        };

        let entry = Entry {
            timestamp: (self.clock)(),
            text: text.to_owned(),
        };
        entries.push(entry.clone());

        match encode_entries(&entries) {
            Ok(payload) => {
                if let Err(err) = self.backend.set(ENTRIES_KEY, &payload) {
                    tracing::warn!(?err, "journal entry not persisted");
                    self.last_failure = Some(err);
                }
            }
            Err(err) => tracing::warn!(?err, "serialising journal failed"),
        }
        self.mirror = entries;
        entry
    }

    /// All entries, most recently appended first.
    pub fn list(&self) -> Vec<Entry> {
        let entries = match self.load() {
            LoadedLog::Missing => Vec::new(),
            LoadedLog::Entries(entries) => entries,
            LoadedLog::Corrupt(err) => {
                tracing::debug!(?err, "corrupt journal payload read as empty");
                Vec::new()
            }
            LoadedLog::Unavailable(err) => {
                tracing::debug!(?err, "journal unreadable, listing session copy");
                self.mirror.clone()
            }
        };
        entries.into_iter().rev().collect()
    }

    /// Deletes the log key. Confirmation is the caller's job.
    pub fn clear(&mut self) {
        self.last_failure = None;
        self.mirror.clear();
        if let Err(err) = self.backend.remove(ENTRIES_KEY) {
            tracing::warn!(?err, "journal clear not persisted");
            self.last_failure = Some(err);
        }
    }

    /// Writes and removes [`PROBE_KEY`]. Journal data is never touched.
    ///
    /// The removal is attempted even when the write fails so a key left by an
    /// earlier half-finished check is cleaned up.
    pub fn probe_availability(&self) -> bool {
        let written = self.backend.set(PROBE_KEY, "1");
        let removed = self.backend.remove(PROBE_KEY);
        match written.and(removed) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(?err, "storage probe failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    #[derive(Default)]
    struct FlakyBackend {
        values: RefCell<HashMap<String, String>>,
        fail_reads: Cell<bool>,
        fail_writes: Cell<bool>,
        fail_removes: Cell<bool>,
        writes: Cell<usize>,
    }

    impl FlakyBackend {
        fn failing_writes() -> Self {
            let backend = Self::default();
            backend.fail_writes.set(true);
            backend
        }

        fn disabled() -> Self {
            let backend = Self::failing_writes();
            backend.fail_reads.set(true);
            backend
        }
    }

    impl KeyValueBackend for FlakyBackend {
        fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
            if self.fail_reads.get() {
                return Err(BackendError::unavailable("reads disabled"));
            }
            Ok(self.values.borrow().get(key).cloned())
        }

        fn set(&self, key: &str, value: &str) -> Result<(), BackendError> {
            self.writes.set(self.writes.get() + 1);
            if self.fail_writes.get() {
                return Err(BackendError::unavailable("writes disabled"));
            }
            self.values
                .borrow_mut()
                .insert(key.to_owned(), value.to_owned());
            Ok(())
        }

        fn remove(&self, key: &str) -> Result<(), BackendError> {
            if self.fail_writes.get() || self.fail_removes.get() {
                return Err(BackendError::unavailable("writes disabled"));
            }
            self.values.borrow_mut().remove(key);
            Ok(())
        }
    }

    fn fixed_clock() -> i64 {
        1_700_000_000_000
    }

    fn texts(entries: &[Entry]) -> Vec<&str> {
        entries.iter().map(|entry| entry.text.as_str()).collect()
    }

    #[test]
    fn append_then_list_returns_entry_within_call_window() {
        let mut store = JournalStore::new(MemoryBackend::new());
        let before = system_millis();
        store.append("Mood: happy");
        let after = system_millis();

        let entries = store.list();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].text, "Mood: happy");
        assert!(entries[0].timestamp >= before && entries[0].timestamp <= after);
    }

    #[test]
    fn list_is_newest_first() {
        let mut store = JournalStore::new(MemoryBackend::new());
        for text in ["a", "b", "c", "d"] {
            store.append(text);
        }
        assert_eq!(texts(&store.list()), vec!["d", "c", "b", "a"]);
    }

    #[test]
    fn payload_uses_compact_record_shape() {
        let mut store = JournalStore::with_clock(MemoryBackend::new(), fixed_clock);
        store.append("first");
        store.append("second");
        let raw = store.backend().get(ENTRIES_KEY).unwrap().unwrap();
        assert_eq!(
            raw,
            r#"[{"t":1700000000000,"text":"first"},{"t":1700000000000,"text":"second"}]"#
        );
    }

    #[test]
    fn reads_payload_written_by_other_sessions() {
        let backend = MemoryBackend::new();
        backend
            .set(ENTRIES_KEY, r#"[{"t":1,"text":"old"},{"t":2,"text":"newer"}]"#)
            .unwrap();
        let store = JournalStore::new(backend);
        let entries = store.list();
        assert_eq!(texts(&entries), vec!["newer", "old"]);
        assert_eq!(entries[1].timestamp, 1);
    }

    #[test]
    fn clear_removes_key_and_is_idempotent() {
        let mut store = JournalStore::new(MemoryBackend::new());
        store.clear();
        assert!(store.list().is_empty());

        store.append("x");
        store.clear();
        assert!(store.list().is_empty());
        assert!(!store.backend().contains_key(ENTRIES_KEY));

        store.clear();
        assert!(store.list().is_empty());
        assert!(store.last_failure().is_none());
    }

    #[test]
    fn corrupt_payload_lists_empty_and_is_replaced_on_append() {
        let backend = MemoryBackend::new();
        backend.set(ENTRIES_KEY, "{not json").unwrap();
        let mut store = JournalStore::new(backend);

        assert_matches!(store.load(), LoadedLog::Corrupt(_));
        assert!(store.list().is_empty());

        store.append("fresh start");
        assert_eq!(texts(&store.list()), vec!["fresh start"]);
    }

    #[test]
    fn wrong_shape_payload_counts_as_corrupt() {
        let backend = MemoryBackend::new();
        backend.set(ENTRIES_KEY, r#"{"t":1,"text":"lonely"}"#).unwrap();
        let store = JournalStore::new(backend);
        assert_matches!(store.load(), LoadedLog::Corrupt(_));
        assert!(store.list().is_empty());
    }

    #[test]
    fn failing_writes_do_not_panic_and_list_stays_valid() {
        let mut store = JournalStore::new(FlakyBackend::failing_writes());
        let entry = store.append("will not stick");
        assert_eq!(entry.text, "will not stick");
        assert_eq!(store.backend().writes.get(), 1);
        assert_matches!(store.last_failure(), Some(BackendError::Unavailable { .. }));
        assert!(store.list().is_empty());

        store.clear();
        assert!(store.list().is_empty());
    }

    #[test]
    fn disabled_backend_keeps_session_entries() {
        let mut store = JournalStore::new(FlakyBackend::disabled());
        assert_matches!(store.load(), LoadedLog::Unavailable(_));
        store.append("a");
        store.append("b");
        assert_eq!(texts(&store.list()), vec!["b", "a"]);

        store.clear();
        assert!(store.list().is_empty());
    }

    #[test]
    fn quota_exceeded_is_absorbed() {
        let mut store = JournalStore::new(MemoryBackend::with_quota(48));
        store.append("short");
        store.append("this entry pushes the payload past the quota");
        assert_matches!(
            store.last_failure(),
            Some(BackendError::QuotaExceeded { .. })
        );
        assert_eq!(texts(&store.list()), vec!["short"]);

        store.clear();
        assert!(store.last_failure().is_none());
    }

    #[test]
    fn probe_succeeds_without_leaving_keys() {
        let mut store = JournalStore::new(MemoryBackend::new());
        store.append("keep me");
        assert!(store.probe_availability());
        assert_eq!(store.backend().len(), 1);
        assert_eq!(texts(&store.list()), vec!["keep me"]);
    }

    #[test]
    fn probe_reports_failure_instead_of_erroring() {
        let store = JournalStore::new(FlakyBackend::failing_writes());
        assert!(!store.probe_availability());
    }

    #[test]
    fn failed_removals_leave_at_most_one_check_key() {
        let backend = FlakyBackend::default();
        backend.fail_removes.set(true);
        let store = JournalStore::new(backend);
        for _ in 0..3 {
            assert!(!store.probe_availability());
        }
        assert_eq!(store.backend().values.borrow().len(), 1);
        assert!(store.backend().values.borrow().contains_key(PROBE_KEY));

        store.backend().fail_removes.set(false);
        assert!(store.probe_availability());
        assert!(store.backend().values.borrow().is_empty());
    }

    #[test]
    fn entry_text_rejects_blank_input() {
        assert_eq!(EntryText::parse("   \n\t"), Err(EmptyInput));
        assert_eq!(EntryText::parse("").unwrap_err(), EmptyInput);
        assert_eq!(EntryText::parse("  hello ").unwrap().as_str(), "hello");
    }

    #[test]
    fn recorded_at_converts_millis() {
        let entry = Entry {
            timestamp: 1_500,
            text: "t".into(),
        };
        let at = entry.recorded_at().unwrap();
        assert_eq!(at.unix_timestamp(), 1);
        assert_eq!(at.millisecond(), 500);
    }
}
