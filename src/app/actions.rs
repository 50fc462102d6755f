use crate::journal::{Entry, EntryText, JournalStore, KeyValueBackend};
use crate::wellness::Mood;

/// Result of recording one entry.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub entry: Entry,
    /// `false` when the backend refused the write; the entry lives only in
    /// this session.
    pub persisted: bool,
    pub entries: Vec<Entry>,
}

/// The only path collaborators use to reach the journal. Every mutation
/// hands back the fresh newest-first listing so the caller can redraw.
pub struct ActionDispatcher<'a, B> {
    journal: &'a mut JournalStore<B>,
}

impl<'a, B: KeyValueBackend> ActionDispatcher<'a, B> {
    pub fn new(journal: &'a mut JournalStore<B>) -> Self {
        Self { journal }
    }

    pub fn record(&mut self, text: &EntryText) -> Recorded {
        self.append(text.as_str())
    }

    pub fn record_mood(&mut self, mood: Mood) -> Recorded {
        self.append(&mood.journal_text())
    }

    fn append(&mut self, text: &str) -> Recorded {
        let entry = self.journal.append(text);
        let persisted = self.journal.last_failure().is_none();
        tracing::debug!(timestamp = entry.timestamp, persisted, "journal entry recorded");
        Recorded {
            entry,
            persisted,
            entries: self.journal.list(),
        }
    }

    /// Callers must have confirmed with the user first.
    pub fn clear_all(&mut self) -> Vec<Entry> {
        self.journal.clear();
        tracing::info!("journal cleared");
        self.journal.list()
    }
}
