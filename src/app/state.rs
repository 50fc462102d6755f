use std::collections::VecDeque;
use std::time::{Duration, Instant};

use strum::{Display, EnumIter, IntoEnumIterator};
use unicode_segmentation::UnicodeSegmentation;

use crate::config::{AppConfig, ThemeName};
use crate::journal::Entry;
use crate::wellness::{BreathingGuide, Mood, StressQuiz};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum Panel {
    Home,
    Mood,
    Breathe,
    Quiz,
    Chat,
    Journal,
}

impl Panel {
    pub fn all() -> Vec<Panel> {
        Panel::iter().collect()
    }

    pub fn index(self) -> usize {
        Panel::iter().position(|p| p == self).unwrap_or(0)
    }

    pub fn from_index(index: usize) -> Option<Panel> {
        Panel::iter().nth(index)
    }

    pub fn next(self) -> Panel {
        let count = Panel::iter().count();
        Panel::from_index((self.index() + 1) % count).unwrap_or(Panel::Home)
    }

    pub fn previous(self) -> Panel {
        let count = Panel::iter().count();
        Panel::from_index((self.index() + count - 1) % count).unwrap_or(Panel::Home)
    }

    /// Panels with a text input swallow plain character keys.
    pub fn accepts_text(self) -> bool {
        matches!(self, Panel::Chat | Panel::Journal)
    }
}

/// Single-line text input with a grapheme-aware cursor.
#[derive(Debug, Clone, Default)]
pub struct InputLine {
    buffer: String,
    cursor: usize,
}

impl InputLine {
    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn insert_char(&mut self, ch: char) {
        self.buffer.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        let prev = prev_grapheme_boundary(&self.buffer, self.cursor);
        self.buffer.drain(prev..self.cursor);
        self.cursor = prev;
        true
    }

    pub fn delete(&mut self) -> bool {
        if self.cursor >= self.buffer.len() {
            return false;
        }
        let next = next_grapheme_boundary(&self.buffer, self.cursor);
        self.buffer.drain(self.cursor..next);
        true
    }

    pub fn move_left(&mut self) {
        self.cursor = prev_grapheme_boundary(&self.buffer, self.cursor);
    }

    pub fn move_right(&mut self) {
        self.cursor = next_grapheme_boundary(&self.buffer, self.cursor);
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.buffer.len();
    }

    /// Empties the input and returns what was typed.
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.buffer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    You,
    Companion,
}

impl Speaker {
    pub fn label(self) -> &'static str {
        match self {
            Speaker::You => "You",
            Speaker::Companion => "MindMend",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine {
    pub speaker: Speaker,
    pub text: String,
}

#[derive(Debug, Clone)]
struct PendingReply {
    due: Instant,
    text: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayState {
    ConfirmClear,
}

pub struct AppState {
    pub theme: ThemeName,
    pub panel: Panel,
    pub quote: Option<&'static str>,
    pub mood_cursor: usize,
    pub selected_mood: Option<Mood>,
    pub mood_message: String,
    pub breathing: BreathingGuide,
    pub quiz: StressQuiz,
    pub chat_log: Vec<ChatLine>,
    pub chat_input: InputLine,
    pub journal_input: InputLine,
    pub entries: Vec<Entry>,
    pub selected_entry: usize,
    pub status_message: Option<String>,
    pub storage_warning: Option<&'static str>,
    overlay: Option<OverlayState>,
    pending_replies: VecDeque<PendingReply>,
    reply_delay: Duration,
}

impl AppState {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            theme: config.theme,
            panel: Panel::Home,
            quote: None,
            mood_cursor: 0,
            selected_mood: None,
            mood_message: String::from("How are you feeling right now?"),
            breathing: BreathingGuide::new(&config.breathing),
            quiz: StressQuiz::new(),
            chat_log: Vec::new(),
            chat_input: InputLine::default(),
            journal_input: InputLine::default(),
            entries: Vec::new(),
            selected_entry: 0,
            status_message: None,
            storage_warning: None,
            overlay: None,
            pending_replies: VecDeque::new(),
            reply_delay: config.chat.reply_delay(),
        }
    }

    pub fn set_status_message<S: Into<String>>(&mut self, message: Option<S>) {
        self.status_message = message.map(Into::into);
    }

    pub fn overlay(&self) -> Option<OverlayState> {
        self.overlay
    }

    pub fn open_overlay(&mut self, overlay: OverlayState) {
        self.overlay = Some(overlay);
    }

    pub fn close_overlay(&mut self) {
        self.overlay = None;
    }

    pub fn switch_panel(&mut self, panel: Panel) {
        self.panel = panel;
        self.status_message = None;
    }

    pub fn move_mood_cursor(&mut self, delta: isize) {
        let count = Mood::all().len() as isize;
        let next = (self.mood_cursor as isize + delta).rem_euclid(count);
        self.mood_cursor = next as usize;
    }

    pub fn select_mood_at_cursor(&mut self) {
        let Some(mood) = Mood::all().get(self.mood_cursor).copied() else {
            return;
        };
        self.selected_mood = Some(mood);
        self.mood_message = mood.selection_message();
    }

    /// Hands the chosen mood over for journaling and resets the picker.
    pub fn take_selected_mood(&mut self) -> Option<Mood> {
        self.selected_mood.take()
    }

    pub fn set_entries(&mut self, entries: Vec<Entry>) {
        self.entries = entries;
        if self.selected_entry >= self.entries.len() {
            self.selected_entry = self.entries.len().saturating_sub(1);
        }
    }

    pub fn move_entry_selection(&mut self, delta: isize) {
        if self.entries.is_empty() {
            self.selected_entry = 0;
            return;
        }
        let last = self.entries.len() as isize - 1;
        let next = (self.selected_entry as isize + delta).clamp(0, last);
        self.selected_entry = next as usize;
    }

    pub fn push_chat(&mut self, speaker: Speaker, text: impl Into<String>) {
        self.chat_log.push(ChatLine {
            speaker,
            text: text.into(),
        });
    }

    pub fn schedule_reply(&mut self, now: Instant, text: &'static str) {
        self.pending_replies.push_back(PendingReply {
            due: now + self.reply_delay,
            text,
        });
    }

    pub fn has_pending_reply(&self) -> bool {
        !self.pending_replies.is_empty()
    }

    /// Moves every reply whose delay has elapsed into the chat log.
    pub fn deliver_due_replies(&mut self, now: Instant) -> usize {
        let mut delivered = 0;
        while let Some(pending) = self.pending_replies.front() {
            if pending.due > now {
                break;
            }
            let text = pending.text;
            self.pending_replies.pop_front();
            self.push_chat(Speaker::Companion, text);
            delivered += 1;
        }
        delivered
    }
}

fn prev_grapheme_boundary(text: &str, cursor: usize) -> usize {
    if cursor == 0 {
        return 0;
    }
    let mut last = 0;
    for (idx, _) in text[..cursor].grapheme_indices(true) {
        last = idx;
    }
    last
}

fn next_grapheme_boundary(text: &str, cursor: usize) -> usize {
    if cursor >= text.len() {
        return text.len();
    }
    match text[cursor..].graphemes(true).next() {
        Some(grapheme) => cursor + grapheme.len(),
        None => text.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(t: i64, text: &str) -> Entry {
        Entry {
            timestamp: t,
            text: text.into(),
        }
    }

    #[test]
    fn panels_cycle_in_both_directions() {
        assert_eq!(Panel::Home.next(), Panel::Mood);
        assert_eq!(Panel::Journal.next(), Panel::Home);
        assert_eq!(Panel::Home.previous(), Panel::Journal);
        assert_eq!(Panel::from_index(5), Some(Panel::Journal));
        assert_eq!(Panel::from_index(6), None);
    }

    #[test]
    fn input_line_edits_by_grapheme() {
        let mut input = InputLine::default();
        for ch in "ne\u{301}e".chars() {
            input.insert_char(ch);
        }
        input.move_left();
        assert!(input.backspace());
        assert_eq!(input.as_str(), "ne");
        input.move_home();
        assert!(input.delete());
        assert_eq!(input.as_str(), "e");
        assert_eq!(input.take(), "e");
        assert!(input.is_empty());
        assert_eq!(input.cursor(), 0);
    }

    #[test]
    fn mood_cursor_wraps_and_selection_resets_on_take() {
        let mut state = AppState::new(&AppConfig::default());
        state.move_mood_cursor(-1);
        assert_eq!(state.mood_cursor, Mood::all().len() - 1);
        state.move_mood_cursor(1);
        state.select_mood_at_cursor();
        assert_eq!(state.selected_mood, Some(Mood::Happy));
        assert!(state.mood_message.contains("You feel happy"));
        assert_eq!(state.take_selected_mood(), Some(Mood::Happy));
        assert_eq!(state.take_selected_mood(), None);
    }

    #[test]
    fn replies_arrive_after_delay() {
        let mut state = AppState::new(&AppConfig::default());
        let t0 = Instant::now();
        state.schedule_reply(t0, "hello");
        assert_eq!(state.deliver_due_replies(t0), 0);
        assert!(state.has_pending_reply());
        assert_eq!(state.deliver_due_replies(t0 + Duration::from_millis(500)), 1);
        assert_eq!(state.chat_log.last().map(|l| l.speaker), Some(Speaker::Companion));
        assert!(!state.has_pending_reply());
    }

    #[test]
    fn entry_selection_clamps_to_list() {
        let mut state = AppState::new(&AppConfig::default());
        state.set_entries(vec![entry(2, "b"), entry(1, "a")]);
        state.move_entry_selection(5);
        assert_eq!(state.selected_entry, 1);
        state.set_entries(vec![entry(3, "c")]);
        assert_eq!(state.selected_entry, 0);
        state.set_entries(Vec::new());
        state.move_entry_selection(1);
        assert_eq!(state.selected_entry, 0);
    }
}
