use std::io::Stdout;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use ratatui::backend::CrosstermBackend;
use ratatui::widgets::ListState;
use ratatui::Terminal;
use time::UtcOffset;

use crate::config::AppConfig;
use crate::journal::{EntryText, JournalStore, KeyValueBackend, UNAVAILABLE_WARNING};
use crate::ui;
use crate::wellness::{pick_motivation, pick_quote, Responder};

pub mod actions;
pub mod state;

use self::actions::ActionDispatcher;
pub use state::{AppState, ChatLine, InputLine, OverlayState, Panel, Speaker};

pub type Journal = JournalStore<Box<dyn KeyValueBackend>>;

const NOT_PERSISTED_MESSAGE: &str = "Kept for this session only; the journal could not be saved.";

enum Action {
    Quit,
    NextPanel,
    PreviousPanel,
    ShowPanel(Panel),
    ShowQuote,
    ShowMotivation,
    MoveMood(isize),
    SelectMood,
    SaveMood,
    StartBreathing,
    StopBreathing,
    StartQuiz,
    Answer(bool),
}

pub struct App {
    journal: Journal,
    state: AppState,
    list_state: ListState,
    responder: Responder,
    rng: StdRng,
    offset: UtcOffset,
    should_quit: bool,
    tick_rate: Duration,
}

impl App {
    pub fn new(config: &AppConfig, journal: Journal, offset: UtcOffset) -> Self {
        let mut state = AppState::new(config);
        if !journal.probe_availability() {
            tracing::warn!("storage probe failed; journal will not persist this session");
            state.storage_warning = Some(UNAVAILABLE_WARNING);
            state.set_status_message(Some(UNAVAILABLE_WARNING));
        }
        state.set_entries(journal.list());
        Self {
            journal,
            state,
            list_state: ListState::default(),
            responder: Responder::new(),
            rng: StdRng::from_entropy(),
            offset,
            should_quit: false,
            tick_rate: Duration::from_millis(100),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn run(&mut self) -> Result<()> {
        let mut terminal = setup_terminal()?;
        let result = self.event_loop(&mut terminal);
        restore_terminal(&mut terminal)?;
        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        loop {
            terminal
                .draw(|frame| {
                    if self.state.entries.is_empty() {
                        self.list_state.select(None);
                    } else {
                        self.list_state.select(Some(self.state.selected_entry));
                    }
                    ui::draw_app(frame, &self.state, &mut self.list_state, self.offset);
                })
                .context("rendering frame")?;

            if self.should_quit {
                break;
            }

            let timeout = self
                .tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(0));

            if event::poll(timeout).context("polling for terminal events")? {
                if let Event::Key(key) = event::read().context("reading terminal event")? {
                    self.handle_key(key);
                }
            }

            if last_tick.elapsed() >= self.tick_rate {
                self.on_tick(Instant::now());
                last_tick = Instant::now();
            }
        }
        Ok(())
    }

    pub fn on_tick(&mut self, now: Instant) {
        self.state.deliver_due_replies(now);
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }
        if self.handle_overlay_key(key) {
            return;
        }
        match key.code {
            KeyCode::Tab => return self.handle_action(Action::NextPanel),
            KeyCode::BackTab => return self.handle_action(Action::PreviousPanel),
            _ => {}
        }
        if self.state.panel.accepts_text() {
            self.handle_input_key(key);
            return;
        }

        let plain = !key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER);
        let panel = self.state.panel;
        let action = match key.code {
            KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
            KeyCode::Char(digit @ '1'..='6') if plain => {
                let index = digit as usize - '1' as usize;
                Panel::from_index(index).map(Action::ShowPanel)
            }
            KeyCode::Char('g') if plain && matches!(panel, Panel::Home | Panel::Mood) => {
                Some(Action::ShowQuote)
            }
            KeyCode::Char('m') if plain && panel == Panel::Home => Some(Action::ShowMotivation),
            KeyCode::Left | KeyCode::Char('h') if panel == Panel::Mood => {
                Some(Action::MoveMood(-1))
            }
            KeyCode::Right | KeyCode::Char('l') if panel == Panel::Mood => {
                Some(Action::MoveMood(1))
            }
            KeyCode::Enter | KeyCode::Char(' ') if panel == Panel::Mood => {
                Some(Action::SelectMood)
            }
            KeyCode::Char('s') if plain && panel == Panel::Mood => Some(Action::SaveMood),
            KeyCode::Char('s') if plain && panel == Panel::Breathe => {
                Some(Action::StartBreathing)
            }
            KeyCode::Char('x') if plain && panel == Panel::Breathe => Some(Action::StopBreathing),
            KeyCode::Char('s') if plain && panel == Panel::Quiz => Some(Action::StartQuiz),
            KeyCode::Char('y') if plain && panel == Panel::Quiz => Some(Action::Answer(true)),
            KeyCode::Char('n') if plain && panel == Panel::Quiz => Some(Action::Answer(false)),
            _ => None,
        };

        if let Some(action) = action {
            self.handle_action(action);
        }
    }

    fn handle_action(&mut self, action: Action) {
        match action {
            Action::Quit => self.should_quit = true,
            Action::NextPanel => self.state.switch_panel(self.state.panel.next()),
            Action::PreviousPanel => self.state.switch_panel(self.state.panel.previous()),
            Action::ShowPanel(panel) => self.state.switch_panel(panel),
            Action::ShowQuote => {
                let quote = pick_quote(&mut self.rng);
                if self.state.panel == Panel::Mood {
                    self.state.mood_message = quote.to_string();
                } else {
                    self.state.quote = Some(quote);
                }
            }
            Action::ShowMotivation => self.state.quote = Some(pick_motivation(&mut self.rng)),
            Action::MoveMood(delta) => self.state.move_mood_cursor(delta),
            Action::SelectMood => self.state.select_mood_at_cursor(),
            Action::SaveMood => self.save_mood(),
            Action::StartBreathing => {
                if !self.state.breathing.start(Instant::now()) {
                    self.state.set_status_message(Some("Breathing guide already running"));
                }
            }
            Action::StopBreathing => self.state.breathing.stop(),
            Action::StartQuiz => self.state.quiz.start(),
            Action::Answer(yes) => {
                self.state.quiz.answer(yes);
            }
        }
    }

    fn handle_overlay_key(&mut self, key: KeyEvent) -> bool {
        let Some(OverlayState::ConfirmClear) = self.state.overlay() else {
            return false;
        };
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                self.state.close_overlay();
                let entries = ActionDispatcher::new(&mut self.journal).clear_all();
                self.state.set_entries(entries);
                self.state.set_status_message(Some("Journal cleared."));
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.state.close_overlay();
                self.state.set_status_message(Some("Journal kept."));
            }
            _ => {}
        }
        true
    }

    fn handle_input_key(&mut self, key: KeyEvent) {
        let panel = self.state.panel;
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('x') if ctrl && panel == Panel::Journal => {
                self.state.open_overlay(OverlayState::ConfirmClear);
            }
            KeyCode::Esc => {
                if self.active_input().is_empty() {
                    self.state.switch_panel(Panel::Home);
                } else {
                    self.active_input().take();
                }
            }
            KeyCode::Enter => match panel {
                Panel::Journal => self.save_journal_input(),
                _ => self.send_chat(Instant::now()),
            },
            KeyCode::Up if panel == Panel::Journal => self.state.move_entry_selection(-1),
            KeyCode::Down if panel == Panel::Journal => self.state.move_entry_selection(1),
            KeyCode::Char(ch)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER) =>
            {
                self.active_input().insert_char(ch);
            }
            KeyCode::Backspace => {
                self.active_input().backspace();
            }
            KeyCode::Delete => {
                self.active_input().delete();
            }
            KeyCode::Left => self.active_input().move_left(),
            KeyCode::Right => self.active_input().move_right(),
            KeyCode::Home => self.active_input().move_home(),
            KeyCode::End => self.active_input().move_end(),
            _ => {}
        }
    }

    fn active_input(&mut self) -> &mut InputLine {
        match self.state.panel {
            Panel::Journal => &mut self.state.journal_input,
            _ => &mut self.state.chat_input,
        }
    }

    fn save_mood(&mut self) {
        let Some(mood) = self.state.take_selected_mood() else {
            self.state.set_status_message(Some("Pick a mood first."));
            return;
        };
        let recorded = ActionDispatcher::new(&mut self.journal).record_mood(mood);
        self.state.set_entries(recorded.entries);
        self.state.mood_message = if recorded.persisted {
            String::from("Saved to your journal.")
        } else {
            String::from(NOT_PERSISTED_MESSAGE)
        };
        self.state.mood_cursor = 0;
    }

    fn save_journal_input(&mut self) {
        let text = match EntryText::parse(self.state.journal_input.as_str()) {
            Ok(text) => text,
            Err(_) => {
                self.state.set_status_message(Some("Write something to save."));
                return;
            }
        };
        self.state.journal_input.take();
        let recorded = ActionDispatcher::new(&mut self.journal).record(&text);
        self.state.set_entries(recorded.entries);
        self.state.selected_entry = 0;
        if recorded.persisted {
            self.state.set_status_message(Some("Saved."));
        } else {
            self.state.set_status_message(Some(NOT_PERSISTED_MESSAGE));
        }
    }

    fn send_chat(&mut self, now: Instant) {
        let message = self.state.chat_input.as_str().trim().to_owned();
        if message.is_empty() {
            return;
        }
        self.state.chat_input.take();
        let reply = self.responder.reply(&message, &mut self.rng);
        self.state.push_chat(Speaker::You, message);
        self.state.schedule_reply(now, reply);
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen).context("switching to alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("creating terminal backend")?;
    terminal.hide_cursor().context("hiding cursor")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    terminal.show_cursor().ok();
    disable_raw_mode().context("disabling raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen).context("restoring screen state")?;
    Ok(())
}
