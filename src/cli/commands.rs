use std::fmt::Write as _;
use std::io::{self, BufRead, Read, Write};

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use time::UtcOffset;

use crate::app::actions::ActionDispatcher;
use crate::app::App;
use crate::config::AppConfig;
use crate::journal::{Entry, EntryText, JournalStore, KeyValueBackend, UNAVAILABLE_WARNING};
use crate::ui::{display_text, format_entry_time};
use crate::wellness::{
    pick_motivation, pick_quote, Mood, QuizProgress, Responder, StressQuiz, StressResult,
};

#[derive(Args, Debug, Clone)]
pub struct JournalArgs {
    #[command(subcommand)]
    pub command: JournalCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum JournalCommand {
    /// Save a new entry (reads stdin when no text is given)
    Add(AddArgs),
    /// Print entries, newest first
    List(ListArgs),
    /// Delete every entry
    Clear(ClearArgs),
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    /// Entry text; words are joined with spaces
    #[arg()]
    pub text: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Only print the most recent N entries
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct ClearArgs {
    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(Args, Debug, Clone)]
pub struct MoodArgs {
    /// One of: happy, calm, okay, sad, anxious, angry
    pub mood: Mood,
}

#[derive(Args, Debug, Clone)]
pub struct QuoteArgs {
    /// Draw from the motivation set instead of the encouraging quotes
    #[arg(long, short = 'm')]
    pub motivation: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ChatArgs {
    /// Message to answer; starts a line-by-line conversation when omitted
    #[arg()]
    pub message: Vec<String>,
}

pub fn run_tui(app: &mut App) -> Result<()> {
    app.run()
}

/// Prints the one-time persistence advisory when the startup probe fails.
pub fn warn_if_unavailable<B: KeyValueBackend>(journal: &JournalStore<B>) -> bool {
    let available = journal.probe_availability();
    if !available {
        eprintln!("warning: {UNAVAILABLE_WARNING}");
    }
    available
}

pub fn handle_journal_command<B: KeyValueBackend>(
    config: &AppConfig,
    journal: &mut JournalStore<B>,
    offset: UtcOffset,
    args: JournalArgs,
) -> Result<()> {
    match args.command {
        JournalCommand::Add(args) => {
            let raw = if args.text.is_empty() {
                read_stdin()?.unwrap_or_default()
            } else {
                args.text.join(" ")
            };
            let output = add_entry(journal, &raw, offset)?;
            print!("{output}");
        }
        JournalCommand::List(args) => {
            let limit = args.limit.unwrap_or(config.journal.list_limit);
            print!("{}", format_entries(&journal.list(), limit, offset));
        }
        JournalCommand::Clear(args) => {
            let confirmed = args.yes || confirm("Clear all journal entries?")?;
            print!("{}", clear_entries(journal, confirmed));
        }
    }
    Ok(())
}

pub fn record_mood<B: KeyValueBackend>(
    journal: &mut JournalStore<B>,
    args: MoodArgs,
) -> Result<()> {
    let recorded = ActionDispatcher::new(journal).record_mood(args.mood);
    println!("{}", args.mood.selection_message());
    if !recorded.persisted {
        bail!("mood was not saved: {}", failure_reason(journal));
    }
    println!("Saved to your journal.");
    Ok(())
}

pub fn print_quote(args: QuoteArgs) -> Result<()> {
    let mut rng = rand::thread_rng();
    let quote = if args.motivation {
        pick_motivation(&mut rng)
    } else {
        pick_quote(&mut rng)
    };
    println!("{quote}");
    Ok(())
}

pub fn take_quiz() -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    run_quiz(stdin.lock(), &mut stdout)?;
    Ok(())
}

pub fn chat(args: ChatArgs) -> Result<()> {
    let responder = Responder::new();
    let mut rng = rand::thread_rng();
    if !args.message.is_empty() {
        println!("{}", responder.reply(&args.message.join(" "), &mut rng));
        return Ok(());
    }
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    run_chat(&responder, stdin.lock(), &mut stdout, &mut rng)
}

fn add_entry<B: KeyValueBackend>(
    journal: &mut JournalStore<B>,
    raw: &str,
    offset: UtcOffset,
) -> Result<String> {
    let Ok(text) = EntryText::parse(raw) else {
        bail!("write something to save");
    };
    let recorded = ActionDispatcher::new(journal).record(&text);
    let when = format_entry_time(&recorded.entry, offset);
    if !recorded.persisted {
        bail!("entry from {when} was not saved: {}", failure_reason(journal));
    }
    Ok(format!("Saved entry ({when}).\n"))
}

fn failure_reason<B: KeyValueBackend>(journal: &JournalStore<B>) -> String {
    journal
        .last_failure()
        .map(ToString::to_string)
        .unwrap_or_else(|| "storage unavailable".to_string())
}

fn clear_entries<B: KeyValueBackend>(journal: &mut JournalStore<B>, confirmed: bool) -> String {
    if !confirmed {
        return "Journal kept.\n".to_string();
    }
    ActionDispatcher::new(journal).clear_all();
    "Journal cleared.\n".to_string()
}

fn format_entries(entries: &[Entry], limit: usize, offset: UtcOffset) -> String {
    if entries.is_empty() {
        return "No journal entries yet.\n".to_string();
    }
    let take = if limit == 0 { entries.len() } else { limit };
    let mut out = String::new();
    for entry in entries.iter().take(take) {
        let _ = writeln!(
            &mut out,
            "{}  {}",
            format_entry_time(entry, offset),
            display_text(&entry.text)
        );
    }
    if take < entries.len() {
        let _ = writeln!(&mut out, "… {} older", entries.len() - take);
    }
    out
}

fn run_quiz<R: BufRead, W: Write>(mut input: R, out: &mut W) -> Result<StressResult> {
    let mut quiz = StressQuiz::new();
    quiz.start();
    let mut line = String::new();
    loop {
        let question = match quiz.progress() {
            QuizProgress::Asking(question) => question,
            QuizProgress::Finished(result) => {
                writeln!(out, "{result}")?;
                return Ok(result);
            }
            QuizProgress::NotStarted => bail!("quiz did not start"),
        };
        write!(out, "{}. {question} [y/n] ", quiz.question_number())?;
        out.flush()?;
        loop {
            line.clear();
            if input.read_line(&mut line).context("reading answer")? == 0 {
                bail!("quiz interrupted before the last question");
            }
            match parse_yes_no(&line) {
                Some(yes) => {
                    quiz.answer(yes);
                    break;
                }
                None => {
                    write!(out, "Please answer y or n: ")?;
                    out.flush()?;
                }
            }
        }
    }
}

fn run_chat<R: BufRead, W: Write, G: rand::Rng>(
    responder: &Responder,
    input: R,
    out: &mut W,
    rng: &mut G,
) -> Result<()> {
    writeln!(out, "Say anything; an empty line or Ctrl-D ends the chat.")?;
    for line in input.lines() {
        let line = line.context("reading chat message")?;
        let message = line.trim();
        if message.is_empty() || matches!(message, "exit" | "quit") {
            break;
        }
        writeln!(out, "MindMend: {}", responder.reply(message, rng))?;
    }
    Ok(())
}

fn parse_yes_no(answer: &str) -> Option<bool> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

fn confirm(question: &str) -> Result<bool> {
    let mut stdout = io::stdout();
    write!(stdout, "{question} [y/N] ")?;
    stdout.flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(parse_yes_no(&input).unwrap_or(false))
}

fn read_stdin() -> Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(Some(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::{MemoryBackend, ENTRIES_KEY};
    use crate::wellness::StressLevel;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    type TestResult<T = ()> = Result<T>;

    fn journal() -> JournalStore<MemoryBackend> {
        JournalStore::new(MemoryBackend::new())
    }

    fn entry(timestamp: i64, text: &str) -> Entry {
        Entry {
            timestamp,
            text: text.into(),
        }
    }

    fn at_minute_five() -> i64 {
        300_000
    }

    #[test]
    fn cli_add_rejects_blank_text() {
        let mut journal = journal();
        let err = add_entry(&mut journal, "  \n", UtcOffset::UTC).unwrap_err();
        assert_eq!(err.to_string(), "write something to save");
        assert!(journal.list().is_empty());
    }

    #[test]
    fn cli_add_then_list_shows_newest_first() -> TestResult {
        let mut journal = journal();
        let saved = add_entry(&mut journal, "morning walk\n", UtcOffset::UTC)?;
        assert!(saved.starts_with("Saved entry ("));
        add_entry(&mut journal, "evening tea", UtcOffset::UTC)?;

        let listing = format_entries(&journal.list(), 0, UtcOffset::UTC);
        let lines: Vec<_> = listing.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("  evening tea"));
        assert!(lines[1].ends_with("  morning walk"));
        Ok(())
    }

    #[test]
    fn cli_add_reports_the_new_entry_time() -> TestResult {
        let mut journal = JournalStore::with_clock(MemoryBackend::new(), at_minute_five);
        journal.backend().set(ENTRIES_KEY, r#"[{"t":0,"text":"old"}]"#)?;
        let saved = add_entry(&mut journal, "today", UtcOffset::UTC)?;
        assert_eq!(saved, "Saved entry (1970-01-01 00:05).\n");
        Ok(())
    }

    #[test]
    fn cli_add_fails_when_the_write_is_refused() -> TestResult {
        let backend = MemoryBackend::with_quota(30);
        backend.set(ENTRIES_KEY, r#"[{"t":0,"text":"old"}]"#)?;
        let mut journal = JournalStore::with_clock(backend, at_minute_five);

        let err = add_entry(&mut journal, "today", UtcOffset::UTC).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("entry from 1970-01-01 00:05 was not saved"));
        assert!(!message.contains("00:00"));
        assert_eq!(journal.list(), vec![entry(0, "old")]);
        Ok(())
    }

    #[test]
    fn cli_list_limit_reports_remaining() {
        let entries = vec![entry(120_000, "c"), entry(60_000, "b\u{7}"), entry(0, "a")];
        insta::assert_snapshot!(
            format_entries(&entries, 2, UtcOffset::UTC),
            @r###"
        1970-01-01 00:02  c
        1970-01-01 00:01  b�
        … 1 older
        "###
        );
        assert_eq!(format_entries(&[], 0, UtcOffset::UTC), "No journal entries yet.\n");
    }

    #[test]
    fn cli_clear_respects_confirmation() {
        let mut journal = journal();
        journal.append("x");
        assert_eq!(clear_entries(&mut journal, false), "Journal kept.\n");
        assert_eq!(journal.list().len(), 1);
        assert_eq!(clear_entries(&mut journal, true), "Journal cleared.\n");
        assert!(journal.list().is_empty());
        assert_eq!(clear_entries(&mut journal, true), "Journal cleared.\n");
    }

    #[test]
    fn cli_mood_records_entry() -> TestResult {
        let mut journal = journal();
        record_mood(&mut journal, MoodArgs { mood: Mood::Sad })?;
        assert_eq!(journal.list()[0].text, "Mood: sad");
        Ok(())
    }

    #[test]
    fn cli_mood_reports_refused_write() {
        let mut journal = JournalStore::new(MemoryBackend::with_quota(10));
        let err = record_mood(&mut journal, MoodArgs { mood: Mood::Calm }).unwrap_err();
        assert!(err.to_string().starts_with("mood was not saved: storage quota exceeded"));
        assert!(journal.list().is_empty());
    }

    #[test]
    fn cli_quiz_reprompts_on_unclear_answers() -> TestResult {
        let input = b"y\nmaybe\nYES\nn\nno\nn\n";
        let mut out = Vec::new();
        let result = run_quiz(&input[..], &mut out)?;
        assert_eq!(result.score, 2);
        assert_eq!(result.level, StressLevel::Moderate);

        let printed = String::from_utf8(out)?;
        assert!(printed.contains("Please answer y or n"));
        assert!(printed.ends_with("Moderate stress (2/5). Try breaks & breathing.\n"));
        Ok(())
    }

    #[test]
    fn cli_quiz_fails_on_early_eof() {
        let mut out = Vec::new();
        assert!(run_quiz(&b"y\n"[..], &mut out).is_err());
    }

    #[test]
    fn cli_chat_answers_until_blank_line() -> TestResult {
        let responder = Responder::new();
        let mut rng = StdRng::seed_from_u64(1);
        let mut out = Vec::new();
        run_chat(
            &responder,
            &b"so stressed\n\nnot read\n"[..],
            &mut out,
            &mut rng,
        )?;
        let printed = String::from_utf8(out)?;
        assert!(printed.contains("MindMend: Break tasks into tiny pieces"));
        assert_eq!(printed.matches("MindMend:").count(), 1);
        Ok(())
    }
}
