//! The widget's non-journal features. Each one reaches the journal only
//! through text handed to [`JournalStore::append`](crate::journal::JournalStore::append).

pub mod breathing;
pub mod chat;
pub mod mood;
pub mod quiz;
pub mod quotes;

pub use breathing::{BreathPhase, BreathingGuide};
pub use chat::Responder;
pub use mood::Mood;
pub use quiz::{QuizProgress, StressLevel, StressQuiz, StressResult};
pub use quotes::{pick_motivation, pick_quote};
