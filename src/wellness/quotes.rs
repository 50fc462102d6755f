use rand::seq::SliceRandom;
use rand::Rng;

pub const QUOTES: [&str; 5] = [
    "You are stronger than you think.",
    "Small steps are still progress.",
    "Breathe. You are doing your best.",
    "It's okay to rest today.",
    "Reach out — you don't have to be alone.",
];

/// Second, more upbeat set shown by the motivation generator.
pub const MOTIVATION: [&str; 5] = [
    "You are stronger than you think!",
    "One small step every day makes big changes.",
    "Believe in yourself — you can do this.",
    "Your mind is powerful, use it well.",
    "Today is a new chance to grow.",
];

pub fn pick_quote<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    QUOTES.choose(rng).copied().unwrap_or(QUOTES[0])
}

pub fn pick_motivation<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    MOTIVATION.choose(rng).copied().unwrap_or(MOTIVATION[0])
}
