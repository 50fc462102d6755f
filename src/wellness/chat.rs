use rand::seq::SliceRandom;
use rand::Rng;
use regex::{Regex, RegexBuilder};

const RULES: [(&str, &str); 4] = [
    (
        "sad|down|depress",
        "I'm sorry you're feeling low. Small steps can help — try a short walk or breathing.",
    ),
    (
        "anxious|anxiety|nervous",
        "Anxiety is heavy. Try breathing: inhale 4s, exhale 4s. You're not alone.",
    ),
    (
        "stress|stressed|overwhelm",
        "Break tasks into tiny pieces and take a calming break.",
    ),
    (
        "help|suicide|hurt|kill",
        "If you are thinking about harming yourself, contact emergency services or a helpline immediately.",
    ),
];

pub const DEFAULT_REPLIES: [&str; 3] = [
    "Thanks for sharing. It's okay to feel how you feel.",
    "You matter. Try naming five things you can see right now.",
    "If this feels heavy, consider speaking to someone you trust.",
];

/// Keyword responder: the first matching rule wins, otherwise a random
/// comforting default.
pub struct Responder {
    rules: Vec<(Regex, &'static str)>,
}

impl Responder {
    pub fn new() -> Self {
        let rules = RULES
            .iter()
            .filter_map(|(pattern, reply)| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .ok()
                    .map(|regex| (regex, *reply))
            })
            .collect();
        Self { rules }
    }

    /// Reply from the rule table only.
    pub fn matched_reply(&self, message: &str) -> Option<&'static str> {
        self.rules
            .iter()
            .find(|(regex, _)| regex.is_match(message))
            .map(|(_, reply)| *reply)
    }

    pub fn reply<R: Rng + ?Sized>(&self, message: &str, rng: &mut R) -> &'static str {
        self.matched_reply(message).unwrap_or_else(|| {
            DEFAULT_REPLIES
                .choose(rng)
                .copied()
                .unwrap_or(DEFAULT_REPLIES[0])
        })
    }
}

impl Default for Responder {
    fn default() -> Self {
        Self::new()
    }
}
