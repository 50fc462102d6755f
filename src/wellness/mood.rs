use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Mood {
    Happy,
    Calm,
    Okay,
    Sad,
    Anxious,
    Angry,
}

impl Mood {
    pub fn all() -> Vec<Mood> {
        Mood::iter().collect()
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Mood::Happy => "😊",
            Mood::Calm => "😌",
            Mood::Okay => "🙂",
            Mood::Sad => "😢",
            Mood::Anxious => "😰",
            Mood::Angry => "😠",
        }
    }

    pub fn selection_message(self) -> String {
        format!("You feel {self}. That's valid. Try a breathing moment if needed.")
    }

    pub fn journal_text(self) -> String {
        format!("Mood: {self}")
    }
}
