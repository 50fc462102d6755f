use std::fmt;

pub const QUESTIONS: [&str; 5] = [
    "Have you felt nervous or on edge recently?",
    "Have worries kept you up at night?",
    "Have you felt irritable or short-tempered?",
    "Have tasks felt overwhelming recently?",
    "Have you had trouble focusing because of stress?",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StressLevel {
    Low,
    Moderate,
    High,
}

impl StressLevel {
    pub fn from_score(score: usize) -> Self {
        match score {
            0..=1 => StressLevel::Low,
            2..=3 => StressLevel::Moderate,
            _ => StressLevel::High,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StressResult {
    pub score: usize,
    pub total: usize,
    pub level: StressLevel,
}

impl fmt::Display for StressResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (score, total) = (self.score, self.total);
        match self.level {
            StressLevel::Low => write!(f, "Low stress ({score}/{total}). Keep healthy routines."),
            StressLevel::Moderate => {
                write!(f, "Moderate stress ({score}/{total}). Try breaks & breathing.")
            }
            StressLevel::High => {
                write!(f, "High stress ({score}/{total}). Consider talking to someone.")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizProgress {
    NotStarted,
    Asking(&'static str),
    Finished(StressResult),
}

/// Five yes/no questions; every "yes" adds one to the score.
#[derive(Debug, Clone, Default)]
pub struct StressQuiz {
    index: usize,
    score: usize,
    active: bool,
    result: Option<StressResult>,
}

impl StressQuiz {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self) {
        self.index = 0;
        self.score = 0;
        self.active = true;
        self.result = None;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn question_number(&self) -> usize {
        self.index + 1
    }

    /// Records an answer. Ignored when no quiz is running.
    pub fn answer(&mut self, yes: bool) -> QuizProgress {
        if !self.active {
            return self.progress();
        }
        if yes {
            self.score += 1;
        }
        self.index += 1;
        if self.index >= QUESTIONS.len() {
            self.active = false;
            self.result = Some(StressResult {
                score: self.score,
                total: QUESTIONS.len(),
                level: StressLevel::from_score(self.score),
            });
        }
        self.progress()
    }

    pub fn result(&self) -> Option<StressResult> {
        self.result
    }

    pub fn progress(&self) -> QuizProgress {
        if self.active {
            return QuizProgress::Asking(QUESTIONS[self.index]);
        }
        match self.result {
            Some(result) => QuizProgress::Finished(result),
            None => QuizProgress::NotStarted,
        }
    }
}
