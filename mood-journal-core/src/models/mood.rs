use std::fmt;
use std::str::FromStr;

/// Number of questions in the daily mood questionnaire.
pub const QUESTION_COUNT: usize = 5;
/// Highest answer value for a single question.
pub const MAX_ANSWER: u8 = 4;
/// Highest possible questionnaire score.
pub const MAX_SCORE: u32 = QUESTION_COUNT as u32 * MAX_ANSWER as u32;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoodError {
    #[error("Expected {expected} answers, got {actual}")]
    WrongAnswerCount { expected: usize, actual: usize },

    #[error("Answer {value} for question {question} is out of range (0-{max})")]
    OutOfRange { question: usize, value: u8, max: u8 },

    #[error("Invalid answer '{0}'. Answers must be whole numbers")]
    NotANumber(String),
}

/// Answers to the daily questionnaire, one per question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoodAnswers([u8; QUESTION_COUNT]);

impl MoodAnswers {
    pub fn new(answers: [u8; QUESTION_COUNT]) -> Result<Self, MoodError> {
        for (i, &value) in answers.iter().enumerate() {
            if value > MAX_ANSWER {
                return Err(MoodError::OutOfRange {
                    question: i + 1,
                    value,
                    max: MAX_ANSWER,
                });
            }
        }
        Ok(Self(answers))
    }

    pub fn answers(&self) -> &[u8; QUESTION_COUNT] {
        &self.0
    }

    /// Sum of all answers.
    pub fn score(&self) -> u32 {
        self.0.iter().map(|&a| a as u32).sum()
    }

    pub fn percentage(&self) -> u8 {
        percentage_for_score(self.score())
    }
}

/// Normalizes a questionnaire score to 0-100, rounding to the nearest integer.
pub fn percentage_for_score(score: u32) -> u8 {
    let score = score.min(MAX_SCORE);
    ((score * 100 + MAX_SCORE / 2) / MAX_SCORE) as u8
}

impl FromStr for MoodAnswers {
    type Err = MoodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();

        if parts.len() != QUESTION_COUNT {
            return Err(MoodError::WrongAnswerCount {
                expected: QUESTION_COUNT,
                actual: parts.len(),
            });
        }

        let mut answers = [0u8; QUESTION_COUNT];
        for (slot, part) in answers.iter_mut().zip(parts) {
            *slot = part
                .parse()
                .map_err(|_| MoodError::NotANumber(part.to_string()))?;
        }
        Self::new(answers)
    }
}

impl fmt::Display for MoodAnswers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|a| a.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}
