mod diary_entry;
mod mood;

pub use diary_entry::{DiaryEntry, EntryState};
pub use mood::{percentage_for_score, MoodAnswers, MoodError, MAX_ANSWER, MAX_SCORE, QUESTION_COUNT};
