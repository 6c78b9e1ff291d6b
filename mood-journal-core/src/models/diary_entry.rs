use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::mood::MoodAnswers;

/// Upload state of an entry relative to the remote copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// Never acknowledged, or modified since the last acknowledgment
    Pending,
    /// Matches the last acknowledged remote state
    Synced,
}

/// One diary record. A collection holds at most one entry per `day`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiaryEntry {
    pub id: Uuid,
    pub day: NaiveDate,
    pub mood_score: u32,
    pub mood_percentage: u8,
    #[serde(default)]
    pub activities: Vec<String>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub is_uploaded: bool,
    #[serde(default)]
    pub last_sync_date: Option<DateTime<Utc>>,
}

impl DiaryEntry {
    pub fn new(day: NaiveDate, mood_score: u32, mood_percentage: u8) -> Self {
        Self {
            id: Uuid::new_v4(),
            day,
            mood_score,
            mood_percentage: mood_percentage.min(100),
            activities: Vec::new(),
            notes: String::new(),
            is_uploaded: false,
            last_sync_date: None,
        }
    }

    pub fn from_answers(day: NaiveDate, answers: &MoodAnswers) -> Self {
        Self::new(day, answers.score(), answers.percentage())
    }

    pub fn with_activities<I, S>(mut self, activities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.activities = activities.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn state(&self) -> EntryState {
        if self.is_uploaded {
            EntryState::Synced
        } else {
            EntryState::Pending
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state() == EntryState::Pending
    }

    pub fn mark_pending(&mut self) {
        self.is_uploaded = false;
    }

    pub fn mark_synced(&mut self, at: DateTime<Utc>) {
        self.is_uploaded = true;
        self.last_sync_date = Some(at);
    }

    /// Compares everything except sync metadata.
    pub fn same_content(&self, other: &DiaryEntry) -> bool {
        self.id == other.id && self.same_fields(other)
    }

    /// Compares the user-visible fields, ignoring id and sync metadata.
    pub fn same_fields(&self, other: &DiaryEntry) -> bool {
        self.day == other.day
            && self.mood_score == other.mood_score
            && self.mood_percentage == other.mood_percentage
            && self.activities == other.activities
            && self.notes == other.notes
    }
}

impl fmt::Display for DiaryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.day)?;
        writeln!(f, "{}", "=".repeat(10))?;
        writeln!(
            f,
            "Mood: {}% (score {})",
            self.mood_percentage, self.mood_score
        )?;

        if !self.activities.is_empty() {
            writeln!(f, "Activities: {}", self.activities.join(", "))?;
        }

        if !self.notes.is_empty() {
            writeln!(f, "\nNotes: {}", self.notes)?;
        }

        match self.last_sync_date {
            Some(at) if self.is_uploaded => writeln!(f, "\nSynced: {}", at.to_rfc3339())?,
            _ => writeln!(f, "\nSynced: pending")?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_entry_new_is_pending() {
        let entry = DiaryEntry::new(day(10), 14, 72);

        assert_eq!(entry.day, day(10));
        assert_eq!(entry.mood_percentage, 72);
        assert!(entry.activities.is_empty());
        assert!(entry.notes.is_empty());
        assert_eq!(entry.state(), EntryState::Pending);
        assert!(entry.last_sync_date.is_none());
    }

    #[test]
    fn test_percentage_is_clamped() {
        let entry = DiaryEntry::new(day(10), 20, 150);
        assert_eq!(entry.mood_percentage, 100);
    }

    #[test]
    fn test_from_answers() {
        let answers: MoodAnswers = "4,4,4,2,0".parse().unwrap();
        let entry = DiaryEntry::from_answers(day(1), &answers);
        assert_eq!(entry.mood_score, 14);
        assert_eq!(entry.mood_percentage, 70);
    }

    #[test]
    fn test_mark_synced_then_pending() {
        let mut entry = DiaryEntry::new(day(2), 10, 50);
        let now = Utc::now();

        entry.mark_synced(now);
        assert_eq!(entry.state(), EntryState::Synced);
        assert_eq!(entry.last_sync_date, Some(now));

        entry.mark_pending();
        assert!(entry.is_pending());
        assert_eq!(entry.last_sync_date, Some(now));
    }

    #[test]
    fn test_same_content_ignores_sync_metadata() {
        let entry = DiaryEntry::new(day(3), 10, 50).with_notes("walk");
        let mut synced = entry.clone();
        synced.mark_synced(Utc::now());
        assert!(entry.same_content(&synced));

        let mut edited = entry.clone();
        edited.notes = "run".to_string();
        assert!(!entry.same_content(&edited));
    }

    #[test]
    fn test_same_fields_ignores_id() {
        let entry = DiaryEntry::new(day(3), 10, 50);
        let mut other = entry.clone();
        other.id = Uuid::new_v4();

        assert!(entry.same_fields(&other));
        assert!(!entry.same_content(&other));
    }

    #[test]
    fn test_entry_display() {
        let entry = DiaryEntry::new(day(10), 14, 72)
            .with_activities(["walk", "reading"])
            .with_notes("Good day");

        let output = format!("{}", entry);
        assert!(output.contains("2024-01-10"));
        assert!(output.contains("72%"));
        assert!(output.contains("walk, reading"));
        assert!(output.contains("Good day"));
        assert!(output.contains("pending"));
    }

    #[test]
    fn test_missing_sync_fields_default() {
        let json = r#"{
            "id": "0b8f8a44-5a4e-4f6b-9d7c-3f1d2b0c9a11",
            "day": "2024-01-10",
            "mood_score": 14,
            "mood_percentage": 72
        }"#;
        let entry: DiaryEntry = serde_json::from_str(json).unwrap();
        assert!(entry.is_pending());
        assert!(entry.activities.is_empty());
    }
}
