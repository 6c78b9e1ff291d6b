//! Diary entry commands.

use chrono::{Local, NaiveDate};
use clap::{Args, ValueEnum};
use mood_journal_core::{DiaryEntry, MoodAnswers, MoodError, SyncEngine};

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Record the mood for a day
#[derive(Args)]
pub struct AddArgs {
    /// Date (YYYY-MM-DD or "today"), defaults to today
    #[arg(long, short)]
    date: Option<String>,

    /// Questionnaire answers, five values from 0 to 4 (e.g. "3,4,2,1,4")
    #[arg(long, short)]
    answers: String,

    /// Activity done that day (can be repeated)
    #[arg(long = "activity", value_name = "ACTIVITY")]
    activities: Vec<String>,

    /// Free-form notes
    #[arg(long)]
    notes: Option<String>,
}

/// Change the entry of a day
#[derive(Args)]
pub struct EditArgs {
    /// Date of the entry (YYYY-MM-DD or "today")
    date: String,

    /// New questionnaire answers
    #[arg(long, short)]
    answers: Option<String>,

    /// Replace activities (can be repeated)
    #[arg(long = "activity", value_name = "ACTIVITY")]
    activities: Vec<String>,

    /// Replace notes
    #[arg(long)]
    notes: Option<String>,
}

/// Select the entry of a day
#[derive(Args)]
pub struct DateArgs {
    /// Date of the entry (YYYY-MM-DD or "today")
    date: String,
}

/// List all entries, most recent first
#[derive(Args)]
pub struct ListArgs {
    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    format: OutputFormat,
}

impl AddArgs {
    pub async fn run(&self, engine: &SyncEngine) -> Result<(), EntryCommandError> {
        let day = match &self.date {
            Some(date) => parse_date(date)?,
            None => Local::now().date_naive(),
        };
        let answers: MoodAnswers = self.answers.parse()?;

        let replacing = engine.has_entry_for_date(day);
        let mut entry = DiaryEntry::from_answers(day, &answers)
            .with_activities(self.activities.iter().cloned());
        if let Some(notes) = &self.notes {
            entry = entry.with_notes(notes.as_str());
        }

        // Wait for the background upload so it is not cut short by exit.
        let _ = engine.add_entry(entry).await;

        if replacing {
            println!("Replaced entry for {}:", day);
        } else {
            println!("Added entry for {}:", day);
        }
        println!();
        print_saved(engine, day);
        Ok(())
    }
}

impl EditArgs {
    pub async fn run(&self, engine: &SyncEngine) -> Result<(), EntryCommandError> {
        let day = parse_date(&self.date)?;
        let mut entry = engine
            .entry_for_date(day)
            .ok_or(EntryCommandError::NotFound(day))?;

        if let Some(answers) = &self.answers {
            let answers: MoodAnswers = answers.parse()?;
            entry.mood_score = answers.score();
            entry.mood_percentage = answers.percentage();
        }
        if !self.activities.is_empty() {
            entry.activities = self.activities.clone();
        }
        if let Some(notes) = &self.notes {
            entry.notes = notes.clone();
        }

        let handle = engine
            .update_entry(entry)
            .ok_or(EntryCommandError::NotFound(day))?;
        let _ = handle.await;

        println!("Updated entry for {}:", day);
        println!();
        print_saved(engine, day);
        Ok(())
    }
}

impl DateArgs {
    pub fn delete(&self, engine: &SyncEngine) -> Result<(), EntryCommandError> {
        let day = parse_date(&self.date)?;
        let entry = engine
            .entry_for_date(day)
            .ok_or(EntryCommandError::NotFound(day))?;

        engine.delete_entry(&entry);
        println!("Deleted entry for {} (the server copy is kept).", day);
        Ok(())
    }

    pub fn show(&self, engine: &SyncEngine) -> Result<(), EntryCommandError> {
        let day = parse_date(&self.date)?;
        let entry = engine
            .entry_for_date(day)
            .ok_or(EntryCommandError::NotFound(day))?;

        print!("{}", entry);
        Ok(())
    }
}

impl ListArgs {
    pub fn run(&self, engine: &SyncEngine) -> Result<(), EntryCommandError> {
        let entries = engine.entries();

        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            }
            OutputFormat::Text => {
                if entries.is_empty() {
                    println!("No entries yet.");
                    return Ok(());
                }

                println!(
                    "{:<12} {:>5} {:>5}  {:<8} ACTIVITIES",
                    "DATE", "MOOD", "SCORE", "SYNC"
                );
                for entry in &entries {
                    println!(
                        "{:<12} {:>4}% {:>5}  {:<8} {}",
                        entry.day.to_string(),
                        entry.mood_percentage,
                        entry.mood_score,
                        if entry.is_pending() { "pending" } else { "synced" },
                        entry.activities.join(", ")
                    );
                }

                let pending = engine.pending_count();
                if pending > 0 {
                    println!();
                    println!(
                        "{} entr{} waiting to upload.",
                        pending,
                        if pending == 1 { "y" } else { "ies" }
                    );
                }
            }
        }
        Ok(())
    }
}

/// Parses `YYYY-MM-DD` or `today`.
pub fn parse_date(s: &str) -> Result<NaiveDate, EntryCommandError> {
    if s.eq_ignore_ascii_case("today") {
        return Ok(Local::now().date_naive());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| EntryCommandError::InvalidDate(s.to_string()))
}

fn print_saved(engine: &SyncEngine, day: NaiveDate) {
    if let Some(entry) = engine.entry_for_date(day) {
        print!("{}", entry);
        if entry.is_pending() {
            if let Some(error) = engine.status().last_error {
                println!("Upload pending: {}", error);
            }
        }
    }
}

/// Errors from entry commands
#[derive(Debug)]
pub enum EntryCommandError {
    InvalidDate(String),
    InvalidAnswers(MoodError),
    NotFound(NaiveDate),
    SerializeError(serde_json::Error),
}

impl std::fmt::Display for EntryCommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryCommandError::InvalidDate(s) => {
                write!(f, "Invalid date format '{}'. Use YYYY-MM-DD.", s)
            }
            EntryCommandError::InvalidAnswers(e) => write!(f, "Invalid answers: {}", e),
            EntryCommandError::NotFound(day) => write!(f, "No entry for {}", day),
            EntryCommandError::SerializeError(e) => write!(f, "Failed to serialize: {}", e),
        }
    }
}

impl std::error::Error for EntryCommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EntryCommandError::InvalidAnswers(e) => Some(e),
            EntryCommandError::SerializeError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MoodError> for EntryCommandError {
    fn from(e: MoodError) -> Self {
        EntryCommandError::InvalidAnswers(e)
    }
}

impl From<serde_json::Error> for EntryCommandError {
    fn from(e: serde_json::Error) -> Self {
        EntryCommandError::SerializeError(e)
    }
}
