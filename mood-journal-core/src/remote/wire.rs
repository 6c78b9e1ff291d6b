//! Wire format of the remote diary service.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::RemoteError;
use crate::models::DiaryEntry;

/// Format used when sending `entry_date`.
pub const ENTRY_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Formats of `entry_date` accepted from the server, besides RFC 3339.
const ACCEPTED_DATE_FORMATS: &[&str] = &[ENTRY_DATE_FORMAT, "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d"];

/// Encodes a day as local midnight.
pub fn format_entry_date(day: NaiveDate) -> String {
    day.and_hms_opt(0, 0, 0)
        .unwrap_or_default()
        .format(ENTRY_DATE_FORMAT)
        .to_string()
}

/// Parses an `entry_date` into a local timestamp.
pub fn parse_entry_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();

    for format in ACCEPTED_DATE_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, format) {
            return Some(ts);
        }
        if let Ok(day) = NaiveDate::parse_from_str(s, format) {
            return day.and_hms_opt(0, 0, 0);
        }
    }

    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Local).naive_local())
}

/// Parses an `entry_date` into the calendar day it falls on.
pub fn parse_entry_date(s: &str) -> Result<NaiveDate, RemoteError> {
    parse_entry_timestamp(s)
        .map(|ts| ts.date())
        .ok_or_else(|| RemoteError::Decode(format!("Unrecognized entry_date '{}'", s)))
}

/// Body of `POST /users`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterDeviceRequest {
    pub device_id: String,
}

/// Body of `POST /diary-entries`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEntryRequest {
    pub entry_uuid: String,
    pub entry_date: String,
    pub mood_score: u32,
    pub mood_percentage: u8,
    #[serde(default)]
    pub activities: Vec<String>,
    #[serde(default)]
    pub notes: String,
    pub device_id: String,
}

impl CreateEntryRequest {
    pub fn new(entry: &DiaryEntry, device_id: &str) -> Self {
        Self {
            entry_uuid: entry.id.to_string(),
            entry_date: format_entry_date(entry.day),
            mood_score: entry.mood_score,
            mood_percentage: entry.mood_percentage,
            activities: entry.activities.clone(),
            notes: entry.notes.clone(),
            device_id: device_id.to_string(),
        }
    }
}

/// The full field set sent by an overwrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryFields {
    pub entry_date: String,
    pub mood_score: u32,
    pub mood_percentage: u8,
    pub activities: Vec<String>,
    pub notes: String,
}

impl From<&DiaryEntry> for EntryFields {
    fn from(entry: &DiaryEntry) -> Self {
        Self {
            entry_date: format_entry_date(entry.day),
            mood_score: entry.mood_score,
            mood_percentage: entry.mood_percentage,
            activities: entry.activities.clone(),
            notes: entry.notes.clone(),
        }
    }
}

/// Body of `PUT /diary-entries/{id}`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateEntryRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood_score: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood_percentage: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activities: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl From<&EntryFields> for UpdateEntryRequest {
    fn from(fields: &EntryFields) -> Self {
        Self {
            entry_date: Some(fields.entry_date.clone()),
            mood_score: Some(fields.mood_score),
            mood_percentage: Some(fields.mood_percentage),
            activities: Some(fields.activities.clone()),
            notes: Some(fields.notes.clone()),
        }
    }
}

/// Acknowledgment returned by write operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// One item of `GET /diary-entries`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteEntry {
    #[serde(default)]
    pub entry_id: Option<i64>,
    pub entry_uuid: String,
    pub entry_date: String,
    pub mood_score: u32,
    pub mood_percentage: u8,
    #[serde(default)]
    pub activities: Option<Vec<String>>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl RemoteEntry {
    /// Converts to a local entry. Sync metadata is left pending; the merge
    /// decides whether the entry is adopted as synced.
    pub fn into_entry(self) -> Result<DiaryEntry, RemoteError> {
        let id = Uuid::parse_str(&self.entry_uuid).map_err(|e| {
            RemoteError::Decode(format!("Invalid entry_uuid '{}': {}", self.entry_uuid, e))
        })?;
        let day = parse_entry_date(&self.entry_date)?;

        Ok(DiaryEntry {
            id,
            day,
            mood_score: self.mood_score,
            mood_percentage: self.mood_percentage.min(100),
            activities: self.activities.unwrap_or_default(),
            notes: self.notes.unwrap_or_default(),
            is_uploaded: false,
            last_sync_date: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_format_entry_date() {
        assert_eq!(format_entry_date(day(2024, 1, 10)), "2024-01-10 00:00:00");
    }

    #[test]
    fn test_parse_fixed_format() {
        assert_eq!(
            parse_entry_date("2024-01-10 18:30:00").unwrap(),
            day(2024, 1, 10)
        );
    }

    #[test]
    fn test_parse_iso_with_fractional_seconds() {
        assert_eq!(
            parse_entry_date("2024-02-01T09:15:42.123456").unwrap(),
            day(2024, 2, 1)
        );
        assert_eq!(
            parse_entry_date("2024-02-01T09:15:42").unwrap(),
            day(2024, 2, 1)
        );
    }

    #[test]
    fn test_parse_rfc3339_with_offset() {
        let ts = parse_entry_timestamp("2024-02-01T12:00:00.5+00:00").unwrap();
        let expected = DateTime::parse_from_rfc3339("2024-02-01T12:00:00.5+00:00")
            .unwrap()
            .with_timezone(&Local)
            .naive_local();
        assert_eq!(ts, expected);
    }

    #[test]
    fn test_parse_date_only() {
        assert_eq!(parse_entry_date("2024-03-05").unwrap(), day(2024, 3, 5));
    }

    #[test]
    fn test_parse_invalid_date() {
        assert!(matches!(
            parse_entry_date("yesterday"),
            Err(RemoteError::Decode(_))
        ));
    }

    #[test]
    fn test_create_request_field_names() {
        let entry = DiaryEntry::new(day(2024, 1, 10), 14, 72)
            .with_activities(["walk"])
            .with_notes("ok");
        let value = serde_json::to_value(CreateEntryRequest::new(&entry, "dev-1")).unwrap();

        assert_eq!(value["entry_uuid"], entry.id.to_string());
        assert_eq!(value["entry_date"], "2024-01-10 00:00:00");
        assert_eq!(value["mood_score"], 14);
        assert_eq!(value["mood_percentage"], 72);
        assert_eq!(value["activities"][0], "walk");
        assert_eq!(value["notes"], "ok");
        assert_eq!(value["device_id"], "dev-1");
    }

    #[test]
    fn test_update_request_skips_absent_fields() {
        let request = UpdateEntryRequest {
            notes: Some("only notes".to_string()),
            ..Default::default()
        };
        let value = serde_json::to_value(&request).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 1);
        assert_eq!(object["notes"], "only notes");
    }

    #[test]
    fn test_remote_entry_into_entry() {
        let json = r#"{
            "entry_id": 7,
            "entry_uuid": "0b8f8a44-5a4e-4f6b-9d7c-3f1d2b0c9a11",
            "entry_date": "2024-02-01T00:00:00.000000",
            "mood_score": 18,
            "mood_percentage": 90,
            "activities": null,
            "notes": null,
            "created_at": "2024-02-01T10:00:00.000000+00:00",
            "updated_at": "2024-02-01T10:00:00.000000+00:00"
        }"#;
        let remote: RemoteEntry = serde_json::from_str(json).unwrap();
        let entry = remote.into_entry().unwrap();

        assert_eq!(entry.day, day(2024, 2, 1));
        assert_eq!(entry.mood_percentage, 90);
        assert!(entry.activities.is_empty());
        assert!(entry.notes.is_empty());
        assert!(entry.is_pending());
    }

    #[test]
    fn test_remote_entry_invalid_uuid() {
        let remote = RemoteEntry {
            entry_id: None,
            entry_uuid: "not-a-uuid".to_string(),
            entry_date: "2024-02-01 00:00:00".to_string(),
            mood_score: 1,
            mood_percentage: 5,
            activities: None,
            notes: None,
            created_at: None,
            updated_at: None,
        };
        assert!(matches!(remote.into_entry(), Err(RemoteError::Decode(_))));
    }
}
