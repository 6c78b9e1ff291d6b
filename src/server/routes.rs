//! HTTP handlers of the diary service.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{NaiveDateTime, SecondsFormat};
use mood_journal_core::remote::wire::{
    parse_entry_timestamp, ApiResponse, CreateEntryRequest, RegisterDeviceRequest, RemoteEntry,
    UpdateEntryRequest,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::error::{ServerError, ServerResult};
use super::storage::{EntryPatch, EntryRecord, NewEntry};
use super::AppState;

/// Format of `entry_date` in list responses.
const RESPONSE_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

#[derive(Serialize)]
pub struct RootResponse {
    message: &'static str,
    status: &'static str,
    version: &'static str,
}

#[derive(Deserialize)]
pub struct DeviceQuery {
    device_id: String,
}

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Mood Journal API Server",
        status: "running",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `POST /users`: idempotent device registration.
pub async fn register_device(
    State(state): State<AppState>,
    Json(request): Json<RegisterDeviceRequest>,
) -> ServerResult<Json<ApiResponse>> {
    let (device, created) = state
        .store
        .register_device(&request.device_id)
        .map_err(|e| ServerError::from_storage("Registration failed", e))?;

    let message = if created {
        "Device registered successfully"
    } else {
        "Device already exists"
    };

    Ok(Json(ApiResponse {
        success: true,
        message: message.to_string(),
        data: Some(json!({ "user_id": device.user_id, "device_id": device.device_id })),
    }))
}

/// `POST /diary-entries`
pub async fn create_entry(
    State(state): State<AppState>,
    Json(request): Json<CreateEntryRequest>,
) -> ServerResult<Json<ApiResponse>> {
    let entry_date = parse_date(&request.entry_date)?;

    let record = state
        .store
        .create_entry(NewEntry {
            device_id: request.device_id,
            entry_uuid: request.entry_uuid,
            entry_date,
            mood_score: request.mood_score,
            mood_percentage: request.mood_percentage,
            activities: Some(request.activities),
            notes: Some(request.notes),
        })
        .map_err(|e| ServerError::from_storage("Upload failed", e))?;

    Ok(Json(acknowledgment(
        "Diary entry uploaded successfully",
        &record,
    )))
}

/// `GET /diary-entries?device_id=`
pub async fn list_entries(
    State(state): State<AppState>,
    Query(query): Query<DeviceQuery>,
) -> ServerResult<Json<Vec<RemoteEntry>>> {
    let records = state
        .store
        .list_entries(&query.device_id)
        .map_err(|e| ServerError::from_storage("Failed to retrieve diary entries", e))?;

    Ok(Json(records.into_iter().map(to_remote_entry).collect()))
}

/// `PUT /diary-entries/{entry_uuid}?device_id=`: partial update.
pub async fn update_entry(
    State(state): State<AppState>,
    Path(entry_uuid): Path<String>,
    Query(query): Query<DeviceQuery>,
    Json(request): Json<UpdateEntryRequest>,
) -> ServerResult<Json<ApiResponse>> {
    let entry_date = request.entry_date.as_deref().map(parse_date).transpose()?;

    let record = state
        .store
        .update_entry(
            &query.device_id,
            &entry_uuid,
            EntryPatch {
                entry_date,
                mood_score: request.mood_score,
                mood_percentage: request.mood_percentage,
                activities: request.activities,
                notes: request.notes,
            },
        )
        .map_err(|e| ServerError::from_storage("Update failed", e))?;

    Ok(Json(acknowledgment(
        "Diary entry updated successfully",
        &record,
    )))
}

fn parse_date(s: &str) -> ServerResult<NaiveDateTime> {
    parse_entry_timestamp(s)
        .ok_or_else(|| ServerError::Validation(format!("Invalid entry_date '{}'", s)))
}

fn acknowledgment(message: &str, record: &EntryRecord) -> ApiResponse {
    ApiResponse {
        success: true,
        message: message.to_string(),
        data: Some(json!({ "entry_id": record.entry_id, "entry_uuid": record.entry_uuid })),
    }
}

fn to_remote_entry(record: EntryRecord) -> RemoteEntry {
    RemoteEntry {
        entry_id: Some(record.entry_id),
        entry_uuid: record.entry_uuid,
        entry_date: record.entry_date.format(RESPONSE_DATE_FORMAT).to_string(),
        mood_score: record.mood_score,
        mood_percentage: record.mood_percentage,
        activities: record.activities,
        notes: record.notes,
        created_at: Some(record.created_at.to_rfc3339_opts(SecondsFormat::Micros, false)),
        updated_at: Some(record.updated_at.to_rfc3339_opts(SecondsFormat::Micros, false)),
    }
}
