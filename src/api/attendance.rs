use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};
use utoipa::ToSchema;

use super::{DateRangeQuery, error::ApiError};
use crate::model::attendance::{AttendanceChange, AttendanceFilter, AttendanceInput, AttendanceStatus};
use crate::stats::{self, DailyLog};
use crate::store::{RecordKind, Store};
use crate::utils::date::calendar_day;

/// One student's mark inside a bulk save.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkAttendanceEntry {
    #[schema(example = 3)]
    pub student_id: u64,
    /// Unmarked students count as absent
    #[serde(default)]
    pub status: AttendanceStatus,
    #[serde(default)]
    #[schema(nullable = true)]
    pub note: Option<String>,
    #[serde(default)]
    pub is_quiet_time_done: bool,
}

/// Marks for a whole roster on one day.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkAttendance {
    #[serde(deserialize_with = "calendar_day")]
    #[schema(example = "2024-01-07", format = "date", value_type = String)]
    pub date: NaiveDate,
    pub entries: Vec<BulkAttendanceEntry>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DailyLogResponse {
    pub logs: Vec<DailyLog>,
}

/// Attendance records with student and class joined in
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(AttendanceFilter),
    responses(
        (status = 200, description = "Records, newest day first", body = Vec<crate::model::attendance::AttendanceDetail>),
        (status = 400, description = "Malformed date or class id")
    ),
    tag = "Attendance"
)]
pub async fn list_attendance(
    store: web::Data<dyn Store>,
    query: web::Query<AttendanceFilter>,
) -> Result<HttpResponse, ApiError> {
    let records = store.fetch_attendance(&query).await?;
    debug!(count = records.len(), filter = ?query.0, "Attendance fetched");
    Ok(HttpResponse::Ok().json(records))
}

/// Create or overwrite the record for a student on a day
#[utoipa::path(
    post,
    path = "/api/attendance",
    request_body = AttendanceInput,
    responses(
        (status = 200, description = "Record saved", body = crate::model::attendance::AttendanceDetail),
        (status = 400, description = "Missing fields or unknown student", body = Object, example = json!({
            "error": "student 3 does not exist"
        }))
    ),
    tag = "Attendance"
)]
pub async fn save_attendance(
    store: web::Data<dyn Store>,
    payload: web::Json<AttendanceInput>,
) -> Result<HttpResponse, ApiError> {
    let saved = store.upsert_attendance(&payload).await?;
    info!(
        student_id = payload.student_id,
        date = %payload.date,
        status = %payload.status,
        "Attendance saved"
    );
    Ok(HttpResponse::Ok().json(saved))
}

/// Save a whole roster for one day. Each entry is an independent upsert.
#[utoipa::path(
    post,
    path = "/api/attendance/bulk",
    request_body = BulkAttendance,
    responses(
        (status = 200, description = "Records saved", body = Vec<crate::model::attendance::AttendanceDetail>),
        (status = 400, description = "No entries or unknown student")
    ),
    tag = "Attendance"
)]
pub async fn bulk_save_attendance(
    store: web::Data<dyn Store>,
    payload: web::Json<BulkAttendance>,
) -> Result<HttpResponse, ApiError> {
    if payload.entries.is_empty() {
        return Err(ApiError::BadRequest(
            "at least one attendance entry is required".into(),
        ));
    }

    let inputs: Vec<AttendanceInput> = payload
        .entries
        .iter()
        .map(|entry| AttendanceInput {
            student_id: entry.student_id,
            date: payload.date,
            status: entry.status,
            note: entry.note.clone(),
            is_quiet_time_done: entry.is_quiet_time_done,
        })
        .collect();

    let saved = try_join_all(inputs.iter().map(|input| store.upsert_attendance(input))).await?;
    info!(date = %payload.date, count = saved.len(), "Attendance roster saved");
    Ok(HttpResponse::Ok().json(saved))
}

/// Update Attendance
#[utoipa::path(
    put,
    path = "/api/attendance/{id}",
    params(
        ("id" = u64, Path, description = "Attendance record ID")
    ),
    request_body = AttendanceChange,
    responses(
        (status = 200, description = "Record updated", body = crate::model::attendance::AttendanceDetail),
        (status = 404, description = "Record not found")
    ),
    tag = "Attendance"
)]
pub async fn update_attendance(
    store: web::Data<dyn Store>,
    path: web::Path<u64>,
    payload: web::Json<AttendanceChange>,
) -> Result<HttpResponse, ApiError> {
    let updated = store.update_attendance(path.into_inner(), &payload).await?;
    Ok(HttpResponse::Ok().json(updated))
}

/// Delete Attendance
#[utoipa::path(
    delete,
    path = "/api/attendance/{id}",
    params(
        ("id" = u64, Path, description = "Attendance record ID")
    ),
    responses(
        (status = 200, description = "Successfully deleted", body = Object, example = json!({
            "success": true
        })),
        (status = 404, description = "Record not found")
    ),
    tag = "Attendance"
)]
pub async fn delete_attendance(
    store: web::Data<dyn Store>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let attendance_id = path.into_inner();
    store
        .delete_by_id(RecordKind::Attendance, attendance_id)
        .await?;
    info!(attendance_id, "Attendance deleted");
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

/// Attendance log: one row per record, newest day first
#[utoipa::path(
    get,
    path = "/api/attendance/daily",
    params(DateRangeQuery),
    responses(
        (status = 200, description = "Log rows", body = DailyLogResponse)
    ),
    tag = "Attendance"
)]
pub async fn daily_log(
    store: web::Data<dyn Store>,
    query: web::Query<DateRangeQuery>,
) -> Result<HttpResponse, ApiError> {
    let records = store.fetch_attendance(&query.to_filter()).await?;
    Ok(HttpResponse::Ok().json(DailyLogResponse {
        logs: stats::daily_logs(&records),
    }))
}
