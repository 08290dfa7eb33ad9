use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::{IntoParams, ToSchema};

use super::{DateRangeQuery, error::ApiError};
use crate::model::attendance::AttendanceFilter;
use crate::stats::{self, ClassStat, WeeklyStat};
use crate::store::Store;
use crate::utils::date::optional_calendar_day;

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct StatisticsQuery {
    /// Count only this class's records; every class is still listed
    pub class_id: Option<u64>,
    /// First day, inclusive (YYYY-MM-DD)
    #[serde(default, deserialize_with = "optional_calendar_day")]
    #[param(value_type = Option<String>, example = "2024-01-01")]
    pub start_date: Option<NaiveDate>,
    /// Last day, inclusive (YYYY-MM-DD)
    #[serde(default, deserialize_with = "optional_calendar_day")]
    #[param(value_type = Option<String>, example = "2024-03-31")]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClassStatsResponse {
    pub class_stats: Vec<ClassStat>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyStatsResponse {
    pub weekly_stats: Vec<WeeklyStat>,
}

/// Per-class attendance totals and rate
#[utoipa::path(
    get,
    path = "/api/statistics",
    params(StatisticsQuery),
    responses(
        (status = 200, description = "One entry per class, in class listing order", body = ClassStatsResponse),
        (status = 400, description = "Malformed date or class id")
    ),
    tag = "Statistics"
)]
pub async fn class_statistics(
    store: web::Data<dyn Store>,
    query: web::Query<StatisticsQuery>,
) -> Result<HttpResponse, ApiError> {
    let filter = AttendanceFilter {
        class_id: query.class_id,
        ..AttendanceFilter::range(query.start_date, query.end_date)
    };

    // one snapshot per request, read concurrently; classId narrows records only
    let (classes, students, attendance) = futures::try_join!(
        store.fetch_classes(false),
        store.fetch_students(None),
        store.fetch_attendance(&filter),
    )?;

    let classes = classes.into_iter().map(|summary| summary.class).collect();
    let students = students.into_iter().map(|s| s.student).collect();
    let attendance: Vec<_> = attendance.into_iter().map(|d| d.attendance).collect();
    debug!(records = attendance.len(), "Computing class statistics");

    let rosters = stats::group_rosters(classes, students, attendance);
    Ok(HttpResponse::Ok().json(ClassStatsResponse {
        class_stats: stats::class_stats(&rosters),
    }))
}

/// Attendance rate per ISO week
#[utoipa::path(
    get,
    path = "/api/statistics/weekly",
    params(DateRangeQuery),
    responses(
        (status = 200, description = "One entry per ISO week, oldest first", body = WeeklyStatsResponse),
        (status = 400, description = "Malformed date")
    ),
    tag = "Statistics"
)]
pub async fn weekly_statistics(
    store: web::Data<dyn Store>,
    query: web::Query<DateRangeQuery>,
) -> Result<HttpResponse, ApiError> {
    let records = store.fetch_attendance(&query.to_filter()).await?;

    Ok(HttpResponse::Ok().json(WeeklyStatsResponse {
        weekly_stats: stats::weekly_stats(records.iter().map(|d| &d.attendance)),
    }))
}
