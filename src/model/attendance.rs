use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::{IntoParams, ToSchema};

use super::student::StudentWithClass;
use crate::utils::date::{calendar_day, optional_calendar_day};

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum AttendanceStatus {
    Present,
    #[default]
    Absent,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Attendance {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = 3)]
    pub student_id: u64,

    #[schema(example = "2024-01-07", format = "date", value_type = String)]
    pub date: NaiveDate,

    pub status: AttendanceStatus,

    #[schema(example = "Came late", nullable = true)]
    pub note: Option<String>,

    /// Only ever true for PRESENT records
    pub is_quiet_time_done: bool,

    #[schema(example = "2024-01-07T10:00:00Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,

    #[schema(example = "2024-01-07T10:00:00Z", format = "date-time", value_type = String)]
    pub updated_at: DateTime<Utc>,
}

impl Attendance {
    pub fn is_present(&self) -> bool {
        self.status == AttendanceStatus::Present
    }
}

/// Attendance row with its student and the student's class joined in.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AttendanceDetail {
    #[serde(flatten)]
    pub attendance: Attendance,
    pub student: StudentWithClass,
}

/// Payload for "insert or update" keyed on (student_id, date).
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceInput {
    #[schema(example = 3)]
    pub student_id: u64,
    #[serde(deserialize_with = "calendar_day")]
    #[schema(example = "2024-01-07", format = "date", value_type = String)]
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    #[serde(default)]
    #[schema(example = "Came late", nullable = true)]
    pub note: Option<String>,
    #[serde(default)]
    pub is_quiet_time_done: bool,
}

impl AttendanceInput {
    pub fn normalized(&self) -> AttendanceInput {
        AttendanceInput {
            student_id: self.student_id,
            date: self.date,
            status: self.status,
            note: normalize_note(self.note.as_deref()),
            is_quiet_time_done: quiet_time_for(self.status, self.is_quiet_time_done),
        }
    }
}

/// Payload for editing an existing record by id.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceChange {
    pub status: AttendanceStatus,
    #[serde(default)]
    #[schema(nullable = true)]
    pub note: Option<String>,
    #[serde(default)]
    pub is_quiet_time_done: bool,
}

impl AttendanceChange {
    pub fn normalized(&self) -> AttendanceChange {
        AttendanceChange {
            status: self.status,
            note: normalize_note(self.note.as_deref()),
            is_quiet_time_done: quiet_time_for(self.status, self.is_quiet_time_done),
        }
    }
}

fn normalize_note(note: Option<&str>) -> Option<String> {
    note.map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

/// Quiet time is meaningless for an absent student.
pub fn quiet_time_for(status: AttendanceStatus, done: bool) -> bool {
    status == AttendanceStatus::Present && done
}

/// Attendance query. Day bounds are inclusive; `date` selects a single day
/// and wins over `start_date`/`end_date`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AttendanceFilter {
    /// Single calendar day (YYYY-MM-DD)
    #[serde(default, deserialize_with = "optional_calendar_day")]
    #[param(value_type = Option<String>, example = "2024-01-07")]
    pub date: Option<NaiveDate>,
    /// First day of the range, inclusive
    #[serde(default, deserialize_with = "optional_calendar_day")]
    #[param(value_type = Option<String>, example = "2024-01-01")]
    pub start_date: Option<NaiveDate>,
    /// Last day of the range, inclusive
    #[serde(default, deserialize_with = "optional_calendar_day")]
    #[param(value_type = Option<String>, example = "2024-01-31")]
    pub end_date: Option<NaiveDate>,
    /// Only records of students in this class
    pub class_id: Option<u64>,
}

impl AttendanceFilter {
    pub fn range(start_date: Option<NaiveDate>, end_date: Option<NaiveDate>) -> Self {
        Self {
            start_date,
            end_date,
            ..Self::default()
        }
    }

    /// Effective inclusive (from, to) bounds.
    pub fn bounds(&self) -> (Option<NaiveDate>, Option<NaiveDate>) {
        match self.date {
            Some(day) => (Some(day), Some(day)),
            None => (self.start_date, self.end_date),
        }
    }

    pub fn contains_day(&self, day: NaiveDate) -> bool {
        let (from, to) = self.bounds();
        from.is_none_or(|from| day >= from) && to.is_none_or(|to| day <= to)
    }

    pub fn matches(&self, detail: &AttendanceDetail) -> bool {
        self.contains_day(detail.attendance.date)
            && self
                .class_id
                .is_none_or(|class_id| detail.student.student.class_id == class_id)
    }
}
