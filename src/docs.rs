use crate::api::attendance::{BulkAttendance, BulkAttendanceEntry, DailyLogResponse};
use crate::api::statistics::{ClassStatsResponse, WeeklyStatsResponse};
use crate::api::students::BulkStudents;
use crate::model::attendance::{
    Attendance, AttendanceChange, AttendanceDetail, AttendanceInput, AttendanceStatus,
};
use crate::model::class::{Class, ClassInput, ClassSummary};
use crate::model::student::{Student, StudentInput, StudentWithClass};
use crate::stats::{ClassStat, DailyLog, WeeklyStat};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Youth Group Attendance API",
        version = "1.0.0",
        description = r#"
## Youth Group Attendance

Weekly attendance for a church youth group: classes, the students in them,
and one attendance mark per student per day.

### Features
- **Classes** with their teacher and student counts
- **Students**, individually or registered in bulk per class
- **Attendance** saved per student and day (saving again overwrites), or for a whole roster at once
- **Statistics**: per-class attendance rate, per-ISO-week rate, and a daily attendance log

### Response Format
- JSON everywhere; failures are `{"error": "<message>"}`
- Dates are calendar days, `YYYY-MM-DD`
"#,
    ),
    paths(
        crate::api::classes::list_classes,
        crate::api::classes::get_class,
        crate::api::classes::create_class,
        crate::api::classes::update_class,
        crate::api::classes::delete_class,

        crate::api::students::list_students,
        crate::api::students::create_student,
        crate::api::students::bulk_create_students,
        crate::api::students::update_student,
        crate::api::students::delete_student,

        crate::api::attendance::list_attendance,
        crate::api::attendance::save_attendance,
        crate::api::attendance::bulk_save_attendance,
        crate::api::attendance::update_attendance,
        crate::api::attendance::delete_attendance,
        crate::api::attendance::daily_log,

        crate::api::statistics::class_statistics,
        crate::api::statistics::weekly_statistics
    ),
    components(
        schemas(
            Class,
            ClassInput,
            ClassSummary,
            Student,
            StudentInput,
            StudentWithClass,
            BulkStudents,
            AttendanceStatus,
            Attendance,
            AttendanceDetail,
            AttendanceInput,
            AttendanceChange,
            BulkAttendance,
            BulkAttendanceEntry,
            DailyLog,
            DailyLogResponse,
            ClassStat,
            ClassStatsResponse,
            WeeklyStat,
            WeeklyStatsResponse
        )
    ),
    tags(
        (name = "Class", description = "Class management APIs"),
        (name = "Student", description = "Student management APIs"),
        (name = "Attendance", description = "Attendance recording APIs"),
        (name = "Statistics", description = "Attendance statistics APIs"),
    )
)]
pub struct ApiDoc;
