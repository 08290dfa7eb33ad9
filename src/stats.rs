//! Attendance aggregation.
//!
//! Every function here is a pure transform over records already fetched
//! from a [`Store`](crate::store::Store); nothing is cached between calls.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::{
    attendance::{Attendance, AttendanceDetail, AttendanceStatus},
    class::Class,
    student::Student,
};

/// Percentage of `present` out of `total`, rounded half-up; 0 for an empty set.
pub fn attendance_rate(present: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let present = present.min(total);
    // floor(present * 100 / total + 1/2) in integers
    ((present * 200 + total) / (2 * total)) as u8
}

/// ISO-8601 week a day belongs to. The year is the week-year (the year of
/// that week's Thursday), which differs from the calendar year around New Year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WeekKey {
    pub year: i32,
    pub week: u32,
}

impl fmt::Display for WeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{}", self.year, self.week)
    }
}

pub fn week_of(day: NaiveDate) -> WeekKey {
    let iso = day.iso_week();
    WeekKey {
        year: iso.year(),
        week: iso.week(),
    }
}

/// A class and, for each of its students, the records inside the requested range.
#[derive(Debug, Clone)]
pub struct ClassRoster {
    pub class: Class,
    pub attendance_by_student: Vec<Vec<Attendance>>,
}

/// Attach students to their class and records to their student.
/// Class order is kept as given; students and records whose owner is not
/// in the input are dropped.
pub fn group_rosters(
    classes: Vec<Class>,
    students: Vec<Student>,
    attendances: Vec<Attendance>,
) -> Vec<ClassRoster> {
    let mut by_student: HashMap<u64, Vec<Attendance>> = HashMap::new();
    for attendance in attendances {
        by_student
            .entry(attendance.student_id)
            .or_default()
            .push(attendance);
    }

    let mut by_class: HashMap<u64, Vec<Vec<Attendance>>> = HashMap::new();
    for student in students {
        let attendances = by_student.remove(&student.id).unwrap_or_default();
        by_class.entry(student.class_id).or_default().push(attendances);
    }

    classes
        .into_iter()
        .map(|class| ClassRoster {
            attendance_by_student: by_class.remove(&class.id).unwrap_or_default(),
            class,
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClassStat {
    pub class: Class,
    #[schema(example = 10)]
    pub total_students: usize,
    #[schema(example = 40)]
    pub total_attendances: usize,
    #[schema(example = 31)]
    pub present_count: usize,
    #[schema(example = 9)]
    pub absent_count: usize,
    #[schema(example = 78)]
    pub attendance_rate: u8,
}

pub fn class_stats(rosters: &[ClassRoster]) -> Vec<ClassStat> {
    rosters
        .iter()
        .map(|roster| {
            let records = roster.attendance_by_student.iter().flatten();

            let (mut present, mut absent) = (0usize, 0usize);
            for record in records {
                match record.status {
                    AttendanceStatus::Present => present += 1,
                    AttendanceStatus::Absent => absent += 1,
                }
            }
            let total = present + absent;

            ClassStat {
                class: roster.class.clone(),
                total_students: roster.attendance_by_student.len(),
                total_attendances: total,
                present_count: present,
                absent_count: absent,
                attendance_rate: attendance_rate(present, total),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyStat {
    #[schema(example = "2024-W1")]
    pub week: String,
    #[schema(example = 80)]
    pub attendance_rate: u8,
    #[schema(example = 8)]
    pub present_count: usize,
    #[schema(example = 10)]
    pub total_count: usize,
}

/// Bucket records by ISO week. Buckets come out in calendar order
/// (week 9 before week 10) even though the key is not zero-padded.
pub fn weekly_stats<'a, I>(records: I) -> Vec<WeeklyStat>
where
    I: IntoIterator<Item = &'a Attendance>,
{
    let mut buckets: BTreeMap<WeekKey, (usize, usize)> = BTreeMap::new();

    for record in records {
        let (present, total) = buckets.entry(week_of(record.date)).or_default();
        *total += 1;
        if record.is_present() {
            *present += 1;
        }
    }

    buckets
        .into_iter()
        .map(|(week, (present, total))| WeeklyStat {
            week: week.to_string(),
            attendance_rate: attendance_rate(present, total),
            present_count: present,
            total_count: total,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DailyLog {
    #[schema(example = "2024-01-07", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "Lee Jiho")]
    pub student_name: String,
    #[schema(example = "Grade 7")]
    pub class_name: String,
    pub status: AttendanceStatus,
    #[schema(example = "")]
    pub note: String,
    pub is_quiet_time_done: bool,
}

/// Flatten records into log rows, newest day first and by student name within a day.
pub fn daily_logs(records: &[AttendanceDetail]) -> Vec<DailyLog> {
    let mut logs: Vec<DailyLog> = records
        .iter()
        .map(|detail| {
            let attendance = &detail.attendance;
            DailyLog {
                date: attendance.date,
                student_name: detail.student.student.name.clone(),
                class_name: detail.student.class.name.clone(),
                status: attendance.status,
                note: attendance.note.clone().unwrap_or_default(),
                is_quiet_time_done: attendance.is_present() && attendance.is_quiet_time_done,
            }
        })
        .collect();

    logs.sort_by(|a, b| {
        b.date
            .cmp(&a.date)
            .then_with(|| a.student_name.cmp(&b.student_name))
    });
    logs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::student::StudentWithClass;
    use chrono::{TimeZone, Utc};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn class(id: u64, name: &str) -> Class {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Class {
            id,
            name: name.into(),
            teacher_name: "Teacher".into(),
            created_at: ts,
            updated_at: ts,
        }
    }

    fn student(id: u64, class_id: u64, name: &str) -> Student {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Student {
            id,
            name: name.into(),
            phone: None,
            class_id,
            created_at: ts,
            updated_at: ts,
        }
    }

    fn record(id: u64, student_id: u64, date: NaiveDate, status: AttendanceStatus) -> Attendance {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Attendance {
            id,
            student_id,
            date,
            status,
            note: None,
            is_quiet_time_done: false,
            created_at: ts,
            updated_at: ts,
        }
    }

    use crate::model::attendance::AttendanceStatus::{Absent, Present};

    #[test]
    fn rate_rounds_half_up_and_stays_in_range() {
        assert_eq!(attendance_rate(0, 0), 0);
        assert_eq!(attendance_rate(2, 3), 67);
        assert_eq!(attendance_rate(1, 3), 33);
        assert_eq!(attendance_rate(1, 2), 50);
        assert_eq!(attendance_rate(1, 8), 13); // 12.5
        assert_eq!(attendance_rate(0, 5), 0);
        assert_eq!(attendance_rate(5, 5), 100);
        for total in 1..50 {
            for present in 0..=total {
                assert!(attendance_rate(present, total) <= 100);
            }
        }
    }

    #[test]
    fn thursday_and_sunday_share_a_week() {
        assert_eq!(week_of(day(2024, 1, 4)).to_string(), "2024-W1");
        assert_eq!(week_of(day(2024, 1, 7)), week_of(day(2024, 1, 4)));
        assert_ne!(week_of(day(2024, 1, 8)), week_of(day(2024, 1, 7)));
    }

    #[test]
    fn week_year_follows_thursday() {
        // 2021-01-03 is a Sunday whose Thursday is 2020-12-31
        assert_eq!(week_of(day(2021, 1, 3)).to_string(), "2020-W53");
        // 2024-12-30 is a Monday whose Thursday is 2025-01-02
        assert_eq!(week_of(day(2024, 12, 30)).to_string(), "2025-W1");
    }

    #[test]
    fn class_stats_keep_input_order_and_counts() {
        let classes = vec![class(1, "A"), class(2, "B")];
        let students = vec![student(10, 1, "Kim"), student(11, 1, "Lee"), student(20, 2, "Park")];
        let records = vec![
            record(1, 10, day(2024, 1, 7), Present),
            record(2, 11, day(2024, 1, 7), Present),
            record(3, 10, day(2024, 1, 14), Absent),
            record(4, 20, day(2024, 1, 7), Present),
            record(5, 20, day(2024, 1, 14), Absent),
        ];

        let stats = class_stats(&group_rosters(classes, students, records));

        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].class.name, "A");
        assert_eq!(stats[0].total_students, 2);
        assert_eq!(stats[0].present_count, 2);
        assert_eq!(stats[0].absent_count, 1);
        assert_eq!(stats[0].attendance_rate, 67);
        assert_eq!(stats[1].class.name, "B");
        assert_eq!(stats[1].total_students, 1);
        assert_eq!(stats[1].present_count, 1);
        assert_eq!(stats[1].absent_count, 1);
        assert_eq!(stats[1].attendance_rate, 50);

        for stat in &stats {
            assert_eq!(stat.present_count + stat.absent_count, stat.total_attendances);
        }
    }

    #[test]
    fn class_without_records_has_zero_rate() {
        let stats = class_stats(&group_rosters(
            vec![class(1, "Empty")],
            vec![student(1, 1, "Kim")],
            Vec::new(),
        ));

        assert_eq!(stats[0].total_students, 1);
        assert_eq!(stats[0].total_attendances, 0);
        assert_eq!(stats[0].attendance_rate, 0);
    }

    #[test]
    fn weekly_buckets_are_chronological() {
        let records = vec![
            record(1, 1, day(2024, 3, 4), Present),  // W10
            record(2, 1, day(2024, 2, 26), Absent),  // W9
            record(3, 2, day(2024, 2, 29), Present), // W9
            record(4, 1, day(2024, 1, 4), Present),  // W1
            record(5, 2, day(2024, 1, 7), Absent),   // W1
        ];

        let stats = weekly_stats(&records);
        let weeks: Vec<_> = stats.iter().map(|w| w.week.as_str()).collect();
        assert_eq!(weeks, ["2024-W1", "2024-W9", "2024-W10"]);

        assert_eq!(stats[0].total_count, 2);
        assert_eq!(stats[0].present_count, 1);
        assert_eq!(stats[0].attendance_rate, 50);
        assert_eq!(stats[2].attendance_rate, 100);
    }

    #[test]
    fn weekly_stats_of_nothing_is_empty() {
        assert!(weekly_stats(&Vec::<Attendance>::new()).is_empty());
    }

    fn detail(record: Attendance, student: Student, class: Class) -> AttendanceDetail {
        AttendanceDetail {
            attendance: record,
            student: StudentWithClass { student, class },
        }
    }

    #[test]
    fn daily_logs_sort_by_date_desc_then_name() {
        let a = class(1, "A");
        let records = vec![
            detail(record(1, 2, day(2024, 1, 7), Present), student(2, 1, "Lee"), a.clone()),
            detail(record(2, 3, day(2024, 1, 14), Present), student(3, 1, "Park"), a.clone()),
            detail(record(3, 1, day(2024, 1, 7), Absent), student(1, 1, "Kim"), a),
        ];

        let logs = daily_logs(&records);
        let order: Vec<_> = logs
            .iter()
            .map(|l| (l.date.to_string(), l.student_name.as_str()))
            .collect();

        assert_eq!(
            order,
            [
                ("2024-01-14".to_string(), "Park"),
                ("2024-01-07".to_string(), "Kim"),
                ("2024-01-07".to_string(), "Lee"),
            ]
        );
        assert_eq!(logs[0].class_name, "A");
        assert_eq!(logs[0].note, "");
    }

    #[test]
    fn absent_rows_never_report_quiet_time() {
        let mut stored = record(1, 1, day(2024, 1, 7), Absent);
        stored.is_quiet_time_done = true;
        stored.note = Some("sick".into());

        let logs = daily_logs(&[detail(stored, student(1, 1, "Kim"), class(1, "A"))]);

        assert!(!logs[0].is_quiet_time_done);
        assert_eq!(logs[0].note, "sick");
    }

    #[test]
    fn daily_log_serializes_plain_date() {
        let logs = daily_logs(&[detail(
            record(1, 1, day(2024, 1, 7), Present),
            student(1, 1, "Kim"),
            class(1, "A"),
        )]);

        let json = serde_json::to_value(&logs[0]).unwrap();
        assert_eq!(json["date"], "2024-01-07");
        assert_eq!(json["studentName"], "Kim");
        assert_eq!(json["status"], "PRESENT");
        assert_eq!(json["isQuietTimeDone"], false);
    }
}
