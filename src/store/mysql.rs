use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, MySqlPool};
use tracing::{debug, error};

use super::{RecordKind, Store, StoreError, StoreResult};
use crate::model::{
    attendance::{
        Attendance, AttendanceChange, AttendanceDetail, AttendanceFilter, AttendanceInput,
        AttendanceStatus,
    },
    class::{Class, ClassInput, ClassSummary},
    student::{Student, StudentInput, StudentWithClass},
};

const STUDENT_SELECT: &str = r#"
    SELECT
        s.id, s.name, s.phone, s.class_id, s.created_at, s.updated_at,
        c.name AS class_name,
        c.teacher_name,
        c.created_at AS class_created_at,
        c.updated_at AS class_updated_at
    FROM students s
    JOIN classes c ON c.id = s.class_id
"#;

const ATTENDANCE_SELECT: &str = r#"
    SELECT
        a.id, a.student_id, a.date, a.status, a.note, a.is_quiet_time_done,
        a.created_at, a.updated_at,
        s.name AS student_name,
        s.phone AS student_phone,
        s.class_id,
        s.created_at AS student_created_at,
        s.updated_at AS student_updated_at,
        c.name AS class_name,
        c.teacher_name,
        c.created_at AS class_created_at,
        c.updated_at AS class_updated_at
    FROM attendance a
    JOIN students s ON s.id = a.student_id
    JOIN classes c ON c.id = s.class_id
"#;

#[derive(FromRow)]
struct ClassSummaryRow {
    id: u64,
    name: String,
    teacher_name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    student_count: i64,
}

#[derive(FromRow)]
struct StudentRow {
    id: u64,
    name: String,
    phone: Option<String>,
    class_id: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    class_name: String,
    teacher_name: String,
    class_created_at: DateTime<Utc>,
    class_updated_at: DateTime<Utc>,
}

impl From<StudentRow> for StudentWithClass {
    fn from(row: StudentRow) -> Self {
        StudentWithClass {
            student: Student {
                id: row.id,
                name: row.name,
                phone: row.phone,
                class_id: row.class_id,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            class: Class {
                id: row.class_id,
                name: row.class_name,
                teacher_name: row.teacher_name,
                created_at: row.class_created_at,
                updated_at: row.class_updated_at,
            },
        }
    }
}

#[derive(FromRow)]
struct AttendanceRow {
    id: u64,
    student_id: u64,
    date: NaiveDate,
    status: String,
    note: Option<String>,
    is_quiet_time_done: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    student_name: String,
    student_phone: Option<String>,
    class_id: u64,
    student_created_at: DateTime<Utc>,
    student_updated_at: DateTime<Utc>,
    class_name: String,
    teacher_name: String,
    class_created_at: DateTime<Utc>,
    class_updated_at: DateTime<Utc>,
}

impl TryFrom<AttendanceRow> for AttendanceDetail {
    type Error = StoreError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        let status = AttendanceStatus::from_str(&row.status)
            .map_err(|e| StoreError::Database(sqlx::Error::Decode(Box::new(e))))?;

        Ok(AttendanceDetail {
            attendance: Attendance {
                id: row.id,
                student_id: row.student_id,
                date: row.date,
                status,
                note: row.note,
                is_quiet_time_done: status == AttendanceStatus::Present && row.is_quiet_time_done,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            student: StudentWithClass {
                student: Student {
                    id: row.student_id,
                    name: row.student_name,
                    phone: row.student_phone,
                    class_id: row.class_id,
                    created_at: row.student_created_at,
                    updated_at: row.student_updated_at,
                },
                class: Class {
                    id: row.class_id,
                    name: row.class_name,
                    teacher_name: row.teacher_name,
                    created_at: row.class_created_at,
                    updated_at: row.class_updated_at,
                },
            },
        })
    }
}

// Helper enum for typed SQLx binding
enum FilterValue {
    Day(NaiveDate),
    Id(u64),
}

#[derive(Debug, Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn student_by_id(&self, id: u64) -> StoreResult<Option<StudentWithClass>> {
        let sql = format!("{STUDENT_SELECT} WHERE s.id = ?");
        let row = sqlx::query_as::<_, StudentRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(StudentWithClass::from))
    }

    async fn attendance_where(
        &self,
        where_sql: &str,
        args: Vec<FilterValue>,
    ) -> StoreResult<Vec<AttendanceDetail>> {
        let sql = format!(
            "{ATTENDANCE_SELECT} {where_sql} ORDER BY a.date DESC, s.name ASC, a.id ASC"
        );
        debug!(sql = %sql, "Fetching attendance");

        let mut query = sqlx::query_as::<_, AttendanceRow>(&sql);
        for arg in args {
            query = match arg {
                FilterValue::Day(v) => query.bind(v),
                FilterValue::Id(v) => query.bind(v),
            };
        }

        let rows = query.fetch_all(&self.pool).await.map_err(|e| {
            error!(error = %e, sql = %sql, "Failed to fetch attendance");
            StoreError::from(e)
        })?;

        rows.into_iter().map(AttendanceDetail::try_from).collect()
    }

    async fn attendance_by_id(&self, id: u64) -> StoreResult<AttendanceDetail> {
        self.attendance_where("WHERE a.id = ?", vec![FilterValue::Id(id)])
            .await?
            .into_iter()
            .next()
            .ok_or(StoreError::NotFound {
                entity: RecordKind::Attendance.name(),
                id,
            })
    }
}

#[async_trait]
impl Store for MySqlStore {
    fn backend(&self) -> &'static str {
        "mysql"
    }

    async fn fetch_classes(&self, include_students: bool) -> StoreResult<Vec<ClassSummary>> {
        let rows = sqlx::query_as::<_, ClassSummaryRow>(
            r#"
            SELECT
                c.id, c.name, c.teacher_name, c.created_at, c.updated_at,
                COUNT(s.id) AS student_count
            FROM classes c
            LEFT JOIN students s ON s.class_id = c.id
            GROUP BY c.id, c.name, c.teacher_name, c.created_at, c.updated_at
            ORDER BY c.name ASC, c.id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut students_by_class: HashMap<u64, Vec<Student>> = HashMap::new();
        if include_students {
            for joined in self.fetch_students(None).await? {
                students_by_class
                    .entry(joined.student.class_id)
                    .or_default()
                    .push(joined.student);
            }
        }

        Ok(rows
            .into_iter()
            .map(|row| ClassSummary {
                students: include_students
                    .then(|| students_by_class.remove(&row.id).unwrap_or_default()),
                student_count: row.student_count.max(0) as u64,
                class: Class {
                    id: row.id,
                    name: row.name,
                    teacher_name: row.teacher_name,
                    created_at: row.created_at,
                    updated_at: row.updated_at,
                },
            })
            .collect())
    }

    async fn fetch_class(&self, id: u64) -> StoreResult<Option<Class>> {
        let class = sqlx::query_as::<_, Class>(
            r#"
            SELECT id, name, teacher_name, created_at, updated_at
            FROM classes
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(class)
    }

    async fn create_class(&self, input: &ClassInput) -> StoreResult<Class> {
        let input = input
            .normalized()
            .ok_or_else(|| StoreError::Constraint("name and teacherName are required".into()))?;

        let result = sqlx::query("INSERT INTO classes (name, teacher_name) VALUES (?, ?)")
            .bind(&input.name)
            .bind(&input.teacher_name)
            .execute(&self.pool)
            .await?;

        let id = result.last_insert_id();
        self.fetch_class(id).await?.ok_or(StoreError::NotFound {
            entity: RecordKind::Class.name(),
            id,
        })
    }

    async fn update_class(&self, id: u64, input: &ClassInput) -> StoreResult<Class> {
        let input = input
            .normalized()
            .ok_or_else(|| StoreError::Constraint("name and teacherName are required".into()))?;

        sqlx::query("UPDATE classes SET name = ?, teacher_name = ? WHERE id = ?")
            .bind(&input.name)
            .bind(&input.teacher_name)
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.fetch_class(id).await?.ok_or(StoreError::NotFound {
            entity: RecordKind::Class.name(),
            id,
        })
    }

    async fn fetch_students(&self, class_id: Option<u64>) -> StoreResult<Vec<StudentWithClass>> {
        let where_sql = if class_id.is_some() {
            "WHERE s.class_id = ?"
        } else {
            ""
        };
        let sql = format!("{STUDENT_SELECT} {where_sql} ORDER BY s.name ASC, s.id ASC");

        let mut query = sqlx::query_as::<_, StudentRow>(&sql);
        if let Some(class_id) = class_id {
            query = query.bind(class_id);
        }

        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(StudentWithClass::from).collect())
    }

    async fn create_student(&self, input: &StudentInput) -> StoreResult<StudentWithClass> {
        let input = input
            .normalized()
            .ok_or_else(|| StoreError::Constraint("name is required".into()))?;

        let result = sqlx::query("INSERT INTO students (name, phone, class_id) VALUES (?, ?, ?)")
            .bind(&input.name)
            .bind(&input.phone)
            .bind(input.class_id)
            .execute(&self.pool)
            .await?;

        let id = result.last_insert_id();
        self.student_by_id(id).await?.ok_or(StoreError::NotFound {
            entity: RecordKind::Student.name(),
            id,
        })
    }

    async fn update_student(
        &self,
        id: u64,
        input: &StudentInput,
    ) -> StoreResult<StudentWithClass> {
        let input = input
            .normalized()
            .ok_or_else(|| StoreError::Constraint("name is required".into()))?;

        sqlx::query("UPDATE students SET name = ?, phone = ?, class_id = ? WHERE id = ?")
            .bind(&input.name)
            .bind(&input.phone)
            .bind(input.class_id)
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.student_by_id(id).await?.ok_or(StoreError::NotFound {
            entity: RecordKind::Student.name(),
            id,
        })
    }

    async fn fetch_attendance(
        &self,
        filter: &AttendanceFilter,
    ) -> StoreResult<Vec<AttendanceDetail>> {
        let mut where_sql = String::from("WHERE 1=1");
        let mut args: Vec<FilterValue> = Vec::new();

        let (from, to) = filter.bounds();
        if let Some(from) = from {
            where_sql.push_str(" AND a.date >= ?");
            args.push(FilterValue::Day(from));
        }
        if let Some(to) = to {
            where_sql.push_str(" AND a.date <= ?");
            args.push(FilterValue::Day(to));
        }
        if let Some(class_id) = filter.class_id {
            where_sql.push_str(" AND s.class_id = ?");
            args.push(FilterValue::Id(class_id));
        }

        self.attendance_where(&where_sql, args).await
    }

    async fn upsert_attendance(&self, input: &AttendanceInput) -> StoreResult<AttendanceDetail> {
        let input = input.normalized();

        sqlx::query(
            r#"
            INSERT INTO attendance (student_id, date, status, note, is_quiet_time_done)
            VALUES (?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                status = VALUES(status),
                note = VALUES(note),
                is_quiet_time_done = VALUES(is_quiet_time_done)
            "#,
        )
        .bind(input.student_id)
        .bind(input.date)
        .bind(input.status.as_ref())
        .bind(&input.note)
        .bind(input.is_quiet_time_done)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(error = %e, student_id = input.student_id, date = %input.date, "Attendance upsert failed");
            StoreError::from(e)
        })?;

        self.attendance_where(
            "WHERE a.student_id = ? AND a.date = ?",
            vec![FilterValue::Id(input.student_id), FilterValue::Day(input.date)],
        )
        .await?
        .into_iter()
        .next()
        .ok_or(StoreError::NotFound {
            entity: RecordKind::Student.name(),
            id: input.student_id,
        })
    }

    async fn update_attendance(
        &self,
        id: u64,
        change: &AttendanceChange,
    ) -> StoreResult<AttendanceDetail> {
        let change = change.normalized();

        sqlx::query(
            "UPDATE attendance SET status = ?, note = ?, is_quiet_time_done = ? WHERE id = ?",
        )
        .bind(change.status.as_ref())
        .bind(&change.note)
        .bind(change.is_quiet_time_done)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.attendance_by_id(id).await
    }

    async fn delete_by_id(&self, kind: RecordKind, id: u64) -> StoreResult<()> {
        // table name comes from a closed enum, never from input
        let sql = format!("DELETE FROM {} WHERE id = ?", kind.table());

        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: kind.name(),
                id,
            });
        }
        Ok(())
    }
}
