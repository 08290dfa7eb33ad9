use async_trait::async_trait;
use derive_more::Display;
use strum_macros::IntoStaticStr;

use crate::model::{
    attendance::{AttendanceChange, AttendanceDetail, AttendanceFilter, AttendanceInput},
    class::{Class, ClassInput, ClassSummary},
    student::{StudentInput, StudentWithClass},
};

pub mod memory;
pub mod mysql;

pub use memory::InMemoryStore;
pub use mysql::MySqlStore;

#[derive(Debug, Display)]
pub enum StoreError {
    #[display(fmt = "{} {} not found", entity, id)]
    NotFound { entity: &'static str, id: u64 },

    #[display(fmt = "constraint violation: {}", _0)]
    Constraint(String),

    #[display(fmt = "database error: {}", _0)]
    Database(sqlx::Error),

    #[display(fmt = "store lock poisoned")]
    Poisoned,
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        // 23000: integrity constraint (duplicate key, missing foreign row)
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.code().as_deref() == Some("23000") {
                return StoreError::Constraint(db_err.message().to_string());
            }
        }
        StoreError::Database(e)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Record kinds that can be removed by primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum RecordKind {
    Class,
    Student,
    Attendance,
}

impl RecordKind {
    pub fn name(self) -> &'static str {
        self.into()
    }

    pub fn table(self) -> &'static str {
        match self {
            RecordKind::Class => "classes",
            RecordKind::Student => "students",
            RecordKind::Attendance => "attendance",
        }
    }
}

/// Data store behind the HTTP layer.
///
/// Orderings are part of the contract: classes and students by name,
/// attendance by date (newest first) then student name.
#[async_trait]
pub trait Store: Send + Sync {
    fn backend(&self) -> &'static str;

    async fn fetch_classes(&self, include_students: bool) -> StoreResult<Vec<ClassSummary>>;

    async fn fetch_class(&self, id: u64) -> StoreResult<Option<Class>>;

    async fn create_class(&self, input: &ClassInput) -> StoreResult<Class>;

    async fn update_class(&self, id: u64, input: &ClassInput) -> StoreResult<Class>;

    async fn fetch_students(&self, class_id: Option<u64>) -> StoreResult<Vec<StudentWithClass>>;

    async fn create_student(&self, input: &StudentInput) -> StoreResult<StudentWithClass>;

    async fn update_student(&self, id: u64, input: &StudentInput)
    -> StoreResult<StudentWithClass>;

    async fn fetch_attendance(&self, filter: &AttendanceFilter)
    -> StoreResult<Vec<AttendanceDetail>>;

    /// Insert or overwrite the record for `(student_id, date)`.
    async fn upsert_attendance(&self, input: &AttendanceInput) -> StoreResult<AttendanceDetail>;

    async fn update_attendance(
        &self,
        id: u64,
        change: &AttendanceChange,
    ) -> StoreResult<AttendanceDetail>;

    /// Removes one record; classes and students take their dependents with them.
    async fn delete_by_id(&self, kind: RecordKind, id: u64) -> StoreResult<()>;
}
