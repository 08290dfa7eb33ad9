use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::{RecordKind, Store, StoreError, StoreResult};
use crate::model::{
    attendance::{Attendance, AttendanceChange, AttendanceDetail, AttendanceFilter, AttendanceInput},
    class::{Class, ClassInput, ClassSummary},
    student::{Student, StudentInput, StudentWithClass},
};

#[derive(Debug, Default)]
struct Tables {
    classes: BTreeMap<u64, Class>,
    students: BTreeMap<u64, Student>,
    attendance: BTreeMap<u64, Attendance>,
    last_class_id: u64,
    last_student_id: u64,
    last_attendance_id: u64,
}

impl Tables {
    fn student_with_class(&self, student: &Student) -> Option<StudentWithClass> {
        let class = self.classes.get(&student.class_id)?;
        Some(StudentWithClass {
            student: student.clone(),
            class: class.clone(),
        })
    }

    fn detail(&self, attendance: &Attendance) -> Option<AttendanceDetail> {
        let student = self.students.get(&attendance.student_id)?;
        Some(AttendanceDetail {
            attendance: attendance.clone(),
            student: self.student_with_class(student)?,
        })
    }

    fn student_detail(&self, id: u64) -> StoreResult<StudentWithClass> {
        self.students
            .get(&id)
            .and_then(|s| self.student_with_class(s))
            .ok_or(StoreError::NotFound {
                entity: RecordKind::Student.name(),
                id,
            })
    }

    fn attendance_detail(&self, id: u64) -> StoreResult<AttendanceDetail> {
        self.attendance
            .get(&id)
            .and_then(|a| self.detail(a))
            .ok_or(StoreError::NotFound {
                entity: RecordKind::Attendance.name(),
                id,
            })
    }

    fn require_class(&self, class_id: u64) -> StoreResult<()> {
        if self.classes.contains_key(&class_id) {
            Ok(())
        } else {
            Err(StoreError::Constraint(format!(
                "class {class_id} does not exist"
            )))
        }
    }
}

/// Process-local store backed by ordered maps. Used when no database is
/// configured and by the HTTP tests.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables.write().map_err(|_| StoreError::Poisoned)
    }
}

fn by_name(a: &str, a_id: u64, b: &str, b_id: u64) -> std::cmp::Ordering {
    a.cmp(b).then(a_id.cmp(&b_id))
}

#[async_trait]
impl Store for InMemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn fetch_classes(&self, include_students: bool) -> StoreResult<Vec<ClassSummary>> {
        let tables = self.read()?;

        let mut summaries: Vec<ClassSummary> = tables
            .classes
            .values()
            .map(|class| {
                let mut students: Vec<Student> = tables
                    .students
                    .values()
                    .filter(|s| s.class_id == class.id)
                    .cloned()
                    .collect();
                students.sort_by(|a, b| by_name(&a.name, a.id, &b.name, b.id));

                ClassSummary {
                    class: class.clone(),
                    student_count: students.len() as u64,
                    students: include_students.then_some(students),
                }
            })
            .collect();

        summaries.sort_by(|a, b| by_name(&a.class.name, a.class.id, &b.class.name, b.class.id));
        Ok(summaries)
    }

    async fn fetch_class(&self, id: u64) -> StoreResult<Option<Class>> {
        Ok(self.read()?.classes.get(&id).cloned())
    }

    async fn create_class(&self, input: &ClassInput) -> StoreResult<Class> {
        let input = input
            .normalized()
            .ok_or_else(|| StoreError::Constraint("name and teacherName are required".into()))?;

        let mut tables = self.write()?;
        tables.last_class_id += 1;
        let now = Utc::now();
        let class = Class {
            id: tables.last_class_id,
            name: input.name,
            teacher_name: input.teacher_name,
            created_at: now,
            updated_at: now,
        };
        tables.classes.insert(class.id, class.clone());
        Ok(class)
    }

    async fn update_class(&self, id: u64, input: &ClassInput) -> StoreResult<Class> {
        let input = input
            .normalized()
            .ok_or_else(|| StoreError::Constraint("name and teacherName are required".into()))?;

        let mut tables = self.write()?;
        let class = tables.classes.get_mut(&id).ok_or(StoreError::NotFound {
            entity: RecordKind::Class.name(),
            id,
        })?;
        class.name = input.name;
        class.teacher_name = input.teacher_name;
        class.updated_at = Utc::now();
        Ok(class.clone())
    }

    async fn fetch_students(&self, class_id: Option<u64>) -> StoreResult<Vec<StudentWithClass>> {
        let tables = self.read()?;

        let mut students: Vec<StudentWithClass> = tables
            .students
            .values()
            .filter(|s| class_id.is_none_or(|id| s.class_id == id))
            .filter_map(|s| tables.student_with_class(s))
            .collect();
        students.sort_by(|a, b| by_name(&a.student.name, a.student.id, &b.student.name, b.student.id));
        Ok(students)
    }

    async fn create_student(&self, input: &StudentInput) -> StoreResult<StudentWithClass> {
        let input = input
            .normalized()
            .ok_or_else(|| StoreError::Constraint("name is required".into()))?;

        let mut tables = self.write()?;
        tables.require_class(input.class_id)?;

        tables.last_student_id += 1;
        let now = Utc::now();
        let student = Student {
            id: tables.last_student_id,
            name: input.name,
            phone: input.phone,
            class_id: input.class_id,
            created_at: now,
            updated_at: now,
        };
        let id = student.id;
        tables.students.insert(id, student);
        tables.student_detail(id)
    }

    async fn update_student(
        &self,
        id: u64,
        input: &StudentInput,
    ) -> StoreResult<StudentWithClass> {
        let input = input
            .normalized()
            .ok_or_else(|| StoreError::Constraint("name is required".into()))?;

        let mut tables = self.write()?;
        if !tables.students.contains_key(&id) {
            return Err(StoreError::NotFound {
                entity: RecordKind::Student.name(),
                id,
            });
        }
        tables.require_class(input.class_id)?;

        if let Some(student) = tables.students.get_mut(&id) {
            student.name = input.name;
            student.phone = input.phone;
            student.class_id = input.class_id;
            student.updated_at = Utc::now();
        }
        tables.student_detail(id)
    }

    async fn fetch_attendance(
        &self,
        filter: &AttendanceFilter,
    ) -> StoreResult<Vec<AttendanceDetail>> {
        let tables = self.read()?;

        let mut details: Vec<AttendanceDetail> = tables
            .attendance
            .values()
            .filter_map(|a| tables.detail(a))
            .filter(|d| filter.matches(d))
            .collect();
        details.sort_by(|a, b| {
            b.attendance
                .date
                .cmp(&a.attendance.date)
                .then_with(|| a.student.student.name.cmp(&b.student.student.name))
                .then(a.attendance.id.cmp(&b.attendance.id))
        });
        Ok(details)
    }

    async fn upsert_attendance(&self, input: &AttendanceInput) -> StoreResult<AttendanceDetail> {
        let input = input.normalized();

        let mut tables = self.write()?;
        if !tables.students.contains_key(&input.student_id) {
            return Err(StoreError::Constraint(format!(
                "student {} does not exist",
                input.student_id
            )));
        }

        let now = Utc::now();
        let existing = tables
            .attendance
            .values()
            .find(|a| a.student_id == input.student_id && a.date == input.date)
            .map(|a| a.id);

        let id = match existing {
            Some(id) => {
                if let Some(record) = tables.attendance.get_mut(&id) {
                    record.status = input.status;
                    record.note = input.note;
                    record.is_quiet_time_done = input.is_quiet_time_done;
                    record.updated_at = now;
                }
                id
            }
            None => {
                tables.last_attendance_id += 1;
                let id = tables.last_attendance_id;
                tables.attendance.insert(
                    id,
                    Attendance {
                        id,
                        student_id: input.student_id,
                        date: input.date,
                        status: input.status,
                        note: input.note,
                        is_quiet_time_done: input.is_quiet_time_done,
                        created_at: now,
                        updated_at: now,
                    },
                );
                id
            }
        };

        tables.attendance_detail(id)
    }

    async fn update_attendance(
        &self,
        id: u64,
        change: &AttendanceChange,
    ) -> StoreResult<AttendanceDetail> {
        let change = change.normalized();

        let mut tables = self.write()?;
        let record = tables.attendance.get_mut(&id).ok_or(StoreError::NotFound {
            entity: RecordKind::Attendance.name(),
            id,
        })?;
        record.status = change.status;
        record.note = change.note;
        record.is_quiet_time_done = change.is_quiet_time_done;
        record.updated_at = Utc::now();

        tables.attendance_detail(id)
    }

    async fn delete_by_id(&self, kind: RecordKind, id: u64) -> StoreResult<()> {
        let mut tables = self.write()?;

        let removed = match kind {
            RecordKind::Attendance => tables.attendance.remove(&id).is_some(),
            RecordKind::Student => {
                let removed = tables.students.remove(&id).is_some();
                tables.attendance.retain(|_, a| a.student_id != id);
                removed
            }
            RecordKind::Class => {
                let removed = tables.classes.remove(&id).is_some();
                let orphans: Vec<u64> = tables
                    .students
                    .values()
                    .filter(|s| s.class_id == id)
                    .map(|s| s.id)
                    .collect();
                tables.students.retain(|_, s| s.class_id != id);
                tables
                    .attendance
                    .retain(|_, a| !orphans.contains(&a.student_id));
                removed
            }
        };

        if removed {
            Ok(())
        } else {
            Err(StoreError::NotFound {
                entity: kind.name(),
                id,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::AttendanceStatus;
    use chrono::NaiveDate;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn seeded() -> (InMemoryStore, Class, StudentWithClass) {
        let store = InMemoryStore::new();
        let class = store
            .create_class(&ClassInput {
                name: "Grade 7".into(),
                teacher_name: "Kim".into(),
            })
            .await
            .unwrap();
        let student = store
            .create_student(&StudentInput {
                name: "Lee".into(),
                phone: Some(" ".into()),
                class_id: class.id,
            })
            .await
            .unwrap();
        (store, class, student)
    }

    fn mark(student_id: u64, date: NaiveDate, status: AttendanceStatus) -> AttendanceInput {
        AttendanceInput {
            student_id,
            date,
            status,
            note: None,
            is_quiet_time_done: true,
        }
    }

    #[actix_web::test]
    async fn upsert_keeps_one_record_per_student_and_day() {
        let (store, _, student) = seeded().await;
        let id = student.student.id;

        let first = store
            .upsert_attendance(&mark(id, day(2024, 1, 7), AttendanceStatus::Present))
            .await
            .unwrap();
        let second = store
            .upsert_attendance(&mark(id, day(2024, 1, 7), AttendanceStatus::Absent))
            .await
            .unwrap();

        assert_eq!(first.attendance.id, second.attendance.id);
        assert!(first.attendance.is_quiet_time_done);
        assert!(!second.attendance.is_quiet_time_done);

        let all = store
            .fetch_attendance(&AttendanceFilter::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].attendance.status, AttendanceStatus::Absent);
    }

    #[actix_web::test]
    async fn blank_phone_is_dropped() {
        let (_, _, student) = seeded().await;
        assert!(student.student.phone.is_none());
        assert_eq!(student.class.name, "Grade 7");
    }

    #[actix_web::test]
    async fn attendance_for_unknown_student_is_rejected() {
        let store = InMemoryStore::new();
        let err = store
            .upsert_attendance(&mark(42, day(2024, 1, 7), AttendanceStatus::Present))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
    }

    #[actix_web::test]
    async fn deleting_a_class_cascades() {
        let (store, class, student) = seeded().await;
        store
            .upsert_attendance(&mark(
                student.student.id,
                day(2024, 1, 7),
                AttendanceStatus::Present,
            ))
            .await
            .unwrap();

        store.delete_by_id(RecordKind::Class, class.id).await.unwrap();

        assert!(store.fetch_students(None).await.unwrap().is_empty());
        assert!(
            store
                .fetch_attendance(&AttendanceFilter::default())
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[actix_web::test]
    async fn deleting_a_student_drops_their_attendance() {
        let (store, class, student) = seeded().await;
        let id = student.student.id;
        for date in [day(2024, 1, 7), day(2024, 1, 14)] {
            store
                .upsert_attendance(&mark(id, date, AttendanceStatus::Present))
                .await
                .unwrap();
        }

        store.delete_by_id(RecordKind::Student, id).await.unwrap();

        assert!(
            store
                .fetch_attendance(&AttendanceFilter::default())
                .await
                .unwrap()
                .is_empty()
        );
        assert!(store.fetch_class(class.id).await.unwrap().is_some());
    }

    #[actix_web::test]
    async fn deleting_missing_record_reports_not_found() {
        let store = InMemoryStore::new();
        let err = store
            .delete_by_id(RecordKind::Attendance, 9)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::NotFound {
                entity: "attendance",
                id: 9
            }
        ));
    }

    #[actix_web::test]
    async fn classes_list_by_name_with_counts() {
        let (store, _, _) = seeded().await;
        store
            .create_class(&ClassInput {
                name: "Grade 1".into(),
                teacher_name: "Park".into(),
            })
            .await
            .unwrap();

        let classes = store.fetch_classes(true).await.unwrap();
        let names: Vec<_> = classes.iter().map(|c| c.class.name.as_str()).collect();
        assert_eq!(names, ["Grade 1", "Grade 7"]);
        assert_eq!(classes[1].student_count, 1);
        assert_eq!(classes[1].students.as_ref().map(Vec::len), Some(1));
        assert_eq!(classes[0].student_count, 0);
    }
}
