use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::student::Student;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "Grade 7")]
    pub name: String,

    #[schema(example = "Kim Minji")]
    pub teacher_name: String,

    #[schema(example = "2024-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,

    #[schema(example = "2024-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub updated_at: DateTime<Utc>,
}

/// Class listing row: the class, how many students it owns and,
/// when asked for, the students themselves.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClassSummary {
    #[serde(flatten)]
    pub class: Class,
    #[schema(example = 12)]
    pub student_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub students: Option<Vec<Student>>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClassInput {
    #[schema(example = "Grade 7")]
    pub name: String,
    #[schema(example = "Kim Minji")]
    pub teacher_name: String,
}

impl ClassInput {
    /// Trimmed copy; `None` when a required field is blank.
    pub fn normalized(&self) -> Option<ClassInput> {
        let name = self.name.trim();
        let teacher_name = self.teacher_name.trim();
        if name.is_empty() || teacher_name.is_empty() {
            return None;
        }

        Some(ClassInput {
            name: name.to_string(),
            teacher_name: teacher_name.to_string(),
        })
    }
}
