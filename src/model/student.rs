use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::class::Class;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "Lee Jiho")]
    pub name: String,

    #[schema(example = "010-1234-5678", nullable = true)]
    pub phone: Option<String>,

    #[schema(example = 1)]
    pub class_id: u64,

    #[schema(example = "2024-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,

    #[schema(example = "2024-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StudentWithClass {
    #[serde(flatten)]
    pub student: Student,
    pub class: Class,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentInput {
    #[schema(example = "Lee Jiho")]
    pub name: String,
    #[schema(example = "010-1234-5678", nullable = true)]
    #[serde(default)]
    pub phone: Option<String>,
    #[schema(example = 1)]
    pub class_id: u64,
}

impl StudentInput {
    /// Trimmed copy with a blank phone dropped; `None` when the name is blank.
    pub fn normalized(&self) -> Option<StudentInput> {
        let name = self.name.trim();
        if name.is_empty() {
            return None;
        }

        Some(StudentInput {
            name: name.to_string(),
            phone: self
                .phone
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string),
            class_id: self.class_id,
        })
    }
}
