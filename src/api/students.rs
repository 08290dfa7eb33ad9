use actix_web::{HttpResponse, web};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use super::error::ApiError;
use crate::model::student::StudentInput;
use crate::store::{RecordKind, Store};

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct StudentListQuery {
    /// Only students of this class
    pub class_id: Option<u64>,
}

/// Several students for one class, one name per entry.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkStudents {
    #[schema(example = 1)]
    pub class_id: u64,
    #[schema(example = json!(["Kim Doyun", "Lee Seoyeon", "Park Jiwoo"]))]
    pub names: Vec<String>,
}

#[utoipa::path(
    get,
    path = "/api/students",
    params(StudentListQuery),
    responses(
        (status = 200, description = "Students ordered by name, class joined", body = Vec<crate::model::student::StudentWithClass>)
    ),
    tag = "Student"
)]
pub async fn list_students(
    store: web::Data<dyn Store>,
    query: web::Query<StudentListQuery>,
) -> Result<HttpResponse, ApiError> {
    let students = store.fetch_students(query.class_id).await?;
    Ok(HttpResponse::Ok().json(students))
}

/// Create Student
#[utoipa::path(
    post,
    path = "/api/students",
    request_body = StudentInput,
    responses(
        (status = 201, description = "Student created", body = crate::model::student::StudentWithClass),
        (status = 400, description = "Missing name or unknown class", body = Object, example = json!({
            "error": "class 9 does not exist"
        }))
    ),
    tag = "Student"
)]
pub async fn create_student(
    store: web::Data<dyn Store>,
    payload: web::Json<StudentInput>,
) -> Result<HttpResponse, ApiError> {
    let student = store.create_student(&payload).await?;
    info!(student_id = student.student.id, class_id = student.class.id, "Student created");
    Ok(HttpResponse::Created().json(student))
}

/// Register many students into one class at once. Blank names are skipped.
#[utoipa::path(
    post,
    path = "/api/students/bulk",
    request_body = BulkStudents,
    responses(
        (status = 201, description = "Students created", body = Vec<crate::model::student::StudentWithClass>),
        (status = 400, description = "No names given or unknown class")
    ),
    tag = "Student"
)]
pub async fn bulk_create_students(
    store: web::Data<dyn Store>,
    payload: web::Json<BulkStudents>,
) -> Result<HttpResponse, ApiError> {
    let inputs: Vec<StudentInput> = payload
        .names
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .map(|name| StudentInput {
            name: name.to_string(),
            phone: None,
            class_id: payload.class_id,
        })
        .collect();

    if inputs.is_empty() {
        return Err(ApiError::BadRequest(
            "at least one student name is required".into(),
        ));
    }

    if store.fetch_class(payload.class_id).await?.is_none() {
        return Err(ApiError::BadRequest(format!(
            "class {} does not exist",
            payload.class_id
        )));
    }

    let created = try_join_all(inputs.iter().map(|input| store.create_student(input))).await?;
    info!(class_id = payload.class_id, count = created.len(), "Students registered");
    Ok(HttpResponse::Created().json(created))
}

/// Update Student
#[utoipa::path(
    put,
    path = "/api/students/{id}",
    params(
        ("id" = u64, Path, description = "Student ID")
    ),
    request_body = StudentInput,
    responses(
        (status = 200, description = "Student updated", body = crate::model::student::StudentWithClass),
        (status = 400, description = "Missing name or unknown class"),
        (status = 404, description = "Student not found")
    ),
    tag = "Student"
)]
pub async fn update_student(
    store: web::Data<dyn Store>,
    path: web::Path<u64>,
    payload: web::Json<StudentInput>,
) -> Result<HttpResponse, ApiError> {
    let student = store.update_student(path.into_inner(), &payload).await?;
    Ok(HttpResponse::Ok().json(student))
}

/// Delete Student together with their attendance
#[utoipa::path(
    delete,
    path = "/api/students/{id}",
    params(
        ("id" = u64, Path, description = "Student ID")
    ),
    responses(
        (status = 200, description = "Successfully deleted", body = Object, example = json!({
            "success": true
        })),
        (status = 404, description = "Student not found")
    ),
    tag = "Student"
)]
pub async fn delete_student(
    store: web::Data<dyn Store>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let student_id = path.into_inner();
    store.delete_by_id(RecordKind::Student, student_id).await?;
    info!(student_id, "Student deleted");
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}
