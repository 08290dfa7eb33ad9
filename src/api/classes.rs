use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use utoipa::IntoParams;

use super::error::ApiError;
use crate::model::class::ClassInput;
use crate::store::{RecordKind, Store};

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ClassListQuery {
    /// Embed each class's students
    pub include_students: Option<bool>,
}

/// List classes with their student counts
#[utoipa::path(
    get,
    path = "/api/classes",
    params(ClassListQuery),
    responses(
        (status = 200, description = "Classes ordered by name", body = Vec<crate::model::class::ClassSummary>),
        (status = 500, description = "Internal server error")
    ),
    tag = "Class"
)]
pub async fn list_classes(
    store: web::Data<dyn Store>,
    query: web::Query<ClassListQuery>,
) -> Result<HttpResponse, ApiError> {
    let classes = store
        .fetch_classes(query.include_students.unwrap_or(false))
        .await?;
    Ok(HttpResponse::Ok().json(classes))
}

#[utoipa::path(
    get,
    path = "/api/classes/{id}",
    params(
        ("id" = u64, Path, description = "Class ID")
    ),
    responses(
        (status = 200, description = "Class found", body = crate::model::class::Class),
        (status = 404, description = "Class not found", body = Object, example = json!({
            "error": "class 1 not found"
        }))
    ),
    tag = "Class"
)]
pub async fn get_class(
    store: web::Data<dyn Store>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let class_id = path.into_inner();

    match store.fetch_class(class_id).await? {
        Some(class) => Ok(HttpResponse::Ok().json(class)),
        None => Err(ApiError::NotFound(format!("class {class_id} not found"))),
    }
}

/// Create Class
#[utoipa::path(
    post,
    path = "/api/classes",
    request_body = ClassInput,
    responses(
        (status = 201, description = "Class created", body = crate::model::class::Class),
        (status = 400, description = "Missing name or teacher name", body = Object, example = json!({
            "error": "name and teacherName are required"
        }))
    ),
    tag = "Class"
)]
pub async fn create_class(
    store: web::Data<dyn Store>,
    payload: web::Json<ClassInput>,
) -> Result<HttpResponse, ApiError> {
    let class = store.create_class(&payload).await?;
    info!(class_id = class.id, "Class created");
    Ok(HttpResponse::Created().json(class))
}

/// Update Class
#[utoipa::path(
    put,
    path = "/api/classes/{id}",
    params(
        ("id" = u64, Path, description = "Class ID")
    ),
    request_body = ClassInput,
    responses(
        (status = 200, description = "Class updated", body = crate::model::class::Class),
        (status = 400, description = "Missing name or teacher name"),
        (status = 404, description = "Class not found")
    ),
    tag = "Class"
)]
pub async fn update_class(
    store: web::Data<dyn Store>,
    path: web::Path<u64>,
    payload: web::Json<ClassInput>,
) -> Result<HttpResponse, ApiError> {
    let class = store.update_class(path.into_inner(), &payload).await?;
    Ok(HttpResponse::Ok().json(class))
}

/// Delete Class together with its students and their attendance
#[utoipa::path(
    delete,
    path = "/api/classes/{id}",
    params(
        ("id" = u64, Path, description = "Class ID")
    ),
    responses(
        (status = 200, description = "Successfully deleted", body = Object, example = json!({
            "success": true
        })),
        (status = 404, description = "Class not found")
    ),
    tag = "Class"
)]
pub async fn delete_class(
    store: web::Data<dyn Store>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let class_id = path.into_inner();
    store.delete_by_id(RecordKind::Class, class_id).await?;
    info!(class_id, "Class deleted");
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{http::StatusCode, test};
    use serde_json::{Value, json};

    use crate::store::InMemoryStore;

    #[actix_web::test]
    async fn create_then_list_classes() {
        let app = test_app!(Arc::new(InMemoryStore::new()));

        for (name, teacher) in [("Grade 8", "Park"), ("Grade 7", "Kim")] {
            let req = test::TestRequest::post()
                .uri("/api/classes")
                .set_json(json!({ "name": name, "teacherName": teacher }))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::CREATED);
        }

        let req = test::TestRequest::get().uri("/api/classes").to_request();
        let classes: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(classes[0]["name"], "Grade 7");
        assert_eq!(classes[0]["teacherName"], "Kim");
        assert_eq!(classes[0]["studentCount"], 0);
        assert!(classes[0].get("students").is_none());
        assert_eq!(classes[1]["name"], "Grade 8");
    }

    #[actix_web::test]
    async fn missing_teacher_is_a_bad_request() {
        let app = test_app!(Arc::new(InMemoryStore::new()));

        let req = test::TestRequest::post()
            .uri("/api/classes")
            .set_json(json!({ "name": "Grade 7" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/api/classes")
            .set_json(json!({ "name": "Grade 7", "teacherName": "  " }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "name and teacherName are required");
    }

    #[actix_web::test]
    async fn update_and_delete_unknown_class_report_not_found() {
        let app = test_app!(Arc::new(InMemoryStore::new()));

        let req = test::TestRequest::put()
            .uri("/api/classes/41")
            .set_json(json!({ "name": "Grade 7", "teacherName": "Kim" }))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NOT_FOUND
        );

        let req = test::TestRequest::delete().uri("/api/classes/41").to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NOT_FOUND
        );
    }

    #[actix_web::test]
    async fn non_numeric_id_is_a_bad_request() {
        let app = test_app!(Arc::new(InMemoryStore::new()));

        let req = test::TestRequest::get().uri("/api/classes/abc").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].is_string());
    }

    #[actix_web::test]
    async fn update_renames_class() {
        let app = test_app!(Arc::new(InMemoryStore::new()));

        let req = test::TestRequest::post()
            .uri("/api/classes")
            .set_json(json!({ "name": "Grade 7", "teacherName": "Kim" }))
            .to_request();
        let created: Value = test::call_and_read_body_json(&app, req).await;
        let id = created["id"].as_u64().unwrap();

        let req = test::TestRequest::put()
            .uri(&format!("/api/classes/{id}"))
            .set_json(json!({ "name": "Grade 7A", "teacherName": "Choi" }))
            .to_request();
        let updated: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(updated["name"], "Grade 7A");
        assert_eq!(updated["teacherName"], "Choi");

        let req = test::TestRequest::get()
            .uri(&format!("/api/classes/{id}"))
            .to_request();
        let fetched: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(fetched["name"], "Grade 7A");
    }
}
