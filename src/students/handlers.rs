use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{
        ClassAverageResponse, CreateStudentRequest, Pagination, RemovedResponse, ReportQuery,
        ReportResponse, SearchQuery, StudentPage, UpdateStudentRequest,
    },
    repo_types::StudentView,
    services::StudentService,
};
use crate::{
    auth::extractors::AuthUser,
    errors::{AppError, AppResult},
    state::AppState,
};

pub fn crud_routes() -> Router<AppState> {
    Router::new()
        .route("/students", get(list_students).post(create_student))
        .route("/students/search", get(search_students))
        .route("/students/:id", put(update_student).delete(remove_student))
}

pub fn stats_routes() -> Router<AppState> {
    Router::new()
        .route("/students/stats/average", get(class_average))
        .route("/students/stats/top", get(top_student))
        .route("/students/reports", get(reports))
}

fn parse_id(raw: &str) -> AppResult<i64> {
    raw.parse::<i64>()
        .map_err(|_| AppError::NotFound("Student not found".into()))
}

#[instrument(skip(students, _user))]
pub async fn list_students(
    State(students): State<StudentService>,
    _user: AuthUser,
    query: Result<Query<Pagination>, QueryRejection>,
) -> AppResult<Json<StudentPage>> {
    let Query(pagination) = query?;
    Ok(Json(students.list(&pagination).await?))
}

#[instrument(skip(students, _user))]
pub async fn search_students(
    State(students): State<StudentService>,
    _user: AuthUser,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> AppResult<Json<Vec<StudentView>>> {
    let Query(search) = query?;
    Ok(Json(students.search(search.q.as_deref()).await?))
}

#[instrument(skip(students, _user, payload))]
pub async fn create_student(
    State(students): State<StudentService>,
    _user: AuthUser,
    payload: Result<Json<CreateStudentRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<StudentView>)> {
    let Json(payload) = payload?;
    let created = students.create(payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[instrument(skip(students, _user, payload))]
pub async fn update_student(
    State(students): State<StudentService>,
    _user: AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<UpdateStudentRequest>, JsonRejection>,
) -> AppResult<Json<StudentView>> {
    let Json(payload) = payload?;
    let id = parse_id(&id)?;
    Ok(Json(students.update(id, payload).await?))
}

#[instrument(skip(students, _user))]
pub async fn remove_student(
    State(students): State<StudentService>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<RemovedResponse>> {
    students.remove(parse_id(&id)?).await?;
    Ok(Json(RemovedResponse { removed: true }))
}

#[instrument(skip_all)]
pub async fn class_average(
    State(students): State<StudentService>,
    _user: AuthUser,
) -> AppResult<Json<ClassAverageResponse>> {
    Ok(Json(ClassAverageResponse {
        class_average: students.class_average().await?,
    }))
}

#[instrument(skip_all)]
pub async fn top_student(
    State(students): State<StudentService>,
    _user: AuthUser,
) -> AppResult<Json<Option<StudentView>>> {
    Ok(Json(students.top_student().await?))
}

#[instrument(skip(students, _user))]
pub async fn reports(
    State(students): State<StudentService>,
    _user: AuthUser,
    query: Result<Query<ReportQuery>, QueryRejection>,
) -> AppResult<Json<ReportResponse>> {
    let Query(report) = query?;
    Ok(Json(students.reports(report.status.as_deref()).await?))
}
