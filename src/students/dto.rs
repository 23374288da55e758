use serde::{Deserialize, Serialize};

use super::{grades::Buckets, repo_types::StudentView};

/// Body of `POST /students`. Every field is optional at the wire level so the
/// service can name the missing one.
#[derive(Debug, Default, Deserialize)]
pub struct CreateStudentRequest {
    pub name: Option<String>,
    pub age: Option<f64>,
    pub grades: Option<Vec<f64>>,
}

/// Body of `PUT /students/:id`.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateStudentRequest {
    pub name: Option<String>,
    pub age: Option<f64>,
    pub grades: Option<Vec<f64>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    pub page: Option<i64>,
    pub size: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StudentPage {
    pub items: Vec<StudentView>,
    pub page: i64,
    pub size: i64,
    pub total: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassAverageResponse {
    pub class_average: f64,
}

#[derive(Debug, Serialize)]
pub struct RemovedResponse {
    pub removed: bool,
}

/// All buckets, or the single list asked for via `?status=`.
#[derive(Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReportResponse {
    All(Buckets),
    Bucket(Vec<StudentView>),
}
