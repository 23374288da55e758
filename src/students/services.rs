use std::sync::Arc;

use axum::extract::FromRef;
use tracing::{info, warn};

use super::{
    dto::{CreateStudentRequest, Pagination, ReportResponse, StudentPage, UpdateStudentRequest},
    grades::{self, is_valid_grade, Bucket, Buckets},
    repo::StudentRepo,
    repo_types::{NewStudent, StudentPatch, StudentView},
};
use crate::{
    errors::{AppError, AppResult},
    state::AppState,
};

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Names are stored as sent; a blank one is refused.
fn check_name(name: String) -> AppResult<String> {
    if name.trim().is_empty() {
        return Err(AppError::validation("name must not be empty"));
    }
    Ok(name)
}

fn check_age(age: f64) -> AppResult<f64> {
    if !age.is_finite() || age <= 0.0 {
        return Err(AppError::validation("age must be a positive number"));
    }
    Ok(age)
}

fn check_grades(grades: Vec<f64>) -> AppResult<Vec<f64>> {
    if !grades.iter().all(|g| is_valid_grade(*g)) {
        return Err(AppError::validation(
            "grades must be numbers between 0 and 10",
        ));
    }
    Ok(grades)
}

/// Resolves `(page, size)` from the raw query: page >= 1, size in 1..=100.
pub fn normalize_pagination(p: &Pagination) -> (i64, i64) {
    let page = p.page.unwrap_or(1).max(1);
    let size = match p.size {
        Some(size) if size > 0 => size.min(MAX_PAGE_SIZE),
        _ => DEFAULT_PAGE_SIZE,
    };
    (page, size)
}

#[derive(Clone)]
pub struct StudentService {
    students: Arc<dyn StudentRepo>,
}

impl FromRef<AppState> for StudentService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.students.clone())
    }
}

impl StudentService {
    pub fn new(students: Arc<dyn StudentRepo>) -> Self {
        Self { students }
    }

    pub async fn create(&self, req: CreateStudentRequest) -> AppResult<StudentView> {
        let name = req
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| AppError::validation("name is required"))?;
        let age = req
            .age
            .ok_or_else(|| AppError::validation("age is required"))?;
        let grades = req
            .grades
            .filter(|g| !g.is_empty())
            .ok_or_else(|| AppError::validation("grades must be a non-empty list"))?;

        let student = NewStudent {
            name: check_name(name)?,
            age: check_age(age)?,
            grades: check_grades(grades)?,
        };
        let created = self.students.insert(student).await?;
        info!(student_id = created.id, "student created");
        Ok(created.into())
    }

    pub async fn list(&self, pagination: &Pagination) -> AppResult<StudentPage> {
        let (page, size) = normalize_pagination(pagination);
        let offset = (page - 1).saturating_mul(size);
        let (items, total) = self.students.list_page(size, offset).await?;
        Ok(StudentPage {
            items: items.into_iter().map(StudentView::from).collect(),
            page,
            size,
            total,
        })
    }

    pub async fn search(&self, query: Option<&str>) -> AppResult<Vec<StudentView>> {
        let query = query.unwrap_or_default();
        let found = self.students.search_by_name(query).await?;
        Ok(found.into_iter().map(StudentView::from).collect())
    }

    pub async fn update(&self, id: i64, req: UpdateStudentRequest) -> AppResult<StudentView> {
        let patch = StudentPatch {
            name: req.name.map(check_name).transpose()?,
            age: req.age.map(check_age).transpose()?,
            grades: req.grades.map(check_grades).transpose()?,
        };
        let Some(updated) = self.students.update(id, patch).await? else {
            warn!(student_id = id, "update of unknown student");
            return Err(AppError::NotFound("Student not found".into()));
        };
        info!(student_id = id, "student updated");
        Ok(updated.into())
    }

    pub async fn remove(&self, id: i64) -> AppResult<()> {
        if !self.students.delete(id).await? {
            warn!(student_id = id, "delete of unknown student");
            return Err(AppError::NotFound("Student not found".into()));
        }
        info!(student_id = id, "student removed");
        Ok(())
    }

    async fn all_views(&self) -> AppResult<Vec<StudentView>> {
        let all = self.students.list_all().await?;
        Ok(all.into_iter().map(StudentView::from).collect())
    }

    pub async fn class_average(&self) -> AppResult<f64> {
        Ok(grades::class_average(&self.all_views().await?))
    }

    pub async fn top_student(&self) -> AppResult<Option<StudentView>> {
        let all = self.all_views().await?;
        Ok(grades::top_student(&all).cloned())
    }

    /// Unknown statuses yield an empty list; an empty status means "all buckets".
    pub async fn reports(&self, status: Option<&str>) -> AppResult<ReportResponse> {
        let buckets = Buckets::partition(self.all_views().await?);
        Ok(match status.filter(|s| !s.is_empty()) {
            None => ReportResponse::All(buckets),
            Some(status) => match Bucket::parse(status) {
                Some(bucket) => ReportResponse::Bucket(buckets.take(bucket)),
                None => ReportResponse::Bucket(Vec::new()),
            },
        })
    }
}
