use serde::Serialize;
use sqlx::FromRow;

use super::grades::average;

/// Student record with its grades in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct Student {
    pub id: i64,
    pub name: String,
    pub age: f64,
    pub grades: Vec<f64>,
}

/// Row of the `students` table, before grades are attached.
#[derive(Debug, Clone, FromRow)]
pub struct StudentRow {
    pub id: i64,
    pub name: String,
    pub age: f64,
}

impl StudentRow {
    pub fn with_grades(self, grades: Vec<f64>) -> Student {
        Student {
            id: self.id,
            name: self.name,
            age: self.age,
            grades,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewStudent {
    pub name: String,
    pub age: f64,
    pub grades: Vec<f64>,
}

/// Partial update; `grades`, when present, replaces the whole sequence.
#[derive(Debug, Clone, Default)]
pub struct StudentPatch {
    pub name: Option<String>,
    pub age: Option<f64>,
    pub grades: Option<Vec<f64>>,
}

impl StudentPatch {
    pub fn apply(self, student: &mut Student) {
        if let Some(name) = self.name {
            student.name = name;
        }
        if let Some(age) = self.age {
            student.age = age;
        }
        if let Some(grades) = self.grades {
            student.grades = grades;
        }
    }
}

/// Student as returned to clients, annotated with its computed average.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentView {
    pub id: i64,
    pub name: String,
    pub age: f64,
    pub grades: Vec<f64>,
    pub average: f64,
}

impl From<Student> for StudentView {
    fn from(s: Student) -> Self {
        let average = average(&s.grades);
        Self {
            id: s.id,
            name: s.name,
            age: s.age,
            grades: s.grades,
            average,
        }
    }
}
