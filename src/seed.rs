use anyhow::Context;
use axum::extract::FromRef;
use tracing::info;

use crate::{
    auth::services::AuthService,
    state::AppState,
    students::{dto::CreateStudentRequest, services::StudentService},
};

pub const DEMO_EMAIL: &str = "admin@demo.com";
pub const DEMO_PASSWORD: &str = "123456";

const DEMO_STUDENTS: [(&str, f64, &[f64]); 3] = [
    ("Ana", 20.0, &[8.0, 7.5, 9.0]),
    ("Bruno", 22.0, &[5.0, 6.0, 5.5]),
    ("Carla", 19.0, &[4.0, 3.5, 4.8]),
];

/// Loads the demo account and class. Stores that already hold data are left alone.
pub async fn seed_demo_data(state: &AppState) -> anyhow::Result<()> {
    if state.users.count().await? == 0 {
        AuthService::from_ref(state)
            .register(
                Some("Admin".into()),
                Some(DEMO_EMAIL.into()),
                Some(DEMO_PASSWORD.into()),
            )
            .await
            .context("seed admin user")?;
        info!(email = DEMO_EMAIL, "seeded demo user");
    }

    if state.students.list_all().await?.is_empty() {
        let students = StudentService::from_ref(state);
        for (name, age, grades) in DEMO_STUDENTS {
            students
                .create(CreateStudentRequest {
                    name: Some(name.into()),
                    age: Some(age),
                    grades: Some(grades.to_vec()),
                })
                .await
                .with_context(|| format!("seed student {name}"))?;
        }
        info!(count = DEMO_STUDENTS.len(), "seeded demo students");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeds_once() {
        let state = AppState::fake();
        seed_demo_data(&state).await.unwrap();
        seed_demo_data(&state).await.unwrap();

        assert_eq!(state.users.count().await.unwrap(), 1);
        let students = state.students.list_all().await.unwrap();
        assert_eq!(students.len(), 3);
        assert_eq!(students[0].name, "Ana");

        let (_, user) = AuthService::from_ref(&state)
            .login(Some(DEMO_EMAIL.into()), Some(DEMO_PASSWORD.into()))
            .await
            .unwrap();
        assert_eq!(user.name, "Admin");
    }
}
