use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use super::repo_types::{NewUser, User};

#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Stores a new user. Returns `None` when the email is already taken;
    /// the check and the insert happen as one step.
    async fn create(&self, user: NewUser) -> anyhow::Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn count(&self) -> anyhow::Result<i64>;
}

// ---- in-memory ----

#[derive(Default)]
struct UserTable {
    rows: Vec<User>,
    next_id: i64,
}

/// Process-local user store; contents are lost on restart.
#[derive(Default)]
pub struct MemoryUserRepo {
    table: RwLock<UserTable>,
}

impl MemoryUserRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepo for MemoryUserRepo {
    async fn create(&self, user: NewUser) -> anyhow::Result<Option<User>> {
        let mut table = self.table.write().await;
        if table
            .rows
            .iter()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Ok(None);
        }
        table.next_id += 1;
        let created = User {
            id: table.next_id,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };
        table.rows.push(created.clone());
        Ok(Some(created))
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn count(&self) -> anyhow::Result<i64> {
        Ok(self.table.read().await.rows.len() as i64)
    }
}

// ---- postgres ----

pub struct PgUserRepo {
    db: PgPool,
}

impl PgUserRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn create(&self, user: NewUser) -> anyhow::Result<Option<User>> {
        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash)
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO NOTHING
            RETURNING id, name, email, password_hash, created_at
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_optional(&self.db)
        .await
        .context("insert user")?;
        Ok(created)
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, created_at
            FROM users
            WHERE email = lower($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    async fn count(&self) -> anyhow::Result<i64> {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.db)
            .await
            .context("count users")?;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Ana".into(),
            email: email.into(),
            password_hash: "hash".into(),
        }
    }

    #[tokio::test]
    async fn assigns_monotonic_ids() {
        let repo = MemoryUserRepo::new();
        let a = repo.create(new_user("a@demo.com")).await.unwrap().unwrap();
        let b = repo.create(new_user("b@demo.com")).await.unwrap().unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(repo.find_by_email("b@demo.com").await.unwrap().unwrap().id, 2);
    }

    #[tokio::test]
    async fn duplicate_email_is_refused_without_mutation() {
        let repo = MemoryUserRepo::new();
        repo.create(new_user("ana@demo.com")).await.unwrap();
        let dup = repo.create(new_user("ANA@demo.com")).await.unwrap();
        assert!(dup.is_none());
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn email_lookup_ignores_case() {
        let repo = MemoryUserRepo::new();
        repo.create(new_user("ana@demo.com")).await.unwrap();
        assert!(repo.find_by_email("Ana@Demo.com").await.unwrap().is_some());
        assert!(repo.find_by_email("bruno@demo.com").await.unwrap().is_none());
    }
}
