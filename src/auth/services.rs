use std::sync::Arc;

use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use super::{
    claims::Claims,
    jwt::JwtKeys,
    password::{hash_password, verify_password},
    repo::UserRepo,
    repo_types::{NewUser, User},
};
use crate::{
    errors::{AppError, AppResult, AuthErrorKind},
    state::AppState,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Treats `None`, empty and whitespace-only strings alike.
fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Passwords are taken as sent; only `None` and `""` count as missing.
fn required_password(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepo>,
    keys: JwtKeys,
}

impl FromRef<AppState> for AuthService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.users.clone(), JwtKeys::from_ref(state))
    }
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepo>, keys: JwtKeys) -> Self {
        Self { users, keys }
    }

    pub async fn register(
        &self,
        name: Option<String>,
        email: Option<String>,
        password: Option<String>,
    ) -> AppResult<User> {
        let (Some(name), Some(email), Some(password)) =
            (required(name), required(email), required_password(password))
        else {
            warn!("register with missing fields");
            return Err(AppError::validation("name, email and password are required"));
        };

        let email = normalize_email(&email);
        if !is_valid_email(&email) {
            warn!(email = %email, "invalid email");
            return Err(AppError::validation("Invalid email"));
        }

        if self.users.find_by_email(&email).await?.is_some() {
            warn!(email = %email, "email already registered");
            return Err(AppError::Conflict("Email already registered".into()));
        }

        let password_hash = hash_password(&password)?;
        let user = self
            .users
            .create(NewUser {
                name: name.trim().to_string(),
                email,
                password_hash,
            })
            .await?
            .ok_or_else(|| AppError::Conflict("Email already registered".into()))?;

        info!(user_id = user.id, email = %user.email, "user registered");
        Ok(user)
    }

    pub async fn login(
        &self,
        email: Option<String>,
        password: Option<String>,
    ) -> AppResult<(String, User)> {
        let (Some(email), Some(password)) = (required(email), required_password(password)) else {
            warn!("login with missing fields");
            return Err(AppError::validation("email and password are required"));
        };
        let email = normalize_email(&email);

        let Some(user) = self.users.find_by_email(&email).await? else {
            warn!(email = %email, "login unknown email");
            return Err(AuthErrorKind::InvalidCredentials.into());
        };

        if !verify_password(&password, &user.password_hash)? {
            warn!(email = %email, user_id = user.id, "login invalid password");
            return Err(AuthErrorKind::InvalidCredentials.into());
        }

        let token = self.keys.sign(&user)?;
        info!(user_id = user.id, email = %user.email, "user logged in");
        Ok((token, user))
    }

    /// Validates the raw `Authorization` header value and yields the token claims.
    pub fn authenticate(&self, authorization: Option<&str>) -> Result<Claims, AuthErrorKind> {
        let header = authorization
            .filter(|h| !h.trim().is_empty())
            .ok_or(AuthErrorKind::MissingToken)?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or(AuthErrorKind::InvalidScheme)?
            .trim();
        if token.is_empty() {
            return Err(AuthErrorKind::MissingToken);
        }
        self.keys.verify(token)
    }
}
