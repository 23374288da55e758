use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use super::{claims::Claims, services::AuthService};
use crate::errors::AppError;

/// Guards a route: rejects with 401 unless a valid bearer token is present.
pub struct AuthUser(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AuthService: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = AuthService::from_ref(state);
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        match auth.authenticate(header) {
            Ok(claims) => Ok(AuthUser(claims)),
            Err(kind) => {
                warn!(reason = ?kind, "request rejected by auth guard");
                Err(kind.into())
            }
        }
    }
}
