use crate::state::AppState;
use axum::Router;

pub(crate) mod dto;
pub mod grades;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod services;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::crud_routes())
        .merge(handlers::stats_routes())
}
