use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
pub mod manager;
pub mod memory;
pub mod repo;
pub mod repo_types;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::public_routes())
        .merge(handlers::me_routes())
}
