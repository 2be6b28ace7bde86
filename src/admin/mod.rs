use crate::state::AppState;
use axum::Router;

pub mod handlers;
pub mod session;
mod views;

pub fn router() -> Router<AppState> {
    handlers::admin_routes()
}
