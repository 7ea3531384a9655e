use axum::Router;

use crate::AppState;

pub mod auth;

pub fn routes() -> Router<AppState> {
    auth::routes()
}
