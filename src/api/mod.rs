//! HTTP surface mounted under `/api/v1`.

pub mod collaboration;
pub mod health;
pub mod memories;
pub mod metacognition;

use axum::Router;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/memories", memories::build_router())
        .nest("/metacognition", metacognition::build_router())
        .nest("/collaboration", collaboration::build_router())
}
