pub mod appresult;
pub mod auth;
pub mod rooms;
pub mod users;

use axum::{Json, Router, extract::FromRef, routing::get};
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;

pub use appresult::{AppError, AppResult};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .nest("/user", users::router())
        .nest("/room", rooms::router())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "Hello World" }))
}
