use axum::{
    Json, Router, debug_handler,
    extract::State,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{AppResult, AppState, auth::AuthUser};

/// A user as exposed to other users: everything except the token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafeUser {
    pub id: i64,
    pub name: String,
    pub leader_card_id: i64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(user_create))
        .route("/me", get(user_me))
        .route("/update", post(user_update))
}

pub async fn create_user(
    db_pool: &SqlitePool,
    name: &str,
    leader_card_id: i64,
) -> sqlx::Result<String> {
    let token = Uuid::now_v7().to_string();
    sqlx::query("INSERT INTO users (name, token, leader_card_id) VALUES (?, ?, ?)")
        .bind(name)
        .bind(&token)
        .bind(leader_card_id)
        .execute(db_pool)
        .await?;
    Ok(token)
}

pub async fn get_user_by_token(
    db_pool: &SqlitePool,
    token: &str,
) -> sqlx::Result<Option<SafeUser>> {
    let row: Option<(i64, String, i64)> =
        sqlx::query_as("SELECT id, name, leader_card_id FROM users WHERE token = ?")
            .bind(token)
            .fetch_optional(db_pool)
            .await?;
    Ok(row.map(|(id, name, leader_card_id)| SafeUser {
        id,
        name,
        leader_card_id,
    }))
}

pub async fn update_user(
    db_pool: &SqlitePool,
    user_id: i64,
    name: &str,
    leader_card_id: i64,
) -> sqlx::Result<()> {
    sqlx::query("UPDATE users SET name = ?, leader_card_id = ? WHERE id = ?")
        .bind(name)
        .bind(leader_card_id)
        .bind(user_id)
        .execute(db_pool)
        .await?;
    Ok(())
}

#[derive(Deserialize)]
pub(crate) struct UserCreateRequest {
    user_name: String,
    leader_card_id: i64,
}

#[derive(Serialize)]
pub(crate) struct UserCreateResponse {
    user_token: String,
}

#[debug_handler(state = AppState)]
async fn user_create(
    State(db_pool): State<SqlitePool>,
    Json(req): Json<UserCreateRequest>,
) -> AppResult<Json<UserCreateResponse>> {
    let user_token = create_user(&db_pool, &req.user_name, req.leader_card_id).await?;
    Ok(Json(UserCreateResponse { user_token }))
}

#[debug_handler(state = AppState)]
async fn user_me(AuthUser(user): AuthUser) -> Json<SafeUser> {
    Json(user)
}

#[debug_handler(state = AppState)]
async fn user_update(
    State(db_pool): State<SqlitePool>,
    AuthUser(user): AuthUser,
    Json(req): Json<UserCreateRequest>,
) -> AppResult<Json<serde_json::Value>> {
    update_user(&db_pool, user.id, &req.user_name, req.leader_card_id).await?;
    Ok(Json(serde_json::json!({})))
}
