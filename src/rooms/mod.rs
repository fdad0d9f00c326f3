pub mod engine;
pub mod model;
mod store;

use axum::{Json, Router, debug_handler, extract::State, routing::post};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::{AppError, AppResult, AppState, auth::AuthUser};
use model::{JoinRoomResult, LiveDifficulty, ResultUser, RoomInfo, RoomStatus, RoomUser};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(room_create))
        .route("/list", post(room_list))
        .route("/join", post(room_join))
        .route("/wait", post(room_wait))
        .route("/leave", post(room_leave))
        .route("/start", post(room_start))
        .route("/end", post(room_end))
        .route("/result", post(room_result))
}

fn empty() -> Json<serde_json::Value> {
    Json(serde_json::json!({}))
}

#[derive(Deserialize)]
pub(crate) struct RoomCreateRequest {
    live_id: i64,
    select_difficulty: LiveDifficulty,
}

#[derive(Serialize)]
pub(crate) struct RoomCreateResponse {
    room_id: i64,
}

#[debug_handler(state = AppState)]
async fn room_create(
    State(db_pool): State<SqlitePool>,
    AuthUser(user): AuthUser,
    Json(req): Json<RoomCreateRequest>,
) -> AppResult<Json<RoomCreateResponse>> {
    let room_id =
        engine::create_room(&db_pool, user.id, req.live_id, req.select_difficulty).await?;
    Ok(Json(RoomCreateResponse { room_id }))
}

#[derive(Deserialize)]
pub(crate) struct RoomListRequest {
    live_id: i64,
}

#[derive(Serialize)]
pub(crate) struct RoomListResponse {
    room_info_list: Vec<RoomInfo>,
}

#[debug_handler(state = AppState)]
async fn room_list(
    State(db_pool): State<SqlitePool>,
    Json(req): Json<RoomListRequest>,
) -> AppResult<Json<RoomListResponse>> {
    let room_info_list = engine::list_rooms(&db_pool, req.live_id).await?;
    Ok(Json(RoomListResponse { room_info_list }))
}

#[derive(Deserialize)]
pub(crate) struct RoomJoinRequest {
    room_id: i64,
    select_difficulty: LiveDifficulty,
}

#[derive(Serialize)]
pub(crate) struct RoomJoinResponse {
    join_room_result: JoinRoomResult,
}

#[debug_handler(state = AppState)]
async fn room_join(
    State(db_pool): State<SqlitePool>,
    AuthUser(user): AuthUser,
    Json(req): Json<RoomJoinRequest>,
) -> Json<RoomJoinResponse> {
    // storage faults surface as OtherError, per the join result contract
    let join_room_result =
        match engine::join_room(&db_pool, req.room_id, user.id, req.select_difficulty).await {
            Ok(result) => result,
            Err(err) => {
                tracing::error!(room_id = req.room_id, "join failed: {err}");
                JoinRoomResult::OtherError
            }
        };
    Json(RoomJoinResponse { join_room_result })
}

#[derive(Deserialize)]
pub(crate) struct RoomWaitRequest {
    room_id: i64,
}

#[derive(Serialize)]
pub(crate) struct RoomWaitResponse {
    status: RoomStatus,
    room_member_list: Vec<RoomUser>,
}

#[debug_handler(state = AppState)]
async fn room_wait(
    State(db_pool): State<SqlitePool>,
    AuthUser(user): AuthUser,
    Json(req): Json<RoomWaitRequest>,
) -> AppResult<Json<RoomWaitResponse>> {
    let (status, room_member_list) = engine::wait_status(&db_pool, req.room_id, user.id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(RoomWaitResponse {
        status,
        room_member_list,
    }))
}

#[derive(Deserialize)]
pub(crate) struct RoomLeaveRequest {
    room_id: i64,
}

#[debug_handler(state = AppState)]
async fn room_leave(
    State(db_pool): State<SqlitePool>,
    AuthUser(user): AuthUser,
    Json(req): Json<RoomLeaveRequest>,
) -> AppResult<Json<serde_json::Value>> {
    engine::leave_room(&db_pool, req.room_id, user.id).await?;
    Ok(empty())
}

#[derive(Deserialize)]
pub(crate) struct RoomStartRequest {
    room_id: i64,
}

#[debug_handler(state = AppState)]
async fn room_start(
    State(db_pool): State<SqlitePool>,
    AuthUser(user): AuthUser,
    Json(req): Json<RoomStartRequest>,
) -> AppResult<Json<serde_json::Value>> {
    engine::start_room(&db_pool, req.room_id, user.id).await?;
    Ok(empty())
}

#[derive(Deserialize)]
pub(crate) struct RoomEndRequest {
    room_id: i64,
    judge_count_list: Vec<i64>,
    score: i64,
}

#[debug_handler(state = AppState)]
async fn room_end(
    State(db_pool): State<SqlitePool>,
    AuthUser(user): AuthUser,
    Json(req): Json<RoomEndRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let judges: [i64; 5] = req
        .judge_count_list
        .try_into()
        .map_err(|_| AppError::BadRequest("judge_count_list must have exactly 5 entries"))?;
    engine::submit_result(&db_pool, req.room_id, user.id, judges.into(), req.score).await?;
    Ok(empty())
}

#[derive(Deserialize)]
pub(crate) struct RoomResultRequest {
    room_id: i64,
}

#[derive(Serialize)]
pub(crate) struct RoomResultResponse {
    result_user_list: Vec<ResultUser>,
}

#[debug_handler(state = AppState)]
async fn room_result(
    State(db_pool): State<SqlitePool>,
    Json(req): Json<RoomResultRequest>,
) -> AppResult<Json<RoomResultResponse>> {
    let result_user_list = engine::get_results(&db_pool, req.room_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(RoomResultResponse { result_user_list }))
}
