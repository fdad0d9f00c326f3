//! All SQL for the `rooms` / `room_members` tables, plus the locking helper
//! the engine's mutating operations are built on.

use sqlx::{Sqlite, SqlitePool, Transaction};

use super::model::{InvalidEnumValue, JudgeCounts, LiveDifficulty, MAX_USER_COUNT, RoomInfo, RoomStatus};

pub(crate) struct RoomRow {
    pub host_user_id: i64,
    pub joined_user_count: i64,
    pub status: RoomStatus,
}

/// user_id, judge counts in judge order, score. The result columns stay NULL
/// until the member submits.
pub(crate) type MemberResultRow = (
    i64,
    Option<i64>,
    Option<i64>,
    Option<i64>,
    Option<i64>,
    Option<i64>,
    Option<i64>,
);

fn decode_err(err: InvalidEnumValue) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(err))
}

/// Locks the room row and reads it. SQLite has no `SELECT ... FOR UPDATE`;
/// a self-assignment update takes the database write lock before the count
/// is read, so the caller's whole read-modify-write runs under it. Returns
/// `None` when the room does not exist.
pub(crate) async fn lock_room(
    tx: &mut Transaction<'_, Sqlite>,
    room_id: i64,
) -> sqlx::Result<Option<RoomRow>> {
    let touched =
        sqlx::query("UPDATE rooms SET joined_user_count = joined_user_count WHERE room_id = ?")
            .bind(room_id)
            .execute(&mut **tx)
            .await?;
    if touched.rows_affected() == 0 {
        return Ok(None);
    }

    let (host_user_id, joined_user_count, status): (i64, i64, i64) =
        sqlx::query_as("SELECT host_user_id, joined_user_count, status FROM rooms WHERE room_id = ?")
            .bind(room_id)
            .fetch_one(&mut **tx)
            .await?;
    Ok(Some(RoomRow {
        host_user_id,
        joined_user_count,
        status: RoomStatus::try_from(status).map_err(decode_err)?,
    }))
}

pub(crate) async fn insert_room(
    tx: &mut Transaction<'_, Sqlite>,
    live_id: i64,
    host_user_id: i64,
) -> sqlx::Result<i64> {
    let result = sqlx::query(
        "INSERT INTO rooms (live_id, host_user_id, joined_user_count, status) VALUES (?, ?, 1, ?)",
    )
    .bind(live_id)
    .bind(host_user_id)
    .bind(i64::from(RoomStatus::Waiting))
    .execute(&mut **tx)
    .await?;
    Ok(result.last_insert_rowid())
}

pub(crate) async fn delete_room(
    tx: &mut Transaction<'_, Sqlite>,
    room_id: i64,
) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM room_members WHERE room_id = ?")
        .bind(room_id)
        .execute(&mut **tx)
        .await?;
    sqlx::query("DELETE FROM rooms WHERE room_id = ?")
        .bind(room_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub(crate) async fn set_user_count(
    tx: &mut Transaction<'_, Sqlite>,
    room_id: i64,
    count: i64,
) -> sqlx::Result<()> {
    sqlx::query("UPDATE rooms SET joined_user_count = ? WHERE room_id = ?")
        .bind(count)
        .bind(room_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub(crate) async fn set_status(
    tx: &mut Transaction<'_, Sqlite>,
    room_id: i64,
    status: RoomStatus,
) -> sqlx::Result<()> {
    sqlx::query("UPDATE rooms SET status = ? WHERE room_id = ?")
        .bind(i64::from(status))
        .bind(room_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Points the room at a new host and moves the `is_host` flag with it.
pub(crate) async fn set_host(
    tx: &mut Transaction<'_, Sqlite>,
    room_id: i64,
    user_id: i64,
) -> sqlx::Result<()> {
    sqlx::query("UPDATE rooms SET host_user_id = ? WHERE room_id = ?")
        .bind(user_id)
        .bind(room_id)
        .execute(&mut **tx)
        .await?;
    sqlx::query("UPDATE room_members SET is_host = 0 WHERE room_id = ?")
        .bind(room_id)
        .execute(&mut **tx)
        .await?;
    sqlx::query("UPDATE room_members SET is_host = 1 WHERE room_id = ? AND user_id = ?")
        .bind(room_id)
        .bind(user_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub(crate) async fn insert_member(
    tx: &mut Transaction<'_, Sqlite>,
    room_id: i64,
    user_id: i64,
    difficulty: LiveDifficulty,
    is_host: bool,
) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO room_members (room_id, user_id, select_difficulty, is_host) VALUES (?, ?, ?, ?)",
    )
    .bind(room_id)
    .bind(user_id)
    .bind(i64::from(difficulty))
    .bind(is_host)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Returns whether a membership row was actually deleted.
pub(crate) async fn delete_member(
    tx: &mut Transaction<'_, Sqlite>,
    room_id: i64,
    user_id: i64,
) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM room_members WHERE room_id = ? AND user_id = ?")
        .bind(room_id)
        .bind(user_id)
        .execute(&mut **tx)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn count_members(
    tx: &mut Transaction<'_, Sqlite>,
    room_id: i64,
) -> sqlx::Result<i64> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(user_id) FROM room_members WHERE room_id = ?")
            .bind(room_id)
            .fetch_one(&mut **tx)
            .await?;
    Ok(count)
}

/// The deterministic host-successor choice: lowest remaining user id.
pub(crate) async fn min_member_id(
    tx: &mut Transaction<'_, Sqlite>,
    room_id: i64,
) -> sqlx::Result<Option<i64>> {
    let (min,): (Option<i64>,) =
        sqlx::query_as("SELECT MIN(user_id) FROM room_members WHERE room_id = ?")
            .bind(room_id)
            .fetch_one(&mut **tx)
            .await?;
    Ok(min)
}

pub(crate) async fn set_member_result(
    tx: &mut Transaction<'_, Sqlite>,
    room_id: i64,
    user_id: i64,
    judges: JudgeCounts,
    score: i64,
) -> sqlx::Result<()> {
    sqlx::query(
        "UPDATE room_members \
         SET judge_perfect = ?, judge_great = ?, judge_good = ?, judge_bad = ?, judge_miss = ?, score = ? \
         WHERE room_id = ? AND user_id = ?",
    )
    .bind(judges.perfect)
    .bind(judges.great)
    .bind(judges.good)
    .bind(judges.bad)
    .bind(judges.miss)
    .bind(score)
    .bind(room_id)
    .bind(user_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub(crate) async fn member_results(
    tx: &mut Transaction<'_, Sqlite>,
    room_id: i64,
) -> sqlx::Result<Vec<MemberResultRow>> {
    sqlx::query_as(
        "SELECT user_id, judge_perfect, judge_great, judge_good, judge_bad, judge_miss, score \
         FROM room_members WHERE room_id = ? ORDER BY user_id",
    )
    .bind(room_id)
    .fetch_all(&mut **tx)
    .await
}

pub(crate) async fn room_status_and_host(
    tx: &mut Transaction<'_, Sqlite>,
    room_id: i64,
) -> sqlx::Result<Option<(i64, RoomStatus)>> {
    let row: Option<(i64, i64)> =
        sqlx::query_as("SELECT host_user_id, status FROM rooms WHERE room_id = ?")
            .bind(room_id)
            .fetch_optional(&mut **tx)
            .await?;
    match row {
        Some((host_user_id, status)) => Ok(Some((
            host_user_id,
            RoomStatus::try_from(status).map_err(decode_err)?,
        ))),
        None => Ok(None),
    }
}

/// Members joined with their directory profile, in join-id order.
pub(crate) async fn members_with_users(
    tx: &mut Transaction<'_, Sqlite>,
    room_id: i64,
) -> sqlx::Result<Vec<(i64, String, i64, LiveDifficulty)>> {
    let rows: Vec<(i64, String, i64, i64)> = sqlx::query_as(
        "SELECT m.user_id, u.name, u.leader_card_id, m.select_difficulty \
         FROM room_members m JOIN users u ON u.id = m.user_id \
         WHERE m.room_id = ? ORDER BY m.user_id",
    )
    .bind(room_id)
    .fetch_all(&mut **tx)
    .await?;

    rows.into_iter()
        .map(|(user_id, name, leader_card_id, difficulty)| {
            Ok((
                user_id,
                name,
                leader_card_id,
                LiveDifficulty::try_from(difficulty).map_err(decode_err)?,
            ))
        })
        .collect()
}

/// Joinable rooms only: a room that has started or dissolved never shows up
/// in discovery. `live_id == 0` matches every live.
pub(crate) async fn waiting_rooms(
    db_pool: &SqlitePool,
    live_id: i64,
) -> sqlx::Result<Vec<RoomInfo>> {
    let rows: Vec<(i64, i64, i64)> = sqlx::query_as(
        "SELECT room_id, live_id, joined_user_count FROM rooms \
         WHERE status = ? AND (? = 0 OR live_id = ?)",
    )
    .bind(i64::from(RoomStatus::Waiting))
    .bind(live_id)
    .bind(live_id)
    .fetch_all(db_pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(room_id, live_id, joined_user_count)| RoomInfo {
            room_id,
            live_id,
            joined_user_count,
            max_user_count: MAX_USER_COUNT,
        })
        .collect())
}
