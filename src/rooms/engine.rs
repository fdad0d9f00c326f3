//! The lobby coordination engine. Each operation is one atomic unit of work
//! against the store; the mutating ones take the room row's exclusive lock
//! (see `store::lock_room`) before reading anything, so concurrent joins,
//! leaves, starts and result reads on one room serialize cleanly.

use sqlx::SqlitePool;

use super::model::{
    JoinRoomResult, JudgeCounts, LiveDifficulty, MAX_USER_COUNT, ResultUser, RoomInfo, RoomStatus,
    RoomUser,
};
use super::store;

/// What happens to a still-waiting room when its host walks out. Product
/// intent is ambiguous here; `Migrate` is the shipped behavior, and the
/// alternative stays behind this one switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostLeavePolicy {
    /// Hand the host role to the remaining member with the lowest user id.
    Migrate,
    /// Migrate the role, but mark the room dissolved if it had not started.
    Disband,
}

pub const HOST_LEAVE_POLICY: HostLeavePolicy = HostLeavePolicy::Migrate;

/// Creates a room with the creator as host and sole member.
pub async fn create_room(
    db_pool: &SqlitePool,
    host_user_id: i64,
    live_id: i64,
    difficulty: LiveDifficulty,
) -> sqlx::Result<i64> {
    let mut tx = db_pool.begin().await?;
    let room_id = store::insert_room(&mut tx, live_id, host_user_id).await?;
    store::insert_member(&mut tx, room_id, host_user_id, difficulty, true).await?;
    tx.commit().await?;
    tracing::info!(room_id, live_id, host_user_id, "room created");
    Ok(room_id)
}

/// Lists joinable rooms for a live (0 = any live).
pub async fn list_rooms(db_pool: &SqlitePool, live_id: i64) -> sqlx::Result<Vec<RoomInfo>> {
    store::waiting_rooms(db_pool, live_id).await
}

/// Adds `user_id` to the room. The capacity check and the count increment
/// happen under one lock hold, so two racing joiners can never both slip
/// past a `count == MAX - 1` read.
pub async fn join_room(
    db_pool: &SqlitePool,
    room_id: i64,
    user_id: i64,
    difficulty: LiveDifficulty,
) -> sqlx::Result<JoinRoomResult> {
    let mut tx = db_pool.begin().await?;
    let Some(room) = store::lock_room(&mut tx, room_id).await? else {
        return Ok(JoinRoomResult::Disbanded);
    };
    if room.status != RoomStatus::Waiting {
        return Ok(JoinRoomResult::Disbanded);
    }
    if room.joined_user_count >= MAX_USER_COUNT {
        return Ok(JoinRoomResult::RoomFull);
    }

    match store::insert_member(&mut tx, room_id, user_id, difficulty, false).await {
        Ok(()) => {}
        // already a member; nothing sane to apply twice
        Err(err) if is_unique_violation(&err) => return Ok(JoinRoomResult::OtherError),
        Err(err) => return Err(err),
    }
    store::set_user_count(&mut tx, room_id, room.joined_user_count + 1).await?;
    tx.commit().await?;
    Ok(JoinRoomResult::Ok)
}

/// Point-in-time snapshot of a room's status and membership for the wait
/// screen's short-poll loop. `None` when the room no longer exists.
pub async fn wait_status(
    db_pool: &SqlitePool,
    room_id: i64,
    caller_user_id: i64,
) -> sqlx::Result<Option<(RoomStatus, Vec<RoomUser>)>> {
    let mut tx = db_pool.begin().await?;
    let Some((host_user_id, status)) = store::room_status_and_host(&mut tx, room_id).await? else {
        return Ok(None);
    };
    let rows = store::members_with_users(&mut tx, room_id).await?;
    tx.commit().await?;

    let members = rows
        .into_iter()
        .map(|(user_id, name, leader_card_id, select_difficulty)| RoomUser {
            user_id,
            name,
            leader_card_id,
            select_difficulty,
            is_me: user_id == caller_user_id,
            is_host: user_id == host_user_id,
        })
        .collect();
    Ok(Some((status, members)))
}

/// Removes `user_id` from the room. The last member out deletes the room;
/// a departing host hands the role to a successor under the same lock, so
/// no interleaved call ever sees a hostless room or a stale count.
pub async fn leave_room(db_pool: &SqlitePool, room_id: i64, user_id: i64) -> sqlx::Result<()> {
    let mut tx = db_pool.begin().await?;
    let Some(room) = store::lock_room(&mut tx, room_id).await? else {
        return Ok(());
    };
    if !store::delete_member(&mut tx, room_id, user_id).await? {
        return Ok(());
    }

    let remaining = store::count_members(&mut tx, room_id).await?;
    if remaining == 0 {
        store::delete_room(&mut tx, room_id).await?;
        tx.commit().await?;
        tracing::info!(room_id, "last member left, room deleted");
        return Ok(());
    }

    store::set_user_count(&mut tx, room_id, remaining).await?;
    if room.host_user_id == user_id {
        if let Some(next_host) = store::min_member_id(&mut tx, room_id).await? {
            store::set_host(&mut tx, room_id, next_host).await?;
            tracing::info!(room_id, next_host, "host left, role migrated");
        }
        if HOST_LEAVE_POLICY == HostLeavePolicy::Disband && room.status == RoomStatus::Waiting {
            store::set_status(&mut tx, room_id, RoomStatus::Dissolved).await?;
        }
    }
    tx.commit().await?;
    Ok(())
}

/// Starts the live. Only the host can start, and only from `Waiting`;
/// every other caller simply has no effect.
pub async fn start_room(
    db_pool: &SqlitePool,
    room_id: i64,
    caller_user_id: i64,
) -> sqlx::Result<()> {
    let mut tx = db_pool.begin().await?;
    let Some(room) = store::lock_room(&mut tx, room_id).await? else {
        return Ok(());
    };
    if room.host_user_id != caller_user_id || room.status != RoomStatus::Waiting {
        return Ok(());
    }
    store::set_status(&mut tx, room_id, RoomStatus::InProgress).await?;
    tx.commit().await?;
    tracing::info!(room_id, "live started");
    Ok(())
}

/// Records one member's judge counts and score. Accepted only while the
/// live is in progress; otherwise the call has no effect.
pub async fn submit_result(
    db_pool: &SqlitePool,
    room_id: i64,
    user_id: i64,
    judges: JudgeCounts,
    score: i64,
) -> sqlx::Result<()> {
    let mut tx = db_pool.begin().await?;
    let Some(room) = store::lock_room(&mut tx, room_id).await? else {
        return Ok(());
    };
    if room.status != RoomStatus::InProgress {
        return Ok(());
    }
    store::set_member_result(&mut tx, room_id, user_id, judges, score).await?;
    tx.commit().await?;
    Ok(())
}

/// Returns every member's result once all of them have submitted, and
/// dissolves the room in the same transaction that reads the complete
/// list. Until then the list is empty: "not yet", not an error. `None`
/// when the room does not exist.
pub async fn get_results(
    db_pool: &SqlitePool,
    room_id: i64,
) -> sqlx::Result<Option<Vec<ResultUser>>> {
    let mut tx = db_pool.begin().await?;
    let Some(room) = store::lock_room(&mut tx, room_id).await? else {
        return Ok(None);
    };

    let rows = store::member_results(&mut tx, room_id).await?;
    let mut results = Vec::with_capacity(rows.len());
    for (user_id, perfect, great, good, bad, miss, score) in rows {
        let (Some(perfect), Some(great), Some(good), Some(bad), Some(miss), Some(score)) =
            (perfect, great, good, bad, miss, score)
        else {
            return Ok(Some(Vec::new()));
        };
        results.push(ResultUser {
            user_id,
            judge_count_list: [perfect, great, good, bad, miss],
            score,
        });
    }

    if room.status != RoomStatus::Dissolved {
        store::set_status(&mut tx, room_id, RoomStatus::Dissolved).await?;
        tracing::info!(room_id, "all results in, room dissolved");
    }
    tx.commit().await?;
    Ok(Some(results))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}
