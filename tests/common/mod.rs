use std::time::Duration;

use livelobby::users::{self, SafeUser};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use tempfile::TempDir;

pub struct TestDb {
    pub pool: SqlitePool,
    _dir: TempDir,
}

pub async fn setup() -> TestDb {
    let dir = tempfile::tempdir().unwrap();
    let options = SqliteConnectOptions::new()
        .filename(dir.path().join("lobby.db"))
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));
    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await
        .unwrap();
    sqlx::migrate!().run(&pool).await.unwrap();
    TestDb { pool, _dir: dir }
}

#[allow(dead_code)]
pub async fn new_user(pool: &SqlitePool, name: &str) -> SafeUser {
    let token = users::create_user(pool, name, 1000).await.unwrap();
    users::get_user_by_token(pool, &token).await.unwrap().unwrap()
}
