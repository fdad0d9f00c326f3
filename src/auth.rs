use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use sqlx::SqlitePool;

use crate::{
    appresult::AppError,
    users::{self, SafeUser},
};

/// Resolves the caller through the user directory before the handler runs.
/// Missing or malformed credentials reject with 401, an unknown token with 404.
pub struct AuthUser(pub SafeUser);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    SqlitePool: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AppError::Unauthorized)?;
        let db_pool = SqlitePool::from_ref(state);
        let user = users::get_user_by_token(&db_pool, &token)
            .await?
            .ok_or(AppError::NotFound)?;
        Ok(AuthUser(user))
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?;
    if token.is_empty() {
        return None;
    }
    Some(token.to_owned())
}
