use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use crate::db::models::{Post, User};
use crate::error::{AppError, AppResult};
use crate::extractors::{Caller, Json, Path};
use crate::social::users::{self, NewUser, UserChanges, UserDeletion};
use crate::social::posts;
use crate::state::AppState;

pub const MIN_PASSWORD_LEN: usize = 10;

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Default)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub bio: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/users",
            get(list_users)
                .post(create_user)
                .put(update_me)
                .delete(delete_me),
        )
        .route("/users/{id}", get(get_user))
        .route("/users/{id}/posts", get(user_posts))
}

fn hash_password(password: &str, cost: u32) -> AppResult<String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    bcrypt::hash(password, cost).map_err(|e| AppError::Internal(e.to_string()))
}

/// Run `hash_password` on the blocking pool; bcrypt is CPU-bound.
async fn hash_password_off_thread(password: String, cost: u32) -> AppResult<String> {
    tokio::task::spawn_blocking(move || hash_password(&password, cost))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
}

async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    let password_hash =
        hash_password_off_thread(req.password, state.config.auth.bcrypt_cost).await?;
    let new = NewUser {
        name: req.name,
        email: req.email,
        password_hash,
    };

    let mut conn = state.db.get()?;
    let user = users::create_user(&mut conn, &new)?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn list_users(State(state): State<AppState>) -> AppResult<Json<Vec<User>>> {
    let conn = state.db.get()?;
    Ok(Json(users::list_users(&conn)?))
}

async fn get_user(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Json<User>> {
    let conn = state.db.get()?;
    Ok(Json(users::get_user(&conn, id)?))
}

async fn user_posts(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<Post>>> {
    let conn = state.db.get()?;
    Ok(Json(posts::list_user_posts(&conn, id)?))
}

async fn update_me(
    State(state): State<AppState>,
    caller: Caller,
    Json(req): Json<UpdateUserRequest>,
) -> AppResult<Json<User>> {
    let password_hash = match req.password {
        Some(password) => {
            Some(hash_password_off_thread(password, state.config.auth.bcrypt_cost).await?)
        }
        None => None,
    };
    let changes = UserChanges {
        name: req.name,
        email: req.email,
        password_hash,
        bio: req.bio,
    };

    let mut conn = state.db.get()?;
    Ok(Json(users::update_user(&mut conn, caller.id, &changes)?))
}

async fn delete_me(
    State(state): State<AppState>,
    caller: Caller,
) -> AppResult<Json<UserDeletion>> {
    let mut conn = state.db.get()?;
    Ok(Json(users::delete_user(&mut conn, caller.id)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_passwords_are_rejected() {
        assert!(matches!(
            hash_password("short", 4),
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn hashing_off_thread_verifies_and_validates() {
        let hash = hash_password_off_thread("correct horse battery".to_string(), 4)
            .await
            .unwrap();
        assert!(bcrypt::verify("correct horse battery", &hash).unwrap());
        assert!(matches!(
            hash_password_off_thread("short".to_string(), 4).await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn hashed_password_verifies() {
        let hash = hash_password("correct horse battery", 4).unwrap();
        assert!(bcrypt::verify("correct horse battery", &hash).unwrap());
    }
}
