// Likes, comments and reposts
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::Router;
use serde::Deserialize;

use crate::db::models::{Comment, Repost};
use crate::error::AppResult;
use crate::extractors::{Caller, Json, Path};
use crate::social::likes::{self, LikeToggle};
use crate::social::{comments, reposts};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CommentBody {
    pub content: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts/{id}/like", post(toggle_like))
        .route(
            "/posts/{id}/comments",
            get(list_comments).post(add_comment),
        )
        .route("/comments/{id}", put(update_comment))
        .route(
            "/posts/{id}/comments/{comment_id}",
            delete(delete_comment),
        )
        .route("/posts/{id}/reposts", post(create_repost))
        .route("/reposts/{id}", delete(delete_repost))
}

async fn toggle_like(
    State(state): State<AppState>,
    caller: Caller,
    Path(post_id): Path<i64>,
) -> AppResult<Json<LikeToggle>> {
    let mut conn = state.db.get()?;
    Ok(Json(likes::toggle_like(&mut conn, post_id, caller.id)?))
}

async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> AppResult<Json<Vec<Comment>>> {
    let conn = state.db.get()?;
    Ok(Json(comments::list_comments(&conn, post_id)?))
}

async fn add_comment(
    State(state): State<AppState>,
    caller: Caller,
    Path(post_id): Path<i64>,
    Json(body): Json<CommentBody>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    let mut conn = state.db.get()?;
    let comment = comments::add_comment(&mut conn, post_id, caller.id, &body.content)?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn update_comment(
    State(state): State<AppState>,
    caller: Caller,
    Path(comment_id): Path<i64>,
    Json(body): Json<CommentBody>,
) -> AppResult<Json<Comment>> {
    let mut conn = state.db.get()?;
    Ok(Json(comments::update_comment(
        &mut conn,
        comment_id,
        caller.id,
        &body.content,
    )?))
}

async fn delete_comment(
    State(state): State<AppState>,
    caller: Caller,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> AppResult<StatusCode> {
    let mut conn = state.db.get()?;
    comments::delete_comment(&mut conn, post_id, comment_id, caller.id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_repost(
    State(state): State<AppState>,
    caller: Caller,
    Path(post_id): Path<i64>,
) -> AppResult<(StatusCode, Json<Repost>)> {
    let mut conn = state.db.get()?;
    let repost = reposts::create_repost(&mut conn, post_id, caller.id)?;
    Ok((StatusCode::CREATED, Json(repost)))
}

async fn delete_repost(
    State(state): State<AppState>,
    caller: Caller,
    Path(repost_id): Path<i64>,
) -> AppResult<StatusCode> {
    let mut conn = state.db.get()?;
    reposts::delete_repost(&mut conn, repost_id, caller.id)?;
    Ok(StatusCode::NO_CONTENT)
}
