use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use crate::db::models::{Post, PostDetail};
use crate::error::AppResult;
use crate::extractors::{Caller, Json, Path, Query};
use crate::social::posts::{self, NewPost, PostChanges, PostDeletion, DEFAULT_PAGE};
use crate::state::AppState;

const MAX_PAGE: u32 = 200;

#[derive(Deserialize, Default)]
pub struct ListParams {
    pub limit: Option<u32>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route(
            "/posts/{id}",
            get(get_post).put(update_post).delete(delete_post),
        )
}

async fn list_posts(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<Vec<Post>>> {
    let limit = params.limit.unwrap_or(DEFAULT_PAGE).clamp(1, MAX_PAGE);
    let conn = state.db.get()?;
    Ok(Json(posts::list_posts(&conn, limit)?))
}

async fn create_post(
    State(state): State<AppState>,
    caller: Caller,
    Json(new): Json<NewPost>,
) -> AppResult<(StatusCode, Json<PostDetail>)> {
    let mut conn = state.db.get()?;
    let detail = posts::create_post(&mut conn, caller.id, &new)?;
    Ok((StatusCode::CREATED, Json(detail)))
}

async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<PostDetail>> {
    let conn = state.db.get()?;
    Ok(Json(posts::get_post(&conn, id)?))
}

async fn update_post(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
    Json(changes): Json<PostChanges>,
) -> AppResult<Json<PostDetail>> {
    let mut conn = state.db.get()?;
    Ok(Json(posts::update_post(&mut conn, id, caller.id, &changes)?))
}

async fn delete_post(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
) -> AppResult<Json<PostDeletion>> {
    let mut conn = state.db.get()?;
    Ok(Json(posts::delete_post(&mut conn, id, caller.id)?))
}
