use axum::extract::State;
use axum::routing::get;
use axum::Router;

use crate::db::models::Tag;
use crate::error::AppResult;
use crate::extractors::Json;
use crate::social::tags;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/tags", get(list_tags))
}

async fn list_tags(State(state): State<AppState>) -> AppResult<Json<Vec<Tag>>> {
    let conn = state.db.get()?;
    Ok(Json(tags::list_tags(&conn)?))
}
