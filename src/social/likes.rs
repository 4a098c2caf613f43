use rusqlite::{params, Connection};
use serde::Serialize;

use super::counters::{self, Counter};
use super::error::{require_id, SocialResult};
use super::{posts, users};
use crate::db::unit_of_work;

/// Like state of a (post, user) pair after a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LikeToggle {
    pub liked: bool,
    pub likes_count: i64,
}

/// Flip the caller's like on a post and move `likes_count` with it.
///
/// The existence check, insert-or-delete and counter update share one immediate
/// transaction, so two toggles on the same post serialize on SQLite's write
/// lock and neither loses the other's increment.
pub fn toggle_like(conn: &mut Connection, post_id: i64, user_id: i64) -> SocialResult<LikeToggle> {
    require_id(post_id, "post")?;
    require_id(user_id, "user")?;

    unit_of_work(conn, |tx| {
        posts::load(tx, post_id)?;
        users::ensure_exists(tx, user_id)?;

        let removed = tx.execute(
            "DELETE FROM post_likes WHERE post_id = ?1 AND user_id = ?2",
            params![post_id, user_id],
        )?;

        let liked = if removed > 0 {
            counters::decrement(tx, post_id, Counter::Likes, 1)?;
            false
        } else {
            tx.execute(
                "INSERT INTO post_likes (post_id, user_id) VALUES (?1, ?2)",
                params![post_id, user_id],
            )?;
            counters::increment(tx, post_id, Counter::Likes)?;
            true
        };

        let likes_count = tx.query_row(
            "SELECT likes_count FROM posts WHERE id = ?1",
            params![post_id],
            |r| r.get(0),
        )?;

        tracing::debug!(post_id, user_id, liked, likes_count, "toggled like");
        Ok(LikeToggle { liked, likes_count })
    })
}
