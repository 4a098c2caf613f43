use rusqlite::{params, Connection, OptionalExtension};

use super::access;
use super::counters::{self, Counter};
use super::error::{require_id, SocialError, SocialResult};
use super::{posts, users};
use crate::db::models::Comment;
use crate::db::unit_of_work;

pub const MAX_COMMENT_LEN: usize = 2000;

fn validate_content(content: &str) -> SocialResult<String> {
    let content = content.trim();
    if content.is_empty() {
        return Err(SocialError::validation("Comment cannot be empty"));
    }
    if content.chars().count() > MAX_COMMENT_LEN {
        return Err(SocialError::validation(format!(
            "Comment must be {MAX_COMMENT_LEN} characters or less"
        )));
    }
    Ok(content.to_string())
}

fn load(conn: &Connection, comment_id: i64) -> SocialResult<Comment> {
    conn.query_row(
        &format!("SELECT {} FROM comments WHERE id = ?1", Comment::COLUMNS),
        params![comment_id],
        Comment::from_row,
    )
    .optional()?
    .ok_or(SocialError::NotFound("comment"))
}

pub fn add_comment(
    conn: &mut Connection,
    post_id: i64,
    user_id: i64,
    content: &str,
) -> SocialResult<Comment> {
    require_id(post_id, "post")?;
    require_id(user_id, "user")?;
    let content = validate_content(content)?;

    unit_of_work(conn, |tx| {
        posts::load(tx, post_id)?;
        users::ensure_exists(tx, user_id)?;

        tx.execute(
            "INSERT INTO comments (post_id, user_id, content) VALUES (?1, ?2, ?3)",
            params![post_id, user_id, content],
        )?;
        let id = tx.last_insert_rowid();
        counters::increment(tx, post_id, Counter::Comments)?;

        tracing::debug!(comment_id = id, post_id, user_id, "added comment");
        load(tx, id)
    })
}

/// Only the author may edit. Ownership is checked before the update runs.
pub fn update_comment(
    conn: &mut Connection,
    comment_id: i64,
    user_id: i64,
    content: &str,
) -> SocialResult<Comment> {
    require_id(comment_id, "comment")?;
    require_id(user_id, "user")?;
    let content = validate_content(content)?;

    unit_of_work(conn, |tx| {
        let comment = load(tx, comment_id)?;
        if !access::can_modify(&comment, user_id) {
            return Err(SocialError::Forbidden("comment"));
        }

        tx.execute(
            "UPDATE comments SET content = ?2 WHERE id = ?1",
            params![comment_id, content],
        )?;
        load(tx, comment_id)
    })
}

/// The comment must sit on `post_id` (else NotFound) and belong to the
/// caller (else Forbidden).
pub fn delete_comment(
    conn: &mut Connection,
    post_id: i64,
    comment_id: i64,
    user_id: i64,
) -> SocialResult<()> {
    require_id(post_id, "post")?;
    require_id(comment_id, "comment")?;
    require_id(user_id, "user")?;

    unit_of_work(conn, |tx| {
        let comment = load(tx, comment_id)?;
        if !access::comment_belongs_to(&comment, post_id) {
            return Err(SocialError::NotFound("comment"));
        }
        if !access::can_modify(&comment, user_id) {
            return Err(SocialError::Forbidden("comment"));
        }

        tx.execute("DELETE FROM comments WHERE id = ?1", params![comment_id])?;
        counters::decrement(tx, post_id, Counter::Comments, 1)?;

        tracing::debug!(comment_id, post_id, user_id, "deleted comment");
        Ok(())
    })
}

/// Oldest first.
pub fn list_comments(conn: &Connection, post_id: i64) -> SocialResult<Vec<Comment>> {
    require_id(post_id, "post")?;
    posts::load(conn, post_id)?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM comments WHERE post_id = ?1 ORDER BY created_at ASC, id ASC",
        Comment::COLUMNS
    ))?;
    let comments = stmt
        .query_map(params![post_id], Comment::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(comments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::social::testing;

    fn comments_count(conn: &Connection, post_id: i64) -> i64 {
        conn.query_row(
            "SELECT comments_count FROM posts WHERE id = ?1",
            params![post_id],
            |r| r.get(0),
        )
        .unwrap()
    }

    #[test]
    fn add_comment_bumps_counter() {
        let mut conn = testing::conn();
        let author = testing::user(&conn, "a");
        let post = testing::post(&conn, author);

        let c = add_comment(&mut conn, post, author, "  first  ").unwrap();
        assert_eq!(c.content, "first");
        add_comment(&mut conn, post, author, "second").unwrap();

        assert_eq!(comments_count(&conn, post), 2);
        let listed = list_comments(&conn, post).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].content, "first");
    }

    #[test]
    fn add_comment_on_missing_post_leaves_nothing() {
        let mut conn = testing::conn();
        let author = testing::user(&conn, "a");

        assert!(matches!(
            add_comment(&mut conn, 3, author, "hi"),
            Err(SocialError::NotFound("post"))
        ));
        assert_eq!(testing::count(&conn, "SELECT COUNT(*) FROM comments"), 0);
    }

    #[test]
    fn add_comment_rejects_blank_and_long() {
        let mut conn = testing::conn();
        let author = testing::user(&conn, "a");
        let post = testing::post(&conn, author);

        assert!(matches!(
            add_comment(&mut conn, post, author, "   "),
            Err(SocialError::Validation(_))
        ));
        let long = "x".repeat(MAX_COMMENT_LEN + 1);
        assert!(matches!(
            add_comment(&mut conn, post, author, &long),
            Err(SocialError::Validation(_))
        ));
        assert_eq!(comments_count(&conn, post), 0);
    }

    #[test]
    fn only_author_updates() {
        let mut conn = testing::conn();
        let author = testing::user(&conn, "a");
        let other = testing::user(&conn, "b");
        let post = testing::post(&conn, author);
        let c = add_comment(&mut conn, post, author, "orig").unwrap();

        assert!(matches!(
            update_comment(&mut conn, c.id, other, "hacked"),
            Err(SocialError::Forbidden("comment"))
        ));
        let edited = update_comment(&mut conn, c.id, author, "edited").unwrap();
        assert_eq!(edited.content, "edited");
        assert!(matches!(
            update_comment(&mut conn, c.id + 1, author, "x"),
            Err(SocialError::NotFound("comment"))
        ));
    }

    #[test]
    fn delete_checks_post_then_owner() {
        let mut conn = testing::conn();
        let author = testing::user(&conn, "a");
        let other = testing::user(&conn, "b");
        let post = testing::post(&conn, author);
        let elsewhere = testing::post(&conn, author);
        let c = add_comment(&mut conn, post, author, "hi").unwrap();

        assert!(matches!(
            delete_comment(&mut conn, elsewhere, c.id, author),
            Err(SocialError::NotFound("comment"))
        ));
        assert!(matches!(
            delete_comment(&mut conn, post, c.id, other),
            Err(SocialError::Forbidden("comment"))
        ));
        assert_eq!(comments_count(&conn, post), 1);

        delete_comment(&mut conn, post, c.id, author).unwrap();
        assert_eq!(comments_count(&conn, post), 0);
        assert!(list_comments(&conn, post).unwrap().is_empty());
    }

    #[test]
    fn delete_with_drifted_counter_clamps() {
        let mut conn = testing::conn();
        let author = testing::user(&conn, "a");
        let post = testing::post(&conn, author);
        let c = add_comment(&mut conn, post, author, "hi").unwrap();
        conn.execute("UPDATE posts SET comments_count = 0", []).unwrap();

        delete_comment(&mut conn, post, c.id, author).unwrap();
        assert_eq!(comments_count(&conn, post), 0);
    }
}
