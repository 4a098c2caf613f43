use rusqlite::{params, Connection, OptionalExtension};

use super::access;
use super::counters::{self, Counter};
use super::error::{is_unique_violation, require_id, SocialError, SocialResult};
use super::{posts, users};
use crate::db::models::Repost;
use crate::db::unit_of_work;

fn load(conn: &Connection, repost_id: i64) -> SocialResult<Repost> {
    conn.query_row(
        &format!("SELECT {} FROM reposts WHERE id = ?1", Repost::COLUMNS),
        params![repost_id],
        Repost::from_row,
    )
    .optional()?
    .ok_or(SocialError::NotFound("repost"))
}

pub fn create_repost(conn: &mut Connection, post_id: i64, user_id: i64) -> SocialResult<Repost> {
    require_id(post_id, "post")?;
    require_id(user_id, "user")?;

    unit_of_work(conn, |tx| {
        let post = posts::load(tx, post_id)?;
        users::ensure_exists(tx, user_id)?;
        if !access::can_repost(&post, user_id) {
            return Err(SocialError::conflict("You cannot repost your own post"));
        }

        let already: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM reposts WHERE original_post_id = ?1 AND user_id = ?2)",
            params![post_id, user_id],
            |r| r.get(0),
        )?;
        if already {
            return Err(SocialError::conflict("You have already reposted this post"));
        }

        tx.execute(
            "INSERT INTO reposts (original_post_id, user_id) VALUES (?1, ?2)",
            params![post_id, user_id],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                SocialError::conflict("You have already reposted this post")
            } else {
                SocialError::Store(e)
            }
        })?;
        let id = tx.last_insert_rowid();
        counters::increment(tx, post_id, Counter::Reposts)?;

        tracing::debug!(repost_id = id, post_id, user_id, "created repost");
        load(tx, id)
    })
}

pub fn delete_repost(conn: &mut Connection, repost_id: i64, user_id: i64) -> SocialResult<()> {
    require_id(repost_id, "repost")?;
    require_id(user_id, "user")?;

    unit_of_work(conn, |tx| {
        let repost = load(tx, repost_id)?;
        if !access::can_modify(&repost, user_id) {
            return Err(SocialError::Forbidden("repost"));
        }

        tx.execute("DELETE FROM reposts WHERE id = ?1", params![repost_id])?;
        counters::decrement(tx, repost.original_post_id, Counter::Reposts, 1)?;

        tracing::debug!(repost_id, user_id, "deleted repost");
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::social::testing;

    fn reposts_count(conn: &Connection, post_id: i64) -> i64 {
        conn.query_row(
            "SELECT reposts_count FROM posts WHERE id = ?1",
            params![post_id],
            |r| r.get(0),
        )
        .unwrap()
    }

    #[test]
    fn repost_and_undo() {
        let mut conn = testing::conn();
        let author = testing::user(&conn, "a");
        let fan = testing::user(&conn, "b");
        let post = testing::post(&conn, author);

        let r = create_repost(&mut conn, post, fan).unwrap();
        assert_eq!(r.original_post_id, post);
        assert_eq!(reposts_count(&conn, post), 1);

        delete_repost(&mut conn, r.id, fan).unwrap();
        assert_eq!(reposts_count(&conn, post), 0);
        assert_eq!(testing::count(&conn, "SELECT COUNT(*) FROM reposts"), 0);
    }

    #[test]
    fn self_repost_is_conflict() {
        let mut conn = testing::conn();
        let author = testing::user(&conn, "a");
        let post = testing::post(&conn, author);

        assert!(matches!(
            create_repost(&mut conn, post, author),
            Err(SocialError::Conflict(_))
        ));
        assert_eq!(testing::count(&conn, "SELECT COUNT(*) FROM reposts"), 0);
        assert_eq!(reposts_count(&conn, post), 0);
    }

    #[test]
    fn second_repost_is_conflict() {
        let mut conn = testing::conn();
        let author = testing::user(&conn, "a");
        let fan = testing::user(&conn, "b");
        let post = testing::post(&conn, author);

        create_repost(&mut conn, post, fan).unwrap();
        assert!(matches!(
            create_repost(&mut conn, post, fan),
            Err(SocialError::Conflict(_))
        ));
        assert_eq!(reposts_count(&conn, post), 1);
    }

    #[test]
    fn repost_missing_post_is_not_found() {
        let mut conn = testing::conn();
        let fan = testing::user(&conn, "b");
        assert!(matches!(
            create_repost(&mut conn, 12, fan),
            Err(SocialError::NotFound("post"))
        ));
    }

    #[test]
    fn only_owner_deletes_repost() {
        let mut conn = testing::conn();
        let author = testing::user(&conn, "a");
        let fan = testing::user(&conn, "b");
        let post = testing::post(&conn, author);
        let r = create_repost(&mut conn, post, fan).unwrap();

        assert!(matches!(
            delete_repost(&mut conn, r.id, author),
            Err(SocialError::Forbidden("repost"))
        ));
        assert_eq!(reposts_count(&conn, post), 1);
        assert!(matches!(
            delete_repost(&mut conn, r.id + 1, fan),
            Err(SocialError::NotFound("repost"))
        ));
    }
}
