use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use super::counters::{self, Counter};
use super::error::{is_unique_violation, require_id, SocialError, SocialResult};
use super::posts::{self, PostDeletion};
use crate::db::models::User;
use crate::db::unit_of_work;

pub const MAX_NAME_LEN: usize = 100;

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub bio: Option<String>,
}

/// What a user deletion removed and repaired.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserDeletion {
    /// Posts by other users whose counters were decremented.
    pub posts_adjusted: usize,
    pub likes: usize,
    pub comments: usize,
    pub reposts: usize,
    pub posts: usize,
    /// Children of the user's own posts.
    pub cascaded: PostDeletion,
}

/// The user's own activity on one post, aggregated before it is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Activity {
    post_id: i64,
    likes: i64,
    comments: i64,
    reposts: i64,
}

fn validate_name(name: &str) -> SocialResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(SocialError::validation("Name cannot be empty"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(SocialError::validation(format!(
            "Name must be {MAX_NAME_LEN} characters or less"
        )));
    }
    Ok(name.to_string())
}

/// Shape check only: one `@`, something before it, a dotted domain after.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && tld.len() >= 2 && !tld.ends_with('.'))
}

fn validate_email(email: &str) -> SocialResult<String> {
    let email = email.trim();
    if !is_valid_email(email) {
        return Err(SocialError::validation("Invalid email address"));
    }
    Ok(email.to_string())
}

fn map_email_conflict(err: rusqlite::Error) -> SocialError {
    if is_unique_violation(&err) {
        SocialError::conflict("Email already exists")
    } else {
        SocialError::Store(err)
    }
}

pub(crate) fn ensure_exists(conn: &Connection, user_id: i64) -> SocialResult<()> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
        params![user_id],
        |r| r.get(0),
    )?;
    if !exists {
        return Err(SocialError::NotFound("user"));
    }
    Ok(())
}

pub fn get_user(conn: &Connection, user_id: i64) -> SocialResult<User> {
    require_id(user_id, "user")?;
    conn.query_row(
        &format!("SELECT {} FROM users WHERE id = ?1", User::COLUMNS),
        params![user_id],
        User::from_row,
    )
    .optional()?
    .ok_or(SocialError::NotFound("user"))
}

pub fn list_users(conn: &Connection) -> SocialResult<Vec<User>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM users ORDER BY id", User::COLUMNS))?;
    let users = stmt
        .query_map([], User::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(users)
}

pub fn create_user(conn: &mut Connection, new: &NewUser) -> SocialResult<User> {
    let name = validate_name(&new.name)?;
    let email = validate_email(&new.email)?;
    if new.password_hash.is_empty() {
        return Err(SocialError::validation("Password hash cannot be empty"));
    }

    unit_of_work(conn, |tx| {
        tx.execute(
            "INSERT INTO users (name, email, password_hash) VALUES (?1, ?2, ?3)",
            params![name, email, new.password_hash],
        )
        .map_err(map_email_conflict)?;
        let id = tx.last_insert_rowid();
        tracing::debug!(user_id = id, "created user");
        get_user(tx, id)
    })
}

pub fn update_user(conn: &mut Connection, user_id: i64, changes: &UserChanges) -> SocialResult<User> {
    require_id(user_id, "user")?;
    let name = changes.name.as_deref().map(validate_name).transpose()?;
    let email = changes.email.as_deref().map(validate_email).transpose()?;

    unit_of_work(conn, |tx| {
        ensure_exists(tx, user_id)?;

        if let Some(name) = &name {
            tx.execute(
                "UPDATE users SET name = ?2 WHERE id = ?1",
                params![user_id, name],
            )?;
        }
        if let Some(email) = &email {
            tx.execute(
                "UPDATE users SET email = ?2 WHERE id = ?1",
                params![user_id, email],
            )
            .map_err(map_email_conflict)?;
        }
        if let Some(hash) = &changes.password_hash {
            tx.execute(
                "UPDATE users SET password_hash = ?2 WHERE id = ?1",
                params![user_id, hash],
            )?;
        }
        if let Some(bio) = &changes.bio {
            tx.execute(
                "UPDATE users SET bio = ?2 WHERE id = ?1",
                params![user_id, bio.trim()],
            )?;
        }

        get_user(tx, user_id)
    })
}

/// Per target post, how many likes, comments and reposts the user authored.
/// The user's own posts are skipped; they are removed whole later on.
fn aggregate_activity(conn: &Connection, user_id: i64) -> SocialResult<Vec<Activity>> {
    let mut stmt = conn.prepare(
        "SELECT post_id, SUM(likes), SUM(comments), SUM(reposts) FROM (
             SELECT post_id, COUNT(*) AS likes, 0 AS comments, 0 AS reposts
               FROM post_likes WHERE user_id = ?1 GROUP BY post_id
             UNION ALL
             SELECT post_id, 0, COUNT(*), 0
               FROM comments WHERE user_id = ?1 GROUP BY post_id
             UNION ALL
             SELECT original_post_id, 0, 0, COUNT(*)
               FROM reposts WHERE user_id = ?1 GROUP BY original_post_id
         )
         WHERE post_id NOT IN (SELECT id FROM posts WHERE user_id = ?1)
         GROUP BY post_id
         ORDER BY post_id",
    )?;
    let rows = stmt
        .query_map(params![user_id], |r| {
            Ok(Activity {
                post_id: r.get(0)?,
                likes: r.get(1)?,
                comments: r.get(2)?,
                reposts: r.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn owned_post_ids(conn: &Connection, user_id: i64) -> SocialResult<Vec<i64>> {
    let mut stmt = conn.prepare("SELECT id FROM posts WHERE user_id = ?1 ORDER BY id")?;
    let ids = stmt
        .query_map(params![user_id], |r| r.get(0))?
        .collect::<Result<Vec<i64>, _>>()?;
    Ok(ids)
}

/// Delete a user and everything they authored, keeping every other post's
/// counters exact.
///
/// The order is load-bearing: activity is aggregated and subtracted from the
/// target posts before the rows it was aggregated from are deleted.
pub fn delete_user(conn: &mut Connection, user_id: i64) -> SocialResult<UserDeletion> {
    require_id(user_id, "user")?;

    let summary = unit_of_work::<_, SocialError, _>(conn, |tx| {
        ensure_exists(tx, user_id)?;
        let mut summary = UserDeletion::default();

        // 1. aggregate
        let activity = aggregate_activity(tx, user_id)?;

        // 2. decrement
        for a in &activity {
            for (counter, by) in [
                (Counter::Likes, a.likes),
                (Counter::Comments, a.comments),
                (Counter::Reposts, a.reposts),
            ] {
                if by > 0 {
                    counters::decrement(tx, a.post_id, counter, by)?;
                }
            }
        }
        summary.posts_adjusted = activity.len();

        // 3. delete the activity
        summary.likes = tx.execute("DELETE FROM post_likes WHERE user_id = ?1", params![user_id])?;
        summary.comments = tx.execute("DELETE FROM comments WHERE user_id = ?1", params![user_id])?;
        summary.reposts = tx.execute("DELETE FROM reposts WHERE user_id = ?1", params![user_id])?;

        // 4. cascade the user's own posts
        let own = owned_post_ids(tx, user_id)?;
        summary.cascaded = posts::cascade_all(tx, &own)?;
        summary.posts = own.len();

        // 5. the user
        tx.execute("DELETE FROM users WHERE id = ?1", params![user_id])?;

        Ok(summary)
    })?;

    tracing::info!(user_id, ?summary, "deleted user");
    Ok(summary)
}
