//! Denormalized aggregates on `posts`.
//!
//! Every change is a relative expression evaluated by SQLite inside the
//! caller's transaction. Nothing here reads a count and writes it back.

use rusqlite::{params, Connection};
use serde::Serialize;

use super::error::{SocialError, SocialResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    Likes,
    Comments,
    Reposts,
}

impl Counter {
    pub const ALL: [Counter; 3] = [Counter::Likes, Counter::Comments, Counter::Reposts];

    pub fn column(&self) -> &'static str {
        match self {
            Counter::Likes => "likes_count",
            Counter::Comments => "comments_count",
            Counter::Reposts => "reposts_count",
        }
    }

    /// Table and column whose rows the counter summarizes.
    fn source(&self) -> (&'static str, &'static str) {
        match self {
            Counter::Likes => ("post_likes", "post_id"),
            Counter::Comments => ("comments", "post_id"),
            Counter::Reposts => ("reposts", "original_post_id"),
        }
    }
}

pub(crate) fn increment(conn: &Connection, post_id: i64, counter: Counter) -> SocialResult<()> {
    let col = counter.column();
    let rows = conn.execute(
        &format!("UPDATE posts SET {col} = {col} + 1 WHERE id = ?1"),
        params![post_id],
    )?;
    if rows == 0 {
        return Err(SocialError::NotFound("post"));
    }
    Ok(())
}

/// Subtract `by` from the counter, clamped at zero.
pub(crate) fn decrement(
    conn: &Connection,
    post_id: i64,
    counter: Counter,
    by: i64,
) -> SocialResult<()> {
    let col = counter.column();
    conn.execute(
        &format!("UPDATE posts SET {col} = MAX({col} - ?2, 0) WHERE id = ?1"),
        params![post_id, by],
    )?;
    Ok(())
}

/// A post whose cached counters disagree with its live child rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounterDrift {
    pub post_id: i64,
    pub column: &'static str,
    pub cached: i64,
    pub actual: i64,
}

pub fn find_drift(conn: &Connection) -> SocialResult<Vec<CounterDrift>> {
    let mut drift = Vec::new();

    for counter in Counter::ALL {
        let col = counter.column();
        let (table, fk) = counter.source();
        let mut stmt = conn.prepare(&format!(
            "SELECT p.id, p.{col},
                    (SELECT COUNT(*) FROM {table} c WHERE c.{fk} = p.id) AS actual
             FROM posts p
             WHERE p.{col} != (SELECT COUNT(*) FROM {table} c WHERE c.{fk} = p.id)
             ORDER BY p.id"
        ))?;

        let rows = stmt.query_map([], |row| {
            Ok(CounterDrift {
                post_id: row.get(0)?,
                column: col,
                cached: row.get(1)?,
                actual: row.get(2)?,
            })
        })?;
        for row in rows {
            drift.push(row?);
        }
    }

    Ok(drift)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::social::testing;

    fn count(conn: &Connection, post_id: i64, counter: Counter) -> i64 {
        conn.query_row(
            &format!("SELECT {} FROM posts WHERE id = ?1", counter.column()),
            params![post_id],
            |r| r.get(0),
        )
        .unwrap()
    }

    #[test]
    fn increment_then_decrement() {
        let conn = testing::conn();
        let author = testing::user(&conn, "a");
        let post = testing::post(&conn, author);

        increment(&conn, post, Counter::Likes).unwrap();
        increment(&conn, post, Counter::Likes).unwrap();
        assert_eq!(count(&conn, post, Counter::Likes), 2);

        decrement(&conn, post, Counter::Likes, 1).unwrap();
        assert_eq!(count(&conn, post, Counter::Likes), 1);
        assert_eq!(count(&conn, post, Counter::Comments), 0);
    }

    #[test]
    fn decrement_clamps_at_zero() {
        let conn = testing::conn();
        let author = testing::user(&conn, "a");
        let post = testing::post(&conn, author);

        increment(&conn, post, Counter::Reposts).unwrap();
        decrement(&conn, post, Counter::Reposts, 5).unwrap();
        assert_eq!(count(&conn, post, Counter::Reposts), 0);
    }

    #[test]
    fn increment_missing_post_is_not_found() {
        let conn = testing::conn();
        assert!(matches!(
            increment(&conn, 99, Counter::Comments),
            Err(SocialError::NotFound("post"))
        ));
    }

    #[test]
    fn find_drift_reports_mismatches() {
        let conn = testing::conn();
        let author = testing::user(&conn, "a");
        let post = testing::post(&conn, author);
        assert!(find_drift(&conn).unwrap().is_empty());

        increment(&conn, post, Counter::Comments).unwrap();
        let drift = find_drift(&conn).unwrap();
        assert_eq!(
            drift,
            vec![CounterDrift {
                post_id: post,
                column: "comments_count",
                cached: 1,
                actual: 0,
            }]
        );
    }
}
