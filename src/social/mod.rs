//! The consistency engine: commands over users, posts and their children.
//!
//! Each mutating command owns exactly one immediate transaction (see
//! [`crate::db::unit_of_work`]) and keeps the cached counters on `posts` equal
//! to the live number of likes, comments and reposts when it commits.

pub mod access;
pub mod comments;
pub mod counters;
pub mod error;
pub mod likes;
pub mod media;
pub mod posts;
pub mod reposts;
pub mod tags;
pub mod users;

pub use error::{SocialError, SocialResult};

#[cfg(test)]
pub(crate) mod testing {
    use rusqlite::{params, Connection};

    /// Fresh in-memory database with the full schema.
    pub fn conn() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        crate::db::migrate(&mut conn).unwrap();
        conn
    }

    pub fn user(conn: &Connection, name: &str) -> i64 {
        conn.execute(
            "INSERT INTO users (name, email, password_hash) VALUES (?1, ?2, 'hash')",
            params![name, format!("{name}@example.com")],
        )
        .unwrap();
        conn.last_insert_rowid()
    }

    pub fn post(conn: &Connection, author: i64) -> i64 {
        conn.execute(
            "INSERT INTO posts (user_id, title, content) VALUES (?1, 'title', 'content')",
            params![author],
        )
        .unwrap();
        conn.last_insert_rowid()
    }

    pub fn count(conn: &Connection, sql: &str) -> i64 {
        conn.query_row(sql, [], |r| r.get(0)).unwrap()
    }
}
