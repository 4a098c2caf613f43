use rusqlite::{params, Connection};

use super::error::{require_id, SocialError, SocialResult};
use super::posts;
use crate::db::models::Tag;
use crate::db::unit_of_work;

pub const MAX_TAG_LEN: usize = 64;

/// Trim names, reject empty or oversized ones and drop repeats, keeping the
/// first occurrence's position.
pub fn normalize(names: &[String]) -> SocialResult<Vec<String>> {
    let mut out: Vec<String> = Vec::with_capacity(names.len());
    for raw in names {
        let name = raw.trim();
        if name.is_empty() {
            return Err(SocialError::validation("Tag name cannot be empty"));
        }
        if name.chars().count() > MAX_TAG_LEN {
            return Err(SocialError::validation(format!(
                "Tag name must be {MAX_TAG_LEN} characters or less"
            )));
        }
        if !out.iter().any(|n| n == name) {
            out.push(name.to_string());
        }
    }
    Ok(out)
}

/// Get-or-create in one statement. Two writers racing on the same new name
/// both end up with the single surviving row's id.
fn upsert(conn: &Connection, name: &str) -> SocialResult<i64> {
    let id = conn.query_row(
        "INSERT INTO tags (name) VALUES (?1)
         ON CONFLICT(name) DO UPDATE SET name = excluded.name
         RETURNING id",
        params![name],
        |r| r.get(0),
    )?;
    Ok(id)
}

/// Resolve each name and link it to the post. Already-linked pairs are left
/// alone. `names` must already be normalized.
pub(crate) fn link(conn: &Connection, post_id: i64, names: &[String]) -> SocialResult<usize> {
    let mut linked = 0;
    for name in names {
        let tag_id = upsert(conn, name)?;
        linked += conn.execute(
            "INSERT INTO post_tags (post_id, tag_id) VALUES (?1, ?2)
             ON CONFLICT(post_id, tag_id) DO NOTHING",
            params![post_id, tag_id],
        )?;
    }
    Ok(linked)
}

/// Drop every link of the post, then link `names`.
pub(crate) fn relink(conn: &Connection, post_id: i64, names: &[String]) -> SocialResult<()> {
    conn.execute("DELETE FROM post_tags WHERE post_id = ?1", params![post_id])?;
    link(conn, post_id, names)?;
    Ok(())
}

/// Attach tags to a post, creating unknown tags. Returns how many new links
/// were made; repeating the call returns 0.
pub fn attach_tags(conn: &mut Connection, post_id: i64, names: &[String]) -> SocialResult<usize> {
    require_id(post_id, "post")?;
    let names = normalize(names)?;

    unit_of_work(conn, |tx| {
        posts::load(tx, post_id)?;
        let linked = link(tx, post_id, &names)?;
        tracing::debug!(post_id, linked, "attached tags");
        Ok(linked)
    })
}

/// Replace the post's whole tag set. Callers pass the complete desired list.
pub fn replace_tags(conn: &mut Connection, post_id: i64, names: &[String]) -> SocialResult<()> {
    require_id(post_id, "post")?;
    let names = normalize(names)?;

    unit_of_work(conn, |tx| {
        posts::load(tx, post_id)?;
        relink(tx, post_id, &names)
    })
}

pub fn tags_for_post(conn: &Connection, post_id: i64) -> SocialResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT t.name FROM post_tags pt
         JOIN tags t ON t.id = pt.tag_id
         WHERE pt.post_id = ?1
         ORDER BY t.name",
    )?;
    let names = stmt
        .query_map(params![post_id], |r| r.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(names)
}

pub fn list_tags(conn: &Connection) -> SocialResult<Vec<Tag>> {
    let mut stmt = conn.prepare("SELECT id, name FROM tags ORDER BY name")?;
    let tags = stmt
        .query_map([], |r| {
            Ok(Tag {
                id: r.get(0)?,
                name: r.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tags)
}
