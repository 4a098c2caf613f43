use rusqlite::{params, Connection};
use serde::Deserialize;

use super::error::{SocialError, SocialResult};
use crate::db::models::{Media, MediaKind};

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NewMedia {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
}

pub fn validate(items: &[NewMedia]) -> SocialResult<()> {
    if items.iter().any(|m| m.url.trim().is_empty()) {
        return Err(SocialError::validation("Media url cannot be empty"));
    }
    Ok(())
}

pub(crate) fn insert(conn: &Connection, post_id: i64, items: &[NewMedia]) -> SocialResult<()> {
    let mut stmt = conn.prepare("INSERT INTO media (post_id, url, kind) VALUES (?1, ?2, ?3)")?;
    for item in items {
        stmt.execute(params![post_id, item.url.trim(), item.kind])?;
    }
    Ok(())
}

pub(crate) fn replace(conn: &Connection, post_id: i64, items: &[NewMedia]) -> SocialResult<()> {
    conn.execute("DELETE FROM media WHERE post_id = ?1", params![post_id])?;
    insert(conn, post_id, items)
}

pub fn for_post(conn: &Connection, post_id: i64) -> SocialResult<Vec<Media>> {
    let mut stmt =
        conn.prepare("SELECT id, post_id, url, kind FROM media WHERE post_id = ?1 ORDER BY id")?;
    let media = stmt
        .query_map(params![post_id], |r| {
            Ok(Media {
                id: r.get(0)?,
                post_id: r.get(1)?,
                url: r.get(2)?,
                kind: r.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(media)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::social::testing;

    fn image(url: &str) -> NewMedia {
        NewMedia {
            url: url.into(),
            kind: MediaKind::Image,
        }
    }

    #[test]
    fn validate_rejects_blank_url() {
        assert!(validate(&[image("https://x/1.png")]).is_ok());
        assert!(matches!(
            validate(&[image(" ")]),
            Err(SocialError::Validation(_))
        ));
    }

    #[test]
    fn duplicates_are_allowed() {
        let conn = testing::conn();
        let author = testing::user(&conn, "a");
        let post = testing::post(&conn, author);

        insert(&conn, post, &[image("u"), image("u")]).unwrap();
        assert_eq!(for_post(&conn, post).unwrap().len(), 2);
    }

    #[test]
    fn replace_swaps_the_set() {
        let conn = testing::conn();
        let author = testing::user(&conn, "a");
        let post = testing::post(&conn, author);

        insert(&conn, post, &[image("old")]).unwrap();
        replace(
            &conn,
            post,
            &[NewMedia {
                url: "new".into(),
                kind: MediaKind::Video,
            }],
        )
        .unwrap();

        let media = for_post(&conn, post).unwrap();
        assert_eq!(media.len(), 1);
        assert_eq!(media[0].url, "new");
        assert_eq!(media[0].kind, MediaKind::Video);
    }

    #[test]
    fn unknown_stored_kind_is_a_store_error() {
        let conn = testing::conn();
        let author = testing::user(&conn, "a");
        let post = testing::post(&conn, author);
        insert(&conn, post, &[image("ok")]).unwrap();

        conn.execute_batch("PRAGMA ignore_check_constraints = ON;")
            .unwrap();
        conn.execute(
            "INSERT INTO media (post_id, url, kind) VALUES (?1, 'bad', 'audio')",
            params![post],
        )
        .unwrap();

        let err = for_post(&conn, post).unwrap_err();
        assert!(matches!(
            err,
            SocialError::Store(rusqlite::Error::FromSqlConversionFailure(..))
        ));
    }

    #[test]
    fn media_kind_deserializes_from_type_field() {
        let m: NewMedia = serde_json::from_str(r#"{"url":"a","type":"video"}"#).unwrap();
        assert_eq!(m.kind, MediaKind::Video);
        assert!(serde_json::from_str::<NewMedia>(r#"{"url":"a","type":"gif"}"#).is_err());
    }
}
