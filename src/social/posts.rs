use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::access;
use super::error::{require_id, SocialError, SocialResult};
use super::media::{self, NewMedia};
use super::tags;
use super::users;
use crate::db::models::{Post, PostDetail};
use crate::db::unit_of_work;

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_CONTENT_LEN: usize = 10_000;
pub const DEFAULT_PAGE: u32 = 50;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub media: Vec<NewMedia>,
}

/// Partial update. `None` leaves a field alone; `Some` tags or media replace
/// the whole set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub media: Option<Vec<NewMedia>>,
}

/// Rows removed by a post cascade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PostDeletion {
    pub comments: usize,
    pub reposts: usize,
    pub likes: usize,
    pub tags: usize,
    pub media: usize,
}

impl PostDeletion {
    fn absorb(&mut self, other: PostDeletion) {
        self.comments += other.comments;
        self.reposts += other.reposts;
        self.likes += other.likes;
        self.tags += other.tags;
        self.media += other.media;
    }
}

fn validate_title(title: &str) -> SocialResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(SocialError::validation("Post title cannot be empty"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(SocialError::validation(format!(
            "Post title must be {MAX_TITLE_LEN} characters or less"
        )));
    }
    Ok(title.to_string())
}

fn validate_content(content: &str) -> SocialResult<String> {
    let content = content.trim();
    if content.is_empty() {
        return Err(SocialError::validation("Post content cannot be empty"));
    }
    if content.chars().count() > MAX_CONTENT_LEN {
        return Err(SocialError::validation(format!(
            "Post content must be {MAX_CONTENT_LEN} characters or less"
        )));
    }
    Ok(content.to_string())
}

pub(crate) fn load(conn: &Connection, post_id: i64) -> SocialResult<Post> {
    conn.query_row(
        &format!("SELECT {} FROM posts WHERE id = ?1", Post::COLUMNS),
        params![post_id],
        Post::from_row,
    )
    .optional()?
    .ok_or(SocialError::NotFound("post"))
}

fn detail(conn: &Connection, post: Post) -> SocialResult<PostDetail> {
    let tags = tags::tags_for_post(conn, post.id)?;
    let media = media::for_post(conn, post.id)?;
    Ok(PostDetail { post, tags, media })
}

pub fn create_post(conn: &mut Connection, user_id: i64, new: &NewPost) -> SocialResult<PostDetail> {
    require_id(user_id, "user")?;
    let title = validate_title(&new.title)?;
    let content = validate_content(&new.content)?;
    let tag_names = tags::normalize(&new.tags)?;
    media::validate(&new.media)?;

    unit_of_work(conn, |tx| {
        users::ensure_exists(tx, user_id)?;

        tx.execute(
            "INSERT INTO posts (user_id, title, content) VALUES (?1, ?2, ?3)",
            params![user_id, title, content],
        )?;
        let post_id = tx.last_insert_rowid();

        tags::link(tx, post_id, &tag_names)?;
        media::insert(tx, post_id, &new.media)?;

        tracing::debug!(post_id, user_id, "created post");
        detail(tx, load(tx, post_id)?)
    })
}

pub fn update_post(
    conn: &mut Connection,
    post_id: i64,
    user_id: i64,
    changes: &PostChanges,
) -> SocialResult<PostDetail> {
    require_id(post_id, "post")?;
    require_id(user_id, "user")?;
    let title = changes.title.as_deref().map(validate_title).transpose()?;
    let content = changes.content.as_deref().map(validate_content).transpose()?;
    let tag_names = changes.tags.as_deref().map(tags::normalize).transpose()?;
    if let Some(items) = &changes.media {
        media::validate(items)?;
    }

    unit_of_work(conn, |tx| {
        let post = load(tx, post_id)?;
        if !access::can_modify(&post, user_id) {
            return Err(SocialError::Forbidden("post"));
        }

        if let Some(title) = &title {
            tx.execute(
                "UPDATE posts SET title = ?2 WHERE id = ?1",
                params![post_id, title],
            )?;
        }
        if let Some(content) = &content {
            tx.execute(
                "UPDATE posts SET content = ?2 WHERE id = ?1",
                params![post_id, content],
            )?;
        }
        if let Some(names) = &tag_names {
            tags::relink(tx, post_id, names)?;
        }
        if let Some(items) = &changes.media {
            media::replace(tx, post_id, items)?;
        }

        detail(tx, load(tx, post_id)?)
    })
}

pub fn get_post(conn: &Connection, post_id: i64) -> SocialResult<PostDetail> {
    require_id(post_id, "post")?;
    let post = load(conn, post_id)?;
    detail(conn, post)
}

/// Newest first.
pub fn list_posts(conn: &Connection, limit: u32) -> SocialResult<Vec<Post>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM posts ORDER BY created_at DESC, id DESC LIMIT ?1",
        Post::COLUMNS
    ))?;
    let posts = stmt
        .query_map(params![limit], Post::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(posts)
}

pub fn list_user_posts(conn: &Connection, user_id: i64) -> SocialResult<Vec<Post>> {
    require_id(user_id, "user")?;
    users::ensure_exists(conn, user_id)?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM posts WHERE user_id = ?1 ORDER BY created_at DESC, id DESC",
        Post::COLUMNS
    ))?;
    let posts = stmt
        .query_map(params![user_id], Post::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(posts)
}

/// Remove a post and everything hanging off it, children first.
///
/// Foreign keys are declared without `ON DELETE CASCADE`, so the order here is
/// what keeps the delete of the post row itself legal.
pub(crate) fn cascade(conn: &Connection, post_id: i64) -> SocialResult<PostDeletion> {
    let comments = conn.execute("DELETE FROM comments WHERE post_id = ?1", params![post_id])?;
    let reposts = conn.execute(
        "DELETE FROM reposts WHERE original_post_id = ?1",
        params![post_id],
    )?;
    let likes = conn.execute("DELETE FROM post_likes WHERE post_id = ?1", params![post_id])?;
    let tags = conn.execute("DELETE FROM post_tags WHERE post_id = ?1", params![post_id])?;
    let media = conn.execute("DELETE FROM media WHERE post_id = ?1", params![post_id])?;
    conn.execute("DELETE FROM posts WHERE id = ?1", params![post_id])?;

    Ok(PostDeletion {
        comments,
        reposts,
        likes,
        tags,
        media,
    })
}

/// Cascade every post in `post_ids`, summing what was removed.
pub(crate) fn cascade_all(conn: &Connection, post_ids: &[i64]) -> SocialResult<PostDeletion> {
    let mut total = PostDeletion::default();
    for &post_id in post_ids {
        total.absorb(cascade(conn, post_id)?);
    }
    Ok(total)
}

pub fn delete_post(
    conn: &mut Connection,
    post_id: i64,
    requester_id: i64,
) -> SocialResult<PostDeletion> {
    require_id(post_id, "post")?;
    require_id(requester_id, "user")?;

    let removed = unit_of_work(conn, |tx| {
        let post = load(tx, post_id)?;
        if !access::can_modify(&post, requester_id) {
            return Err(SocialError::Forbidden("post"));
        }
        cascade(tx, post_id)
    })?;

    tracing::info!(post_id, ?removed, "deleted post");
    Ok(removed)
}
