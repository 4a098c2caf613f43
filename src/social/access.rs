// Ownership checks - pure, no store access
use crate::db::models::{Comment, Post, Repost};

/// Something a single user authored.
pub trait Owned {
    fn owner_id(&self) -> i64;
}

impl Owned for Post {
    fn owner_id(&self) -> i64 {
        self.user_id
    }
}

impl Owned for Comment {
    fn owner_id(&self) -> i64 {
        self.user_id
    }
}

impl Owned for Repost {
    fn owner_id(&self) -> i64 {
        self.user_id
    }
}

/// Whether `caller` may edit or delete `resource`.
pub fn can_modify<R: Owned + ?Sized>(resource: &R, caller: i64) -> bool {
    resource.owner_id() == caller
}

/// Whether `caller` may repost `post`. Authors cannot repost themselves.
pub fn can_repost(post: &Post, caller: i64) -> bool {
    post.user_id != caller
}

/// Whether `comment` is attached to the post addressed by the request.
pub fn comment_belongs_to(comment: &Comment, post_id: i64) -> bool {
    comment.post_id == post_id
}
