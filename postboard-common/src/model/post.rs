use crate::model::{Id, profile::UserMarker};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct CommentMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub user: Id<UserMarker>,
    pub text: String,
    pub name: String,
    pub avatar: String,
    pub likes: Vec<Like>,
    pub comments: Vec<Comment>,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Like {
    pub user: Id<UserMarker>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Comment {
    pub id: Id<CommentMarker>,
    pub user: Id<UserMarker>,
    pub text: String,
    pub name: String,
    pub avatar: String,
    #[serde(rename = "createdAt", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Request body shared by post creation and comments.
///
/// Every field defaults to empty so that a missing `text` reaches validation
/// instead of failing JSON extraction.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
#[serde(default)]
pub struct PostInput {
    pub text: String,
    pub name: String,
    pub avatar: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CreatePost {
    pub user: Id<UserMarker>,
    pub input: PostInput,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum LikeError {
    #[error("User already liked this post")]
    AlreadyLiked,
    #[error("You have not liked this post")]
    NotLiked,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Error)]
#[error("Comment doesn't exist")]
pub struct CommentNotFoundError(pub Id<CommentMarker>);

impl Comment {
    #[must_use]
    pub fn new(
        id: Id<CommentMarker>,
        user: Id<UserMarker>,
        input: PostInput,
        created_at: OffsetDateTime,
    ) -> Self {
        Self {
            id,
            user,
            text: input.text,
            name: input.name,
            avatar: input.avatar,
            created_at,
        }
    }
}

impl Post {
    #[must_use]
    pub fn is_owned_by(&self, user: Id<UserMarker>) -> bool {
        self.user == user
    }

    #[must_use]
    pub fn is_liked_by(&self, user: Id<UserMarker>) -> bool {
        self.likes.iter().any(|like| like.user == user)
    }

    pub fn add_like(&mut self, user: Id<UserMarker>) -> Result<(), LikeError> {
        if self.is_liked_by(user) {
            return Err(LikeError::AlreadyLiked);
        }

        self.likes.push(Like { user });
        Ok(())
    }

    /// Removes the first like by `user`.
    pub fn remove_like(&mut self, user: Id<UserMarker>) -> Result<(), LikeError> {
        let index = self
            .likes
            .iter()
            .position(|like| like.user == user)
            .ok_or(LikeError::NotLiked)?;

        self.likes.remove(index);
        Ok(())
    }

    pub fn add_comment(&mut self, comment: Comment) {
        self.comments.push(comment);
    }

    /// Removes the first comment with the given id, regardless of its author.
    pub fn remove_comment(
        &mut self,
        comment_id: Id<CommentMarker>,
    ) -> Result<Comment, CommentNotFoundError> {
        let index = self
            .comments
            .iter()
            .position(|comment| comment.id == comment_id)
            .ok_or(CommentNotFoundError(comment_id))?;

        Ok(self.comments.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{
        Id,
        post::{Comment, CommentNotFoundError, Like, LikeError, Post, PostInput},
    };
    use time::macros::datetime;

    fn post() -> Post {
        Post {
            id: 1.into(),
            user: 10.into(),
            text: "hello".to_owned(),
            name: "A".to_owned(),
            avatar: String::new(),
            likes: Vec::new(),
            comments: Vec::new(),
            date: datetime!(2025-06-01 12:00 UTC),
        }
    }

    fn comment(id: u64, user: u64, text: &str) -> Comment {
        let input = PostInput {
            text: text.to_owned(),
            ..PostInput::default()
        };
        Comment::new(id.into(), user.into(), input, datetime!(2025-06-01 13:00 UTC))
    }

    #[test]
    fn like_is_unique_per_user() {
        let mut post = post();

        assert_eq!(post.add_like(20.into()), Ok(()));
        assert_eq!(post.add_like(20.into()), Err(LikeError::AlreadyLiked));
        assert_eq!(post.likes, vec![Like { user: 20.into() }]);
    }

    #[test]
    fn unlike_without_like_leaves_likes() {
        let mut post = post();
        post.add_like(30.into()).unwrap();

        assert_eq!(post.remove_like(20.into()), Err(LikeError::NotLiked));
        assert_eq!(post.likes, vec![Like { user: 30.into() }]);

        assert_eq!(post.remove_like(30.into()), Ok(()));
        assert!(post.likes.is_empty());
    }

    #[test]
    fn unlike_removes_only_callers_like() {
        let mut post = post();
        for user in [20, 30, 40] {
            post.add_like(user.into()).unwrap();
        }

        post.remove_like(30.into()).unwrap();

        assert_eq!(
            post.likes,
            vec![Like { user: 20.into() }, Like { user: 40.into() }]
        );
    }

    #[test]
    fn remove_comment_by_id() {
        let mut post = post();
        post.add_comment(comment(100, 20, "first"));
        post.add_comment(comment(101, 30, "second"));

        let missing = Id::from(999);
        assert_eq!(
            post.remove_comment(missing),
            Err(CommentNotFoundError(missing))
        );
        assert_eq!(post.comments.len(), 2);

        let removed = post.remove_comment(100.into()).unwrap();
        assert_eq!(removed.text, "first");
        assert_eq!(post.comments.len(), 1);
        assert_eq!(post.comments[0].id, Id::from(101));
    }

    #[test]
    fn ownership() {
        let post = post();

        assert!(post.is_owned_by(10.into()));
        assert!(!post.is_owned_by(20.into()));
    }

    #[test]
    fn json_field_names() {
        let mut post = post();
        post.add_like(20.into()).unwrap();
        post.add_comment(comment(100, 20, "nice"));

        let json = serde_json::to_value(&post).unwrap();

        assert_eq!(json["user"], 10);
        assert_eq!(json["likes"][0]["user"], 20);
        assert_eq!(json["comments"][0]["id"], 100);
        assert_eq!(json["comments"][0]["createdAt"], "2025-06-01T13:00:00Z");
        assert_eq!(json["date"], "2025-06-01T12:00:00Z");
    }
}
