use postboard_common::{
    model::{
        Id, ModelValidationError,
        auth::Authentication,
        post::{Comment, Like, Post},
        profile::{Profile, ProfileHandle},
    },
    util::PositiveDuration,
};
use sqlx::FromRow;
use std::collections::HashMap;
use time::OffsetDateTime;

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct PostRecord {
    pub post_snowflake: i64,
    pub user_snowflake: i64,
    pub text: String,
    pub name: String,
    pub avatar: String,
    pub date: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct LikeRecord {
    pub post_snowflake: i64,
    pub user_snowflake: i64,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct CommentRecord {
    pub comment_snowflake: i64,
    pub post_snowflake: i64,
    pub user_snowflake: i64,
    pub text: String,
    pub name: String,
    pub avatar: String,
    pub created_at: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct ProfileRecord {
    pub user_snowflake: i64,
    pub handle: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct AuthenticationRecord {
    pub user_snowflake: i64,
    pub token_hash: Vec<u8>,
    pub created_at: OffsetDateTime,
    pub expires_after_seconds: Option<i64>,
}

impl From<CommentRecord> for Comment {
    fn from(value: CommentRecord) -> Self {
        Self {
            id: Id::from_db(value.comment_snowflake),
            user: Id::from_db(value.user_snowflake),
            text: value.text,
            name: value.name,
            avatar: value.avatar,
            created_at: value.created_at,
        }
    }
}

impl TryFrom<ProfileRecord> for Profile {
    type Error = ModelValidationError;

    fn try_from(value: ProfileRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            user: Id::from_db(value.user_snowflake),
            handle: ProfileHandle::new(value.handle)?,
        })
    }
}

impl TryFrom<AuthenticationRecord> for Authentication {
    type Error = ModelValidationError;

    fn try_from(value: AuthenticationRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            user: Id::from_db(value.user_snowflake),
            token_hash: value.token_hash.try_into()?,
            created_at: value.created_at,
            expires_after: value
                .expires_after_seconds
                .map(PositiveDuration::from_seconds)
                .transpose()?,
        })
    }
}

/// Joins posts with their likes and comments. Child rows must arrive in
/// position order; the order of `posts` is kept.
pub(crate) fn assemble_posts(
    posts: Vec<PostRecord>,
    likes: Vec<LikeRecord>,
    comments: Vec<CommentRecord>,
) -> Vec<Post> {
    let mut likes_by_post: HashMap<i64, Vec<Like>> = HashMap::new();
    for like in likes {
        likes_by_post
            .entry(like.post_snowflake)
            .or_default()
            .push(Like {
                user: Id::from_db(like.user_snowflake),
            });
    }

    let mut comments_by_post: HashMap<i64, Vec<Comment>> = HashMap::new();
    for comment in comments {
        comments_by_post
            .entry(comment.post_snowflake)
            .or_default()
            .push(comment.into());
    }

    posts
        .into_iter()
        .map(|post| Post {
            id: Id::from_db(post.post_snowflake),
            user: Id::from_db(post.user_snowflake),
            text: post.text,
            name: post.name,
            avatar: post.avatar,
            likes: likes_by_post
                .remove(&post.post_snowflake)
                .unwrap_or_default(),
            comments: comments_by_post
                .remove(&post.post_snowflake)
                .unwrap_or_default(),
            date: post.date,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::record::{CommentRecord, LikeRecord, PostRecord, assemble_posts};
    use postboard_common::model::{Id, post::Like};
    use time::macros::datetime;

    fn post_record(post_snowflake: i64) -> PostRecord {
        PostRecord {
            post_snowflake,
            user_snowflake: 1,
            text: "text".to_owned(),
            name: "name".to_owned(),
            avatar: String::new(),
            date: datetime!(2025-06-01 12:00 UTC),
        }
    }

    #[test]
    fn children_follow_their_post() {
        let likes = vec![
            LikeRecord {
                post_snowflake: 20,
                user_snowflake: 7,
            },
            LikeRecord {
                post_snowflake: 10,
                user_snowflake: 8,
            },
            LikeRecord {
                post_snowflake: 20,
                user_snowflake: 9,
            },
        ];
        let comments = vec![CommentRecord {
            comment_snowflake: 99,
            post_snowflake: 10,
            user_snowflake: 7,
            text: "hi".to_owned(),
            name: String::new(),
            avatar: String::new(),
            created_at: datetime!(2025-06-01 13:00 UTC),
        }];

        let posts = assemble_posts(vec![post_record(20), post_record(10)], likes, comments);

        assert_eq!(posts[0].id, Id::from(20));
        assert_eq!(
            posts[0].likes,
            vec![Like { user: 7.into() }, Like { user: 9.into() }]
        );
        assert!(posts[0].comments.is_empty());
        assert_eq!(posts[1].likes, vec![Like { user: 8.into() }]);
        assert_eq!(posts[1].comments[0].id, Id::from(99));
    }
}
