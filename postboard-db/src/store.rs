use async_trait::async_trait;
use postboard_common::{
    model::{
        Id, ModelValidationError, PostboardSnowflakeGenerator,
        auth::{AuthTokenHash, Authentication},
        post::{CommentMarker, CreatePost, Post, PostMarker},
        profile::{Profile, UserMarker},
    },
    snowflake::{ProcessId, TimestampError, WorkerId},
};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error("Could not generate an id: {0}")]
    Snowflake(#[from] TimestampError),
    #[error("Post with id {0} does not exist")]
    MissingPost(Id<PostMarker>),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Persistence for posts and the records that gate access to them.
///
/// Saves replace the whole post; there is no concurrency token, so of two
/// overlapping read-modify-write cycles on one post the later save wins.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// All posts, newest `date` first.
    async fn fetch_posts(&self) -> Result<Vec<Post>>;

    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>>;

    /// Persists a post with a fresh id, the current date and no likes or comments.
    async fn create_post(&self, post: CreatePost) -> Result<Post>;

    /// Overwrites the likes and comments of an existing post.
    async fn save_post(&self, post: &Post) -> Result<()>;

    async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<()>;

    fn next_comment_id(&self) -> Result<Id<CommentMarker>>;

    async fn fetch_profile(&self, user: Id<UserMarker>) -> Result<Option<Profile>>;

    /// Does nothing if the user already has a profile.
    async fn create_profile(&self, profile: &Profile) -> Result<()>;

    async fn fetch_auth(&self, token_hash: &AuthTokenHash) -> Result<Option<Authentication>>;

    async fn create_auth(&self, authentication: &Authentication) -> Result<()>;

    /// Releases connections. Called once on shutdown.
    async fn close(&self);
}

/// Thread-safe snowflake source shared by the store implementations.
pub struct IdSource(Mutex<PostboardSnowflakeGenerator>);

impl IdSource {
    #[must_use]
    pub fn new(worker_id: WorkerId, process_id: ProcessId) -> Self {
        Self(Mutex::new(PostboardSnowflakeGenerator::new(
            worker_id, process_id,
        )))
    }

    pub fn next<Marker>(&self) -> Result<Id<Marker>> {
        let snowflake = self
            .0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generate()?;

        Ok(snowflake.into())
    }
}
