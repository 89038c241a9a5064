use crate::{
    record::{
        AuthenticationRecord, CommentRecord, LikeRecord, PostRecord, ProfileRecord,
        assemble_posts,
    },
    store::{DbError, IdSource, PostStore, Result},
};
use async_trait::async_trait;
use postboard_common::{
    model::{
        Id,
        auth::{AuthTokenHash, Authentication},
        post::{CommentMarker, CreatePost, Post, PostMarker},
        profile::{Profile, UserMarker},
    },
    snowflake::{ProcessId, WorkerId},
};
use sqlx::{PgPool, query, query_as};
use time::OffsetDateTime;
use tracing::{debug, info};

/// Postgres-backed [`PostStore`].
pub struct DbClient {
    pool: PgPool,
    ids: IdSource,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool, worker_id: WorkerId, process_id: ProcessId) -> Self {
        Self {
            pool,
            ids: IdSource::new(worker_id, process_id),
        }
    }

    pub async fn connect(
        database_url: &str,
        worker_id: WorkerId,
        process_id: ProcessId,
    ) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        info!("Connected to database");

        Ok(Self::new(pool, worker_id, process_id))
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        debug!("Database migrations applied");

        Ok(())
    }
}

#[async_trait]
impl PostStore for DbClient {
    async fn fetch_posts(&self) -> Result<Vec<Post>> {
        let posts = query_as::<_, PostRecord>(
            "
            SELECT post_snowflake, user_snowflake, text, name, avatar, date
            FROM posts.posts
            ORDER BY date DESC, post_snowflake DESC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        let likes = query_as::<_, LikeRecord>(
            "
            SELECT post_snowflake, user_snowflake
            FROM posts.likes
            ORDER BY post_snowflake, position
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        let comments = query_as::<_, CommentRecord>(
            "
            SELECT comment_snowflake, post_snowflake, user_snowflake, text, name, avatar, created_at
            FROM posts.comments
            ORDER BY post_snowflake, position
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(assemble_posts(posts, likes, comments))
    }

    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let Some(post) = query_as::<_, PostRecord>(
            "
            SELECT post_snowflake, user_snowflake, text, name, avatar, date
            FROM posts.posts
            WHERE post_snowflake = $1
            ",
        )
        .bind(post_id.to_db())
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let likes = query_as::<_, LikeRecord>(
            "
            SELECT post_snowflake, user_snowflake
            FROM posts.likes
            WHERE post_snowflake = $1
            ORDER BY position
            ",
        )
        .bind(post_id.to_db())
        .fetch_all(&self.pool)
        .await?;

        let comments = query_as::<_, CommentRecord>(
            "
            SELECT comment_snowflake, post_snowflake, user_snowflake, text, name, avatar, created_at
            FROM posts.comments
            WHERE post_snowflake = $1
            ORDER BY position
            ",
        )
        .bind(post_id.to_db())
        .fetch_all(&self.pool)
        .await?;

        Ok(assemble_posts(vec![post], likes, comments).pop())
    }

    async fn create_post(&self, post: CreatePost) -> Result<Post> {
        let post_id: Id<PostMarker> = self.ids.next()?;

        let record = query_as::<_, PostRecord>(
            "
            INSERT INTO posts.posts (post_snowflake, user_snowflake, text, name, avatar, date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING post_snowflake, user_snowflake, text, name, avatar, date
            ",
        )
        .bind(post_id.to_db())
        .bind(post.user.to_db())
        .bind(post.input.text)
        .bind(post.input.name)
        .bind(post.input.avatar)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(&self.pool)
        .await?;

        assemble_posts(vec![record], Vec::new(), Vec::new())
            .pop()
            .ok_or(DbError::MissingPost(post_id))
    }

    async fn save_post(&self, post: &Post) -> Result<()> {
        let mut transaction = self.pool.begin().await?;

        query("SELECT 1 FROM posts.posts WHERE post_snowflake = $1 FOR UPDATE")
            .bind(post.id.to_db())
            .fetch_optional(&mut *transaction)
            .await?
            .ok_or(DbError::MissingPost(post.id))?;

        query("DELETE FROM posts.likes WHERE post_snowflake = $1")
            .bind(post.id.to_db())
            .execute(&mut *transaction)
            .await?;

        query("DELETE FROM posts.comments WHERE post_snowflake = $1")
            .bind(post.id.to_db())
            .execute(&mut *transaction)
            .await?;

        for (position, like) in (0_i32..).zip(&post.likes) {
            query(
                "
                INSERT INTO posts.likes (post_snowflake, position, user_snowflake)
                VALUES ($1, $2, $3)
                ",
            )
            .bind(post.id.to_db())
            .bind(position)
            .bind(like.user.to_db())
            .execute(&mut *transaction)
            .await?;
        }

        for (position, comment) in (0_i32..).zip(&post.comments) {
            query(
                "
                INSERT INTO posts.comments
                    (comment_snowflake, post_snowflake, position, user_snowflake,
                     text, name, avatar, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ",
            )
            .bind(comment.id.to_db())
            .bind(post.id.to_db())
            .bind(position)
            .bind(comment.user.to_db())
            .bind(&comment.text)
            .bind(&comment.name)
            .bind(&comment.avatar)
            .bind(comment.created_at)
            .execute(&mut *transaction)
            .await?;
        }

        transaction.commit().await?;

        Ok(())
    }

    async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<()> {
        query("DELETE FROM posts.posts WHERE post_snowflake = $1")
            .bind(post_id.to_db())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    fn next_comment_id(&self) -> Result<Id<CommentMarker>> {
        self.ids.next()
    }

    async fn fetch_profile(&self, user: Id<UserMarker>) -> Result<Option<Profile>> {
        let record = query_as::<_, ProfileRecord>(
            "
            SELECT user_snowflake, handle
            FROM profiles.profiles
            WHERE user_snowflake = $1
            ",
        )
        .bind(user.to_db())
        .fetch_optional(&self.pool)
        .await?;

        let profile = record.map(Profile::try_from).transpose()?;
        Ok(profile)
    }

    async fn create_profile(&self, profile: &Profile) -> Result<()> {
        query(
            "
            INSERT INTO profiles.profiles (user_snowflake, handle)
            VALUES ($1, $2)
            ON CONFLICT (user_snowflake) DO NOTHING
            ",
        )
        .bind(profile.user.to_db())
        .bind(profile.handle.get())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn fetch_auth(&self, token_hash: &AuthTokenHash) -> Result<Option<Authentication>> {
        let record = query_as::<_, AuthenticationRecord>(
            "
            SELECT user_snowflake, token_hash, created_at, expires_after_seconds
            FROM auth.authentications
            WHERE token_hash = $1
            ",
        )
        .bind(&token_hash.0[..])
        .fetch_optional(&self.pool)
        .await?;

        let authentication = record.map(Authentication::try_from).transpose()?;
        Ok(authentication)
    }

    async fn create_auth(&self, authentication: &Authentication) -> Result<()> {
        query(
            "
            INSERT INTO auth.authentications
                (token_hash, user_snowflake, created_at, expires_after_seconds)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(&authentication.token_hash.0[..])
        .bind(authentication.user.to_db())
        .bind(authentication.created_at)
        .bind(
            authentication
                .expires_after
                .map(|expires_after| expires_after.whole_seconds()),
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("Database connections closed");
    }
}
