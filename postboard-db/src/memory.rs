use crate::store::{DbError, IdSource, PostStore, Result};
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
use std::{
    cmp::Reverse,
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};
use time::OffsetDateTime;
use tracing::debug;

#[derive(Default)]
struct Collections {
    posts: HashMap<Id<PostMarker>, Post>,
    profiles: HashMap<Id<UserMarker>, Profile>,
    authentications: Vec<Authentication>,
}

/// Process-local store. Data lives as long as the value does.
pub struct MemoryStore {
    collections: Mutex<Collections>,
    ids: IdSource,
}

impl MemoryStore {
    #[must_use]
    pub fn new(worker_id: WorkerId, process_id: ProcessId) -> Self {
        Self {
            collections: Mutex::default(),
            ids: IdSource::new(worker_id, process_id),
        }
    }

    fn collections(&self) -> MutexGuard<'_, Collections> {
        self.collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(WorkerId::default(), ProcessId::default())
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn fetch_posts(&self) -> Result<Vec<Post>> {
        let mut posts: Vec<Post> = self.collections().posts.values().cloned().collect();
        // Ids break ties between posts created in the same instant.
        posts.sort_by_key(|post| Reverse((post.date, post.id)));

        Ok(posts)
    }

    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        Ok(self.collections().posts.get(&post_id).cloned())
    }

    async fn create_post(&self, post: CreatePost) -> Result<Post> {
        let post = Post {
            id: self.ids.next()?,
            user: post.user,
            text: post.input.text,
            name: post.input.name,
            avatar: post.input.avatar,
            likes: Vec::new(),
            comments: Vec::new(),
            date: OffsetDateTime::now_utc(),
        };

        debug!(post_id = %post.id, user = %post.user, "Storing new post in memory");
        self.collections().posts.insert(post.id, post.clone());

        Ok(post)
    }

    async fn save_post(&self, post: &Post) -> Result<()> {
        let mut collections = self.collections();
        let stored = collections
            .posts
            .get_mut(&post.id)
            .ok_or(DbError::MissingPost(post.id))?;

        stored.likes.clone_from(&post.likes);
        stored.comments.clone_from(&post.comments);

        Ok(())
    }

    async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<()> {
        self.collections().posts.remove(&post_id);

        Ok(())
    }

    fn next_comment_id(&self) -> Result<Id<CommentMarker>> {
        self.ids.next()
    }

    async fn fetch_profile(&self, user: Id<UserMarker>) -> Result<Option<Profile>> {
        Ok(self.collections().profiles.get(&user).cloned())
    }

    async fn create_profile(&self, profile: &Profile) -> Result<()> {
        self.collections()
            .profiles
            .entry(profile.user)
            .or_insert_with(|| profile.clone());

        Ok(())
    }

    async fn fetch_auth(&self, token_hash: &AuthTokenHash) -> Result<Option<Authentication>> {
        let authentication = self
            .collections()
            .authentications
            .iter()
            .find(|authentication| authentication.token_hash == *token_hash)
            .cloned();

        Ok(authentication)
    }

    async fn create_auth(&self, authentication: &Authentication) -> Result<()> {
        self.collections()
            .authentications
            .push(authentication.clone());

        Ok(())
    }

    async fn close(&self) {
        debug!("Dropping in-memory store contents");
        *self.collections() = Collections::default();
    }
}
