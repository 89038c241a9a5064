use crate::server::{
    Result, ServerError, ServerRouter, auth::AuthenticatedUser, json::Json, routes::Message,
};
use axum::{Router, extract::State};
use axum_extra::routing::{RouterExt, TypedPath};
use postboard_common::{
    model::{
        Id,
        post::{Comment, CommentMarker, CreatePost, Post, PostInput, PostMarker},
        profile::UserMarker,
    },
    validation::validate_post_input,
};
use postboard_db::store::PostStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{debug, info};

pub fn routes() -> ServerRouter {
    Router::new()
        .typed_get(posts_test)
        .typed_get(list_posts)
        .typed_post(create_post)
        .typed_get(get_post)
        .typed_delete(delete_post)
        .typed_post(like_post)
        .typed_post(unlike_post)
        .typed_post(add_comment)
        .typed_delete(remove_comment)
}

#[derive(TypedPath)]
#[typed_path("/api/posts/test")]
struct PostsTestPath;

#[derive(TypedPath)]
#[typed_path("/api/posts")]
struct PostsPath;

// Ids stay raw until the handler parses them, so authentication is answered
// first and each route reports malformed ids its own way.

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/posts/{id}", rejection(ServerError))]
struct PostPath {
    id: String,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/posts/like/{id}", rejection(ServerError))]
struct LikePath {
    id: String,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/posts/unlike/{id}", rejection(ServerError))]
struct UnlikePath {
    id: String,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/posts/comment/{id}", rejection(ServerError))]
struct CommentPath {
    id: String,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/posts/comment/{id}/{comment_id}", rejection(ServerError))]
struct RemoveCommentPath {
    id: String,
    comment_id: String,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct DeleteResponse {
    success: bool,
}

async fn posts_test(_: PostsTestPath) -> Json<Message> {
    Json(Message { msg: "Posts Work." })
}

async fn list_posts(
    _: PostsPath,
    State(store): State<Arc<dyn PostStore>>,
) -> Result<Json<Vec<Post>>> {
    let posts = store
        .fetch_posts()
        .await
        .map_err(ServerError::PostListUnavailable)?;

    Ok(Json(posts))
}

async fn get_post(
    PostPath { id }: PostPath,
    State(store): State<Arc<dyn PostStore>>,
) -> Result<Json<Post>> {
    let id: Id<PostMarker> = parse_id(&id).ok_or(ServerError::MalformedLookupId(id))?;
    let post = store
        .fetch_post(id)
        .await
        .map_err(ServerError::PostLookupFailed)?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(post))
}

async fn create_post(
    _: PostsPath,
    State(store): State<Arc<dyn PostStore>>,
    user: AuthenticatedUser,
    Json(input): Json<PostInput>,
) -> Result<Json<Post>> {
    validate_post_input(&input)?;

    let post = store
        .create_post(CreatePost {
            user: user.user_id(),
            input,
        })
        .await
        .map_err(ServerError::CreatePost)?;

    info!(post_id = %post.id, user = %post.user, "Created post");
    Ok(Json(post))
}

async fn delete_post(
    PostPath { id }: PostPath,
    State(store): State<Arc<dyn PostStore>>,
    user: AuthenticatedUser,
) -> Result<Json<DeleteResponse>> {
    look_up_profile(&*store, user.user_id()).await?;
    let post = fetch_existing_post(&*store, id).await?;

    if !post.is_owned_by(user.user_id()) {
        return Err(ServerError::NotPostOwner {
            post: post.id,
            user: user.user_id(),
        });
    }

    store
        .delete_post(post.id)
        .await
        .map_err(ServerError::PostUnavailable)?;

    info!(post_id = %post.id, "Deleted post");
    Ok(Json(DeleteResponse { success: true }))
}

async fn like_post(
    LikePath { id }: LikePath,
    State(store): State<Arc<dyn PostStore>>,
    user: AuthenticatedUser,
) -> Result<Json<Post>> {
    look_up_profile(&*store, user.user_id()).await?;
    let mut post = fetch_existing_post(&*store, id).await?;

    post.add_like(user.user_id())?;
    save(&*store, &post).await?;

    Ok(Json(post))
}

async fn unlike_post(
    UnlikePath { id }: UnlikePath,
    State(store): State<Arc<dyn PostStore>>,
    user: AuthenticatedUser,
) -> Result<Json<Post>> {
    look_up_profile(&*store, user.user_id()).await?;
    let mut post = fetch_existing_post(&*store, id).await?;

    post.remove_like(user.user_id())?;
    save(&*store, &post).await?;

    Ok(Json(post))
}

async fn add_comment(
    CommentPath { id }: CommentPath,
    State(store): State<Arc<dyn PostStore>>,
    user: AuthenticatedUser,
    Json(input): Json<PostInput>,
) -> Result<Json<Post>> {
    validate_post_input(&input)?;

    let mut post = fetch_existing_post(&*store, id).await?;
    let comment_id = store
        .next_comment_id()
        .map_err(ServerError::PostUnavailable)?;

    post.add_comment(Comment::new(
        comment_id,
        user.user_id(),
        input,
        OffsetDateTime::now_utc(),
    ));
    save(&*store, &post).await?;

    debug!(post_id = %post.id, %comment_id, "Added comment");
    Ok(Json(post))
}

/// Any authenticated user may remove any comment.
async fn remove_comment(
    RemoveCommentPath { id, comment_id }: RemoveCommentPath,
    State(store): State<Arc<dyn PostStore>>,
    _user: AuthenticatedUser,
) -> Result<Json<Post>> {
    let mut post = fetch_existing_post(&*store, id).await?;
    let comment_id: Id<CommentMarker> =
        parse_id(&comment_id).ok_or(ServerError::MalformedCommentId(comment_id))?;

    post.remove_comment(comment_id)?;
    save(&*store, &post).await?;

    debug!(post_id = %post.id, %comment_id, "Removed comment");
    Ok(Json(post))
}

/// The profile is fetched before mutating a post, but a missing one does not
/// stop the request.
async fn look_up_profile(store: &dyn PostStore, user: Id<UserMarker>) -> Result<()> {
    let profile = store
        .fetch_profile(user)
        .await
        .map_err(ServerError::PostUnavailable)?;

    if profile.is_none() {
        debug!(%user, "User has no profile");
    }

    Ok(())
}

fn parse_id<Marker>(raw: &str) -> Option<Id<Marker>> {
    raw.parse::<u64>().ok().map(Id::from)
}

/// A malformed id is reported like a missing post.
async fn fetch_existing_post(store: &dyn PostStore, id: String) -> Result<Post> {
    let id: Id<PostMarker> = parse_id(&id).ok_or(ServerError::MalformedPostId(id))?;
    store
        .fetch_post(id)
        .await
        .map_err(ServerError::PostUnavailable)?
        .ok_or(ServerError::PostNotFound(id))
}

async fn save(store: &dyn PostStore, post: &Post) -> Result<()> {
    store
        .save_post(post)
        .await
        .map_err(ServerError::PostUnavailable)
}
