use axum::{
    Router,
    extract::{
        FromRef, Request,
        rejection::{JsonRejection, PathRejection},
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use axum_extra::typed_header::TypedHeaderRejection;
use postboard_common::{
    model::{
        Id,
        auth::{AuthTokenDecodeError, AuthTokenHashError},
        post::{CommentNotFoundError, LikeError, PostMarker},
        profile::UserMarker,
    },
    validation::ValidationErrors,
};
use postboard_db::store::{DbError, PostStore};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::error;

mod auth;
mod json;
mod routes;


pub type ServerRouter = Router<ServerState>;

#[derive(Clone, FromRef)]
pub struct ServerState {
    pub store: Arc<dyn PostStore>,
}

pub fn routes() -> ServerRouter {
    routes::routes()
        .fallback(fallback)
        .method_not_allowed_fallback(fallback)
}

/// The complete application, ready to be served.
pub fn app(state: ServerState) -> Router {
    routes().with_state(state).layer(TraceLayer::new_for_http())
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

const POST_LOOKUP_FAILED: &str = "Post doesn't exist with that ID";
const POST_NOT_FOUND: &str = "Post not found.";
const COMMENT_NOT_FOUND: &str = "Comment doesn't exist";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error("Authorization header was missing or invalid: {0}")]
    InvalidAuthorizationHeader(TypedHeaderRejection),
    #[error("The provided auth token could not be decoded: {0}")]
    InvalidAuthToken(#[from] AuthTokenDecodeError),
    #[error("The auth token could not be hashed: {0}")]
    AuthTokenHash(#[from] AuthTokenHashError),
    #[error("Provided token was invalid")]
    InvalidToken,
    #[error("Looking up the authentication failed: {0}")]
    AuthLookup(DbError),
    #[error("Invalid post input: {0}")]
    Validation(#[from] ValidationErrors),
    #[error("Listing posts failed: {0}")]
    PostListUnavailable(DbError),
    #[error("Fetching a post failed: {0}")]
    PostLookupFailed(DbError),
    #[error("Post id {0:?} is not a valid id")]
    MalformedLookupId(String),
    #[error("Post with id {0} was not found.")]
    PostByIdNotFound(Id<PostMarker>),
    #[error("Post id {0:?} is not a valid id")]
    MalformedPostId(String),
    #[error("Post with id {0} was not found.")]
    PostNotFound(Id<PostMarker>),
    #[error("Store failed while changing a post: {0}")]
    PostUnavailable(DbError),
    #[error("Creating a post failed: {0}")]
    CreatePost(DbError),
    #[error("User {user} does not own post {post}")]
    NotPostOwner {
        post: Id<PostMarker>,
        user: Id<UserMarker>,
    },
    #[error(transparent)]
    Like(#[from] LikeError),
    #[error(transparent)]
    CommentNotFound(#[from] CommentNotFoundError),
    #[error("Comment id {0:?} is not a valid id")]
    MalformedCommentId(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PathRejection(_)
            | ServerError::PostListUnavailable(_)
            | ServerError::PostLookupFailed(_)
            | ServerError::MalformedLookupId(_)
            | ServerError::PostNotFound(_)
            | ServerError::MalformedPostId(_)
            | ServerError::PostUnavailable(_)
            | ServerError::CommentNotFound(_)
            | ServerError::MalformedCommentId(_) => StatusCode::NOT_FOUND,
            ServerError::InvalidAuthorizationHeader(_)
            | ServerError::InvalidAuthToken(_)
            | ServerError::InvalidToken
            | ServerError::NotPostOwner { .. } => StatusCode::UNAUTHORIZED,
            ServerError::JsonRejection(_)
            | ServerError::Validation(_)
            | ServerError::PostByIdNotFound(_)
            | ServerError::Like(_) => StatusCode::BAD_REQUEST,
            ServerError::JsonResponse(_)
            | ServerError::AuthTokenHash(_)
            | ServerError::AuthLookup(_)
            | ServerError::CreatePost(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(self) -> ErrorResponse {
        match self {
            ServerError::UnknownRoute(_) | ServerError::JsonRejection(_) => {
                ErrorResponse::Errors(self.to_string())
            }
            ServerError::PathRejection(_)
            | ServerError::PostListUnavailable(_)
            | ServerError::PostLookupFailed(_)
            | ServerError::MalformedLookupId(_) => ErrorResponse::Errors(POST_LOOKUP_FAILED.into()),
            ServerError::PostNotFound(_)
            | ServerError::MalformedPostId(_)
            | ServerError::PostUnavailable(_) => ErrorResponse::Errors(POST_NOT_FOUND.into()),
            ServerError::InvalidAuthorizationHeader(_)
            | ServerError::InvalidAuthToken(_)
            | ServerError::InvalidToken => ErrorResponse::Errors("Unauthorized".into()),
            ServerError::NotPostOwner { .. } => ErrorResponse::Errors("Not Authorized".into()),
            ServerError::Like(error) => ErrorResponse::Errors(error.to_string()),
            ServerError::PostByIdNotFound(_) => ErrorResponse::Post("Post doesn't exist".into()),
            ServerError::CommentNotFound(error) => ErrorResponse::Comment(error.to_string()),
            ServerError::MalformedCommentId(_) => ErrorResponse::Comment(COMMENT_NOT_FOUND.into()),
            ServerError::Validation(errors) => ErrorResponse::Fields(errors),
            ServerError::JsonResponse(_)
            | ServerError::AuthTokenHash(_)
            | ServerError::AuthLookup(_)
            | ServerError::CreatePost(_) => ErrorResponse::Errors("Internal server error".into()),
        }
    }
}

/// Serializes as `{ "errors": ... }`, `{ "post": ... }`, `{ "comment": ... }`
/// or a flat field map.
#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum ErrorResponse {
    Errors(String),
    Post(String),
    Comment(String),
    #[serde(untagged)]
    Fields(ValidationErrors),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        error!(error = %self, %status, "Replying with error");

        json::reply(status, &self.body())
    }
}
