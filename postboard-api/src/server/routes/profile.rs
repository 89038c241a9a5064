use crate::server::{ServerRouter, json::Json, routes::Message};
use axum::Router;
use axum_extra::routing::{RouterExt, TypedPath};

pub fn routes() -> ServerRouter {
    Router::new().typed_get(profile_test)
}

#[derive(TypedPath)]
#[typed_path("/api/profile/test")]
struct ProfileTestPath;

async fn profile_test(_: ProfileTestPath) -> Json<Message> {
    Json(Message {
        msg: "Profile Work.",
    })
}
