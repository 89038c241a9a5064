use crate::server::ServerRouter;
use axum::{Router, routing::get};
use serde::Serialize;

mod posts;
mod profile;

pub fn routes() -> ServerRouter {
    Router::new()
        .route("/", get(|| async { "Hello" }))
        .merge(posts::routes())
        .merge(profile::routes())
}

/// Acknowledgment returned by the `/test` routes.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct Message {
    msg: &'static str,
}
