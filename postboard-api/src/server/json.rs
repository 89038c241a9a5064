use crate::server::ServerError;
use axum::{
    Json as AxumJson,
    extract::FromRequest,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::TypedHeader;
use headers::ContentType;
use serde::Serialize;
use tracing::error;

/// Request bodies that fail to parse become [`ServerError::JsonRejection`].
#[derive(FromRequest, Debug, Clone, Copy, Default)]
#[from_request(via(AxumJson), rejection(ServerError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        reply(StatusCode::OK, &self.0)
    }
}

/// Serializes `body` with the given status. An error body that fails to
/// serialize becomes a bare 500.
pub(super) fn reply<T: Serialize>(status: StatusCode, body: &T) -> Response {
    match serde_json::to_vec(body) {
        Ok(json) => (status, TypedHeader(ContentType::json()), json).into_response(),
        Err(err) if status.is_success() => ServerError::JsonResponse(err).into_response(),
        Err(err) => {
            error!(%err, body = std::any::type_name::<T>(), "Error body not serializable");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
