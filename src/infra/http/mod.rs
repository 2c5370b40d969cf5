//! Public and admin HTTP surfaces.

mod admin;
mod middleware;
mod public;

pub use admin::{AdminState, build_admin_router};
pub use middleware::{REQUEST_ID_HEADER, RequestContext};
pub use public::{HttpState, build_router};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::application::error::HttpError;

async fn not_found() -> Response {
    HttpError::new(
        "infra::http::not_found",
        StatusCode::NOT_FOUND,
        "Not found",
        "no route matched the request",
    )
    .into_response()
}
