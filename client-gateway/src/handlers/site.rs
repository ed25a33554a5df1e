use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use service_core::error::AppError;

pub const STAFF_PORTAL_PREFIX: &str = "/staff-portal";

/// The staff portal is served by the orchestrator, not here. Anything under
/// the prefix is a miss, whatever the method or the rest of the path.
pub async fn staff_portal_guard(request: Request, next: Next) -> Response {
    if request.uri().path().starts_with(STAFF_PORTAL_PREFIX) {
        return AppError::NotFound("Staff portal not available on this service".to_string())
            .into_response();
    }

    next.run(request).await
}
