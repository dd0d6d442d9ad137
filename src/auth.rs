use axum::{
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};

use crate::errors::ApiError;

/// Identity attached to a request by the authentication collaborator.
///
/// This crate does not authenticate anyone; it only consumes the identity an
/// upstream layer established.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
}

/// Header the deployment's gateway uses to forward the authenticated user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Middleware that lifts the gateway's user-id header into an [`AuthUser`]
/// extension. Requests without the header pass through anonymously; routes
/// that need an identity reject them via [`CurrentUser`].
pub async fn gateway_identity(mut request: Request, next: Next) -> Response {
    let user = request
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|id| !id.is_empty())
        .map(|id| AuthUser { id: id.to_string() });
    if let Some(user) = user {
        request.extensions_mut().insert(user);
    }
    next.run(request).await
}

/// Extractor for the authenticated user's id; rejects with 401 when no
/// identity was attached to the request.
pub struct CurrentUser(pub String);

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .map(|user| CurrentUser(user.id.clone()))
            .ok_or_else(|| {
                ApiError::Unauthorized(
                    "You are not logged in. Please log in to access your account.".to_string(),
                )
            })
    }
}
