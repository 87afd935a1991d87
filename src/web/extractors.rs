//! Request extractors.
//!
//! The caller's identity arrives in the `X-User-Id` header, already authenticated
//! upstream. This layer only resolves it to a stored account.

use crate::{
    core::user as users,
    entities::user,
    errors::{Error, Result},
    web::AppState,
};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use std::convert::Infallible;

/// Header carrying the authenticated user id
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header set by incremental-update requests
pub const HX_REQUEST_HEADER: &str = "hx-request";

fn header_user_id(parts: &Parts) -> Option<i64> {
    parts
        .headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

async fn resolve(parts: &Parts, state: &AppState) -> Result<Option<user::Model>> {
    match header_user_id(parts) {
        Some(id) => users::get_user_by_id(&state.db, id).await,
        None => Ok(None),
    }
}

/// The authenticated caller. Rejects with 401 when the header is missing, malformed
/// or names an unknown user.
pub struct CurrentUser(pub user::Model);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        resolve(parts, state)
            .await?
            .map(Self)
            .ok_or(Error::Unauthenticated)
    }
}

/// The caller when one is identified, for pages anonymous visitors may see.
pub struct MaybeUser(pub Option<user::Model>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        Ok(Self(resolve(parts, state).await?))
    }
}

/// Whether the request asked for a partial update (`HX-Request: true`).
pub struct HxRequest(pub bool);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for HxRequest {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let is_hx = parts
            .headers
            .get(HX_REQUEST_HEADER)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.eq_ignore_ascii_case("true"));
        Ok(Self(is_hx))
    }
}
