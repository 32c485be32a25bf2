//! Authenticated caller extractor.
//!
//! Any handler taking [`AuthenticatedUser`] is unreachable without a valid
//! bearer token: extraction fails with `401` before the handler runs.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::auth::{AuthError, parse_bearer};
use crate::domain::UserId;

use super::error::ApiErrorResponse;
use super::handlers::AppState;

/// The verified identity of the caller.
///
/// The resolved [`UserId`] is also stored in the request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub UserId);

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ApiErrorResponse;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .map(|value| value.to_str().map_err(|_| AuthError::MalformedCredential))
            .transpose()?;
        let token = parse_bearer(header)?.to_owned();

        let user_id = state.identity_resolver.resolve(&token).await?;
        tracing::debug!(%user_id, "Request authenticated");

        parts.extensions.insert(user_id.clone());
        Ok(Self(user_id))
    }
}
