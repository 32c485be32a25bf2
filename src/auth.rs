//! Bearer credential verification.
//!
//! The HTTP layer hands the raw `Authorization` header to [`parse_bearer`]
//! and the resulting token to an [`IdentityResolver`]. Resolution is a trait
//! seam so a remote credential service can replace the static table.

use std::collections::HashMap;
use std::fmt;

use futures::future::BoxFuture;
use thiserror::Error;

use crate::config::AuthTokens;
use crate::domain::UserId;

const BEARER_SCHEME: &str = "bearer";

/// Reasons a request fails authentication.
///
/// All variants surface to callers as the same `401`; the distinction only
/// shows up in logs.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("Authorization header is missing")]
    MissingCredential,

    #[error("Authorization header must be 'Bearer <token>'")]
    MalformedCredential,

    #[error("Token is invalid or expired")]
    InvalidToken,
}

/// Extracts the token from an `Authorization` header value.
///
/// The scheme is matched case-insensitively.
///
/// # Errors
///
/// `MissingCredential` when `header` is `None`, `MalformedCredential` for any
/// other scheme or an empty token.
pub fn parse_bearer(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.ok_or(AuthError::MissingCredential)?.trim();

    let (scheme, token) = header
        .split_once(char::is_whitespace)
        .ok_or(AuthError::MalformedCredential)?;
    let token = token.trim();

    if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) || token.is_empty() {
        return Err(AuthError::MalformedCredential);
    }
    Ok(token)
}

/// Maps a bearer token to the user it was issued to.
pub trait IdentityResolver: Send + Sync {
    /// Resolves `token`, failing with `InvalidToken` when it is unknown or
    /// no longer valid.
    fn resolve<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<UserId, AuthError>>;
}

/// Resolver backed by a fixed token table loaded at startup.
#[derive(Clone, Default)]
pub struct StaticTokenResolver {
    tokens: HashMap<String, UserId>,
}

impl StaticTokenResolver {
    #[must_use]
    pub fn new(tokens: AuthTokens) -> Self {
        Self {
            tokens: tokens.into_inner(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl fmt::Debug for StaticTokenResolver {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("StaticTokenResolver")
            .field("tokens", &self.tokens.len())
            .finish()
    }
}

impl IdentityResolver for StaticTokenResolver {
    fn resolve<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<UserId, AuthError>> {
        let resolved = self.tokens.get(token).cloned().ok_or(AuthError::InvalidToken);
        Box::pin(async move { resolved })
    }
}
