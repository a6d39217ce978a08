//! Bearer token authentication.
//!
//! Tokens are opaque strings provisioned together with the accounts they
//! belong to. A request carries one in the `Authorization: Bearer <token>`
//! header and resolves to the owning account before any write is attempted.

use std::sync::Arc;

use actix_web::http::header;
use actix_web::HttpRequest;

use crate::api::UserId;
use crate::users_repository::UsersRepository;

/// Identity of the caller, resolved from a valid token.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub username: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Authentication required")]
    MissingToken,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Authentication backend failure: {0}")]
    Backend(String),
}

#[async_trait::async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, token: &str) -> Result<AuthenticatedUser, AuthError>;
}

/// Authenticator backed by the accounts of the entity store.
pub struct TokenAuthenticator {
    users: Arc<dyn UsersRepository>,
}

impl TokenAuthenticator {
    pub fn new(users: Arc<dyn UsersRepository>) -> Self {
        Self { users }
    }
}

#[async_trait::async_trait]
impl Authenticator for TokenAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        match self.users.find_user_by_token(token).await {
            Ok(Some(account)) => Ok(AuthenticatedUser {
                user_id: account.id,
                username: account.username,
            }),
            Ok(None) => Err(AuthError::InvalidToken),
            Err(err) => Err(AuthError::Backend(err.to_string())),
        }
    }
}

/// Extracts the bearer token from the `Authorization` header.
pub fn bearer_token(req: &HttpRequest) -> Result<&str, AuthError> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AuthError::MissingToken)
}

pub async fn authenticate_request(
    req: &HttpRequest,
    authenticator: &dyn Authenticator,
) -> Result<AuthenticatedUser, AuthError> {
    authenticator.authenticate(bearer_token(req)?).await
}
