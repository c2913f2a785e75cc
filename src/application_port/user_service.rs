use crate::context::{ContextError, RequestContext};
use crate::domain_model::*;
use crate::domain_port::{OAuthError, RepoError};
use chrono::{DateTime, Utc};

/// Coarse error class surfaced to adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    NotFound,
    Conflict,
    Timeout,
    Server,
}

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("ID Token: failed to load user info from the OAuth provider")]
    IdToken(#[source] OAuthError),
    #[error("Access Token: failed to load user info from the OAuth provider")]
    AccessToken(#[source] OAuthError),
    #[error("Refresh Token: failed to read the stored token")]
    RefreshTokenLookup(#[source] RepoError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl UserError {
    pub fn code(&self) -> ErrorCode {
        match self {
            UserError::IdToken(_) | UserError::AccessToken(_) => ErrorCode::NotFound,
            UserError::RefreshTokenLookup(_) => ErrorCode::Server,
            UserError::Repo(RepoError::NotFound { .. }) => ErrorCode::NotFound,
            UserError::Repo(RepoError::Conflict { .. }) => ErrorCode::Conflict,
            UserError::Repo(RepoError::Context(_)) => ErrorCode::Timeout,
            UserError::Repo(RepoError::Store(_)) => ErrorCode::Server,
        }
    }

    /// The context error at the root of this failure, if any.
    pub fn context_error(&self) -> Option<ContextError> {
        match self {
            UserError::IdToken(OAuthError::Context(e))
            | UserError::AccessToken(OAuthError::Context(e))
            | UserError::RefreshTokenLookup(RepoError::Context(e))
            | UserError::Repo(RepoError::Context(e)) => Some(*e),
            _ => None,
        }
    }
}

/// Identity and session lifecycle of local users.
#[async_trait::async_trait]
pub trait UserService: Send + Sync {
    async fn get_profile(&self, ctx: &RequestContext, user_id: UserId)
    -> Result<Profile, UserError>;

    /// Verifies both provider tokens, then persists a new user.
    async fn create_user(
        &self,
        ctx: &RequestContext,
        id_token: &str,
        access_token: &str,
    ) -> Result<UserId, UserError>;

    async fn delete_user(&self, ctx: &RequestContext, user_id: UserId) -> Result<(), UserError>;

    async fn get_user_by_oauth_id(
        &self,
        ctx: &RequestContext,
        oauth_id: &str,
    ) -> Result<User, UserError>;

    async fn save_refresh_token(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        refresh_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), UserError>;

    /// Exact comparison against the stored token. Expiry is not checked here.
    async fn validate_stored_refresh_token(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        refresh_token: &str,
    ) -> Result<bool, UserError>;

    async fn withdraw_user(&self, ctx: &RequestContext, user_id: UserId)
    -> Result<(), UserError>;

    async fn logout(&self, ctx: &RequestContext, user_id: UserId) -> Result<(), UserError>;
}
