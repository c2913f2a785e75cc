use crate::application_port::UserError;
use crate::context::RequestContext;
use crate::domain_model::UserId;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    User(#[from] UserError),
    #[error("token invalid")]
    TokenInvalid,
    #[error("token expired")]
    TokenExpired,
    #[error("internal error: {0}")]
    InternalError(String),
}

#[derive(Debug, Clone)]
pub struct LoginInput {
    pub id_token: String,
    pub access_token: String,
}

#[derive(Debug, Clone)]
pub struct LoginResult {
    pub user_id: UserId,
    pub is_new_user: bool,
    pub tokens: AuthTokens,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessToken(pub String);

#[derive(Debug, Clone, Serialize)]
pub struct RefreshToken(pub String);

#[derive(Debug, Clone, Serialize)]
pub struct AuthTokens {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct TokenVerifyResult {
    pub user_id: UserId,
    pub jti: String,
}

#[async_trait::async_trait]
pub trait TokenCodec: Send + Sync {
    async fn issue_access_token(
        &self,
        user: UserId,
    ) -> Result<(AccessToken, DateTime<Utc>), SessionError>;
    async fn issue_refresh_token(
        &self,
        user: UserId,
    ) -> Result<(RefreshToken, DateTime<Utc>), SessionError>;
    async fn verify_access_token(
        &self,
        token: &AccessToken,
    ) -> Result<TokenVerifyResult, SessionError>;
    async fn verify_refresh_token(
        &self,
        token: &RefreshToken,
    ) -> Result<TokenVerifyResult, SessionError>;
}

/// Login, token renewal and request authentication on top of [`UserService`].
///
/// [`UserService`]: crate::application_port::UserService
#[async_trait::async_trait]
pub trait SessionService: Send + Sync {
    async fn login(&self, ctx: &RequestContext, input: LoginInput)
    -> Result<LoginResult, SessionError>;
    async fn refresh(
        &self,
        ctx: &RequestContext,
        refresh_token: &str,
    ) -> Result<AuthTokens, SessionError>;
    async fn authenticate(
        &self,
        ctx: &RequestContext,
        access_token: &str,
    ) -> Result<UserId, SessionError>;
}
