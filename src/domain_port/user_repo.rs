use crate::context::RequestContext;
use crate::domain_model::*;
use crate::domain_port::RepoError;
use chrono::{DateTime, Utc};

/// Persistence for users and their refresh token record.
///
/// Implementations own both kinds of state and serialize concurrent writes to
/// the same user's record; callers assume last-write-wins.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait UserRepo: Send + Sync {
    async fn get_by_id(&self, ctx: &RequestContext, user_id: UserId) -> Result<User, RepoError>;

    async fn get_by_oauth_id(&self, ctx: &RequestContext, oauth_id: &str)
    -> Result<User, RepoError>;

    /// Storage assigns the id. Fails with `Conflict` if the OAuth id is taken.
    async fn create(&self, ctx: &RequestContext, user: NewUser) -> Result<UserId, RepoError>;

    /// Removes the user record only.
    async fn delete(&self, ctx: &RequestContext, user_id: UserId) -> Result<(), RepoError>;

    /// Withdrawal: removes the user together with everything owned by it.
    async fn delete_user(&self, ctx: &RequestContext, user_id: UserId) -> Result<(), RepoError>;

    /// Upsert. Fails with `NotFound` if the user does not exist.
    async fn save_refresh_token(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepoError>;

    async fn get_refresh_token(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
    ) -> Result<RefreshTokenRecord, RepoError>;

    /// Removing an absent record succeeds.
    async fn remove_refresh_token(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
    ) -> Result<(), RepoError>;
}
