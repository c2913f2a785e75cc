use crate::context::RequestContext;
use crate::domain_model::*;
use crate::domain_port::RepoError;

/// Keyed by user id, at most one record per user.
#[async_trait::async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn save(&self, ctx: &RequestContext, record: &RefreshTokenRecord)
    -> Result<(), RepoError>;

    async fn get(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
    ) -> Result<RefreshTokenRecord, RepoError>;

    async fn remove(&self, ctx: &RequestContext, user_id: UserId) -> Result<(), RepoError>;
}
