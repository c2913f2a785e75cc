use crate::application_port::{UserError, UserService};
use crate::context::RequestContext;
use crate::domain_model::*;
use crate::domain_port::{OAuthProvider, UserRepo};
use crate::logger::*;
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub struct RealUserService {
    user_repo: Arc<dyn UserRepo>,
    oauth: Arc<dyn OAuthProvider>,
}

impl RealUserService {
    pub fn new(user_repo: Arc<dyn UserRepo>, oauth: Arc<dyn OAuthProvider>) -> RealUserService {
        RealUserService { user_repo, oauth }
    }
}

#[async_trait::async_trait]
impl UserService for RealUserService {
    async fn get_profile(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
    ) -> Result<Profile, UserError> {
        let user = self.user_repo.get_by_id(ctx, user_id).await?;
        Ok(Profile::from(&user))
    }

    async fn create_user(
        &self,
        ctx: &RequestContext,
        id_token: &str,
        access_token: &str,
    ) -> Result<UserId, UserError> {
        let oauth_id = self
            .oauth
            .verify_identity_token(ctx, id_token)
            .await
            .map_err(|e| {
                warn!(error = %e, "identity token verification failed");
                UserError::IdToken(e)
            })?;

        let profile = self
            .oauth
            .fetch_profile(ctx, access_token)
            .await
            .map_err(|e| {
                warn!(error = %e, "profile fetch failed");
                UserError::AccessToken(e)
            })?;

        let user = NewUser {
            oauth_id,
            name: profile.nickname,
        };
        let user_id = self.user_repo.create(ctx, user).await?;
        info!(%user_id, "user created");

        Ok(user_id)
    }

    async fn delete_user(&self, ctx: &RequestContext, user_id: UserId) -> Result<(), UserError> {
        self.user_repo.delete(ctx, user_id).await?;
        info!(%user_id, "user deleted");
        Ok(())
    }

    async fn get_user_by_oauth_id(
        &self,
        ctx: &RequestContext,
        oauth_id: &str,
    ) -> Result<User, UserError> {
        let user = self.user_repo.get_by_oauth_id(ctx, oauth_id).await?;
        Ok(user)
    }

    async fn save_refresh_token(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        refresh_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), UserError> {
        self.user_repo
            .save_refresh_token(ctx, user_id, refresh_token, expires_at)
            .await?;
        debug!(%user_id, %expires_at, "refresh token saved");
        Ok(())
    }

    async fn validate_stored_refresh_token(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        refresh_token: &str,
    ) -> Result<bool, UserError> {
        let stored = self
            .user_repo
            .get_refresh_token(ctx, user_id)
            .await
            .map_err(UserError::RefreshTokenLookup)?;

        Ok(stored.token == refresh_token)
    }

    async fn withdraw_user(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
    ) -> Result<(), UserError> {
        self.user_repo.delete_user(ctx, user_id).await?;
        info!(%user_id, "user withdrawn");
        Ok(())
    }

    async fn logout(&self, ctx: &RequestContext, user_id: UserId) -> Result<(), UserError> {
        self.user_repo.remove_refresh_token(ctx, user_id).await?;
        info!(%user_id, "user logged out");
        Ok(())
    }
}
