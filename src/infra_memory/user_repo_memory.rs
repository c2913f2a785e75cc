use super::MemoryRefreshTokenStore;
use crate::context::RequestContext;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// In-process user store for development and tests.
#[derive(Default)]
pub struct MemoryUserRepo {
    users: DashMap<UserId, User>,
    oauth_index: DashMap<String, UserId>,
    tokens: MemoryRefreshTokenStore,
}

impl MemoryUserRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    fn user_not_found() -> RepoError {
        RepoError::NotFound { entity: "user" }
    }

    fn remove_user(&self, user_id: UserId) -> Result<(), RepoError> {
        let (_, user) = self
            .users
            .remove(&user_id)
            .ok_or_else(Self::user_not_found)?;
        self.oauth_index.remove(&user.oauth_id);
        Ok(())
    }
}

#[async_trait::async_trait]
impl UserRepo for MemoryUserRepo {
    async fn get_by_id(&self, ctx: &RequestContext, user_id: UserId) -> Result<User, RepoError> {
        ctx.check()?;
        self.users
            .get(&user_id)
            .map(|u| u.value().clone())
            .ok_or_else(Self::user_not_found)
    }

    async fn get_by_oauth_id(
        &self,
        ctx: &RequestContext,
        oauth_id: &str,
    ) -> Result<User, RepoError> {
        ctx.check()?;
        let user_id = self
            .oauth_index
            .get(oauth_id)
            .map(|id| *id.value())
            .ok_or_else(Self::user_not_found)?;
        self.get_by_id(ctx, user_id).await
    }

    async fn create(&self, ctx: &RequestContext, user: NewUser) -> Result<UserId, RepoError> {
        ctx.check()?;
        let user_id = UserId::new_v4();

        match self.oauth_index.entry(user.oauth_id.clone()) {
            Entry::Occupied(_) => return Err(RepoError::Conflict { entity: "user" }),
            Entry::Vacant(slot) => {
                self.users.insert(
                    user_id,
                    User {
                        user_id,
                        oauth_id: user.oauth_id,
                        name: user.name,
                        created_at: Utc::now(),
                    },
                );
                slot.insert(user_id);
            }
        }

        Ok(user_id)
    }

    async fn delete(&self, ctx: &RequestContext, user_id: UserId) -> Result<(), RepoError> {
        ctx.check()?;
        self.remove_user(user_id)
    }

    async fn delete_user(&self, ctx: &RequestContext, user_id: UserId) -> Result<(), RepoError> {
        ctx.check()?;
        if !self.users.contains_key(&user_id) {
            return Err(Self::user_not_found());
        }
        self.tokens.remove(ctx, user_id).await?;
        self.remove_user(user_id)
    }

    async fn save_refresh_token(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepoError> {
        ctx.check()?;
        if !self.users.contains_key(&user_id) {
            return Err(Self::user_not_found());
        }
        let record = RefreshTokenRecord {
            user_id,
            token: token.to_string(),
            expires_at,
        };
        self.tokens.save(ctx, &record).await
    }

    async fn get_refresh_token(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
    ) -> Result<RefreshTokenRecord, RepoError> {
        self.tokens.get(ctx, user_id).await
    }

    async fn remove_refresh_token(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
    ) -> Result<(), RepoError> {
        self.tokens.remove(ctx, user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_user(oauth_id: &str, name: &str) -> NewUser {
        NewUser {
            oauth_id: oauth_id.to_string(),
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn oauth_id_maps_to_one_user() {
        let repo = MemoryUserRepo::new();
        let ctx = RequestContext::background();

        let id = repo.create(&ctx, new_user("kakao-1", "A")).await.unwrap();
        let err = repo.create(&ctx, new_user("kakao-1", "B")).await.unwrap_err();
        assert!(matches!(err, RepoError::Conflict { .. }));

        let user = repo.get_by_oauth_id(&ctx, "kakao-1").await.unwrap();
        assert_eq!(user.user_id, id);
        assert_eq!(user.name, "A");
    }

    #[tokio::test]
    async fn bare_delete_keeps_token_record() {
        let repo = MemoryUserRepo::new();
        let ctx = RequestContext::background();
        let id = repo.create(&ctx, new_user("kakao-1", "A")).await.unwrap();
        repo.save_refresh_token(&ctx, id, "tok", Utc::now() + Duration::days(1))
            .await
            .unwrap();

        repo.delete(&ctx, id).await.unwrap();

        assert!(repo.get_by_id(&ctx, id).await.unwrap_err().is_not_found());
        assert!(repo.get_by_oauth_id(&ctx, "kakao-1").await.is_err());
        assert_eq!(repo.get_refresh_token(&ctx, id).await.unwrap().token, "tok");
    }

    #[tokio::test]
    async fn withdrawal_cascades_to_token_record() {
        let repo = MemoryUserRepo::new();
        let ctx = RequestContext::background();
        let id = repo.create(&ctx, new_user("kakao-1", "A")).await.unwrap();
        repo.save_refresh_token(&ctx, id, "tok", Utc::now() + Duration::days(1))
            .await
            .unwrap();

        repo.delete_user(&ctx, id).await.unwrap();

        assert!(repo.get_refresh_token(&ctx, id).await.unwrap_err().is_not_found());
        assert!(repo.delete_user(&ctx, id).await.unwrap_err().is_not_found());

        // the subject can register again and receives a fresh id
        let again = repo.create(&ctx, new_user("kakao-1", "A")).await.unwrap();
        assert_ne!(again, id);
    }
}
