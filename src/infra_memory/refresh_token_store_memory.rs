use crate::context::RequestContext;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::Utc;
use dashmap::DashMap;

/// Process-local token records. Expired records read as absent and are
/// dropped on the next save.
#[derive(Default)]
pub struct MemoryRefreshTokenStore {
    records: DashMap<UserId, RefreshTokenRecord>,
}

impl MemoryRefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl RefreshTokenStore for MemoryRefreshTokenStore {
    async fn save(
        &self,
        ctx: &RequestContext,
        record: &RefreshTokenRecord,
    ) -> Result<(), RepoError> {
        ctx.check()?;
        let now = Utc::now();
        self.records.retain(|_, r| !r.is_expired_at(now));
        self.records.insert(record.user_id, record.clone());
        Ok(())
    }

    async fn get(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
    ) -> Result<RefreshTokenRecord, RepoError> {
        ctx.check()?;
        let record = match self.records.get(&user_id) {
            Some(r) if !r.value().is_expired_at(Utc::now()) => r.value().clone(),
            _ => {
                return Err(RepoError::NotFound {
                    entity: "refresh token",
                });
            }
        };

        Ok(record)
    }

    async fn remove(&self, ctx: &RequestContext, user_id: UserId) -> Result<(), RepoError> {
        ctx.check()?;
        self.records.remove(&user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextError;
    use chrono::Duration;

    fn record(user_id: UserId, token: &str, ttl: Duration) -> RefreshTokenRecord {
        RefreshTokenRecord {
            user_id,
            token: token.to_string(),
            expires_at: Utc::now() + ttl,
        }
    }

    #[tokio::test]
    async fn expired_record_reads_as_absent() {
        let store = MemoryRefreshTokenStore::new();
        let ctx = RequestContext::background();
        let user_id = UserId::new_v4();

        store
            .save(&ctx, &record(user_id, "old", Duration::seconds(-1)))
            .await
            .unwrap();

        let err = store.get(&ctx, user_id).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn saving_drops_expired_records() {
        let store = MemoryRefreshTokenStore::new();
        let ctx = RequestContext::background();
        let stale = UserId::new_v4();
        let live = UserId::new_v4();

        store
            .save(&ctx, &record(stale, "old", Duration::seconds(-1)))
            .await
            .unwrap();
        store
            .save(&ctx, &record(live, "new", Duration::days(1)))
            .await
            .unwrap();

        assert_eq!(store.records.len(), 1);
        assert!(store.records.contains_key(&live));
    }

    #[tokio::test]
    async fn finished_context_leaves_store_untouched() {
        let store = MemoryRefreshTokenStore::new();
        let user_id = UserId::new_v4();
        let expired = RequestContext::with_timeout(std::time::Duration::ZERO);

        let err = store
            .save(&expired, &record(user_id, "tok", Duration::days(1)))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RepoError::Context(ContextError::DeadlineExceeded)
        ));

        let err = store
            .get(&RequestContext::background(), user_id)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
