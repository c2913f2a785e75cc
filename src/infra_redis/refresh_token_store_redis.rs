use crate::context::RequestContext;
use crate::domain_model::*;
use crate::domain_port::*;
use anyhow::anyhow;
use chrono::DateTime;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

/// One hash per user holding `token` and `expires_at`, expiring with the record.
pub struct RedisRefreshTokenStore {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisRefreshTokenStore {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        RedisRefreshTokenStore {
            conn,
            prefix: prefix.into(),
        }
    }

    fn key(&self, user_id: UserId) -> String {
        format!("{}:{}", self.prefix, user_id)
    }
}

#[async_trait::async_trait]
impl RefreshTokenStore for RedisRefreshTokenStore {
    async fn save(
        &self,
        ctx: &RequestContext,
        record: &RefreshTokenRecord,
    ) -> Result<(), RepoError> {
        let key = self.key(record.user_id);
        let expires_at = record.expires_at.timestamp();
        let fields = [
            ("token", record.token.clone()),
            ("expires_at", expires_at.to_string()),
        ];

        let mut pipe = redis::pipe();
        pipe.atomic()
            .del(&key)
            .ignore()
            .hset_multiple(&key, &fields)
            .ignore()
            .expire_at(&key, expires_at)
            .ignore();

        let mut conn = self.conn.clone();
        let _: () = ctx
            .run(pipe.query_async(&mut conn))
            .await?
            .map_err(RepoError::store)?;
        Ok(())
    }

    async fn get(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
    ) -> Result<RefreshTokenRecord, RepoError> {
        let key = self.key(user_id);
        let mut conn = self.conn.clone();

        let mut cmd = redis::cmd("HMGET");
        cmd.arg(&key).arg("token").arg("expires_at");
        let (token, expires_at): (Option<String>, Option<i64>) = ctx
            .run(cmd.query_async(&mut conn))
            .await?
            .map_err(RepoError::store)?;

        let (Some(token), Some(expires_at)) = (token, expires_at) else {
            return Err(RepoError::NotFound {
                entity: "refresh token",
            });
        };
        let expires_at = DateTime::from_timestamp(expires_at, 0)
            .ok_or_else(|| RepoError::store(anyhow!("invalid expires_at: {expires_at}")))?;

        Ok(RefreshTokenRecord {
            user_id,
            token,
            expires_at,
        })
    }

    async fn remove(&self, ctx: &RequestContext, user_id: UserId) -> Result<(), RepoError> {
        let key = self.key(user_id);
        let mut conn = self.conn.clone();
        let _: () = ctx
            .run(conn.del(&key))
            .await?
            .map_err(RepoError::store)?;
        Ok(())
    }
}
