use super::util::is_dup_key;
use crate::context::RequestContext;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use std::sync::Arc;

/// Users live in MySQL; refresh token records go to the injected store.
pub struct MySqlUserRepo {
    pool: MySqlPool,
    tokens: Arc<dyn RefreshTokenStore>,
}

impl MySqlUserRepo {
    pub fn new(pool: MySqlPool, tokens: Arc<dyn RefreshTokenStore>) -> Self {
        MySqlUserRepo { pool, tokens }
    }

    fn row_to_user(row: MySqlRow) -> Result<User, RepoError> {
        let user_id: UserId = row.try_get("user_id").map_err(RepoError::store)?;
        let oauth_id: String = row.try_get("oauth_id").map_err(RepoError::store)?;
        let name: String = row.try_get("name").map_err(RepoError::store)?;
        let created_at: DateTime<Utc> = row.try_get("created_at").map_err(RepoError::store)?;

        Ok(User {
            user_id,
            oauth_id,
            name,
            created_at,
        })
    }

    async fn user_exists(&self, ctx: &RequestContext, user_id: UserId) -> Result<bool, RepoError> {
        let count: i64 = ctx
            .run(
                sqlx::query_scalar::<_, i64>("SELECT COUNT(1) FROM user WHERE user_id = ?")
                    .bind(user_id)
                    .fetch_one(&self.pool),
            )
            .await?
            .map_err(RepoError::store)?;

        Ok(count > 0)
    }

    async fn delete_row(&self, ctx: &RequestContext, user_id: UserId) -> Result<(), RepoError> {
        let result = ctx
            .run(
                sqlx::query("DELETE FROM user WHERE user_id = ?")
                    .bind(user_id)
                    .execute(&self.pool),
            )
            .await?
            .map_err(RepoError::store)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound { entity: "user" });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl UserRepo for MySqlUserRepo {
    async fn get_by_id(&self, ctx: &RequestContext, user_id: UserId) -> Result<User, RepoError> {
        let row = ctx
            .run(
                sqlx::query(
                    r#"
SELECT user_id, oauth_id, name, created_at
FROM user
WHERE user_id = ?
"#,
                )
                .bind(user_id)
                .fetch_optional(&self.pool),
            )
            .await?
            .map_err(RepoError::store)?;

        match row {
            Some(row) => Self::row_to_user(row),
            None => Err(RepoError::NotFound { entity: "user" }),
        }
    }

    async fn get_by_oauth_id(
        &self,
        ctx: &RequestContext,
        oauth_id: &str,
    ) -> Result<User, RepoError> {
        let row = ctx
            .run(
                sqlx::query(
                    r#"
SELECT user_id, oauth_id, name, created_at
FROM user
WHERE oauth_id = ?
"#,
                )
                .bind(oauth_id)
                .fetch_optional(&self.pool),
            )
            .await?
            .map_err(RepoError::store)?;

        match row {
            Some(row) => Self::row_to_user(row),
            None => Err(RepoError::NotFound { entity: "user" }),
        }
    }

    async fn create(&self, ctx: &RequestContext, user: NewUser) -> Result<UserId, RepoError> {
        let user_id = UserId::new_v4();

        ctx.run(
            sqlx::query(
                r#"
INSERT INTO user (user_id, oauth_id, name)
VALUES (?, ?, ?)
"#,
            )
            .bind(user_id)
            .bind(&user.oauth_id)
            .bind(&user.name)
            .execute(&self.pool),
        )
        .await?
        .map_err(|e| {
            if is_dup_key(&e) {
                RepoError::Conflict { entity: "user" }
            } else {
                RepoError::store(e)
            }
        })?;

        Ok(user_id)
    }

    async fn delete(&self, ctx: &RequestContext, user_id: UserId) -> Result<(), RepoError> {
        self.delete_row(ctx, user_id).await
    }

    async fn delete_user(&self, ctx: &RequestContext, user_id: UserId) -> Result<(), RepoError> {
        // token record before the user row
        self.tokens.remove(ctx, user_id).await?;
        self.delete_row(ctx, user_id).await
    }

    async fn save_refresh_token(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepoError> {
        if !self.user_exists(ctx, user_id).await? {
            return Err(RepoError::NotFound { entity: "user" });
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
