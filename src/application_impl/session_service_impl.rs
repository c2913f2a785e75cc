use crate::application_port::*;
use crate::context::RequestContext;
use crate::domain_model::UserId;
use crate::domain_port::{OAuthProvider, RepoError};
use crate::logger::*;
use std::sync::Arc;

pub struct RealSessionService {
    user_service: Arc<dyn UserService>,
    oauth: Arc<dyn OAuthProvider>,
    token_codec: Arc<dyn TokenCodec>,
}

impl RealSessionService {
    pub fn new(
        user_service: Arc<dyn UserService>,
        oauth: Arc<dyn OAuthProvider>,
        token_codec: Arc<dyn TokenCodec>,
    ) -> Self {
        Self {
            user_service,
            oauth,
            token_codec,
        }
    }

    /// Mints a token pair and makes the refresh token the user's live one.
    async fn start_session(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
    ) -> Result<AuthTokens, SessionError> {
        let (access_token, access_exp) = self.token_codec.issue_access_token(user_id).await?;
        let (refresh_token, refresh_exp) = self.token_codec.issue_refresh_token(user_id).await?;

        self.user_service
            .save_refresh_token(ctx, user_id, &refresh_token.0, refresh_exp)
            .await?;

        Ok(AuthTokens {
            access_token,
            refresh_token,
            access_token_expires_at: access_exp,
            refresh_token_expires_at: refresh_exp,
        })
    }

    /// Creates the account. A concurrent login that registered the same
    /// subject first wins, and its account is reused.
    async fn register(
        &self,
        ctx: &RequestContext,
        oauth_id: &str,
        id_token: &str,
        access_token: &str,
    ) -> Result<(UserId, bool), SessionError> {
        match self.user_service.create_user(ctx, id_token, access_token).await {
            Ok(user_id) => Ok((user_id, true)),
            Err(UserError::Repo(RepoError::Conflict { .. })) => {
                debug!("subject registered concurrently, reusing account");
                let user = self.user_service.get_user_by_oauth_id(ctx, oauth_id).await?;
                Ok((user.user_id, false))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn ensure_user_exists(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
    ) -> Result<(), SessionError> {
        match self.user_service.get_profile(ctx, user_id).await {
            Ok(_) => Ok(()),
            Err(UserError::Repo(RepoError::NotFound { .. })) => Err(SessionError::TokenInvalid),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait::async_trait]
impl SessionService for RealSessionService {
    async fn login(
        &self,
        ctx: &RequestContext,
        input: LoginInput,
    ) -> Result<LoginResult, SessionError> {
        let LoginInput {
            id_token,
            access_token,
        } = input;

        let oauth_id = self
            .oauth
            .verify_identity_token(ctx, &id_token)
            .await
            .map_err(|e| {
                warn!(error = %e, "identity token verification failed");
                UserError::IdToken(e)
            })?;

        let existing = self.user_service.get_user_by_oauth_id(ctx, &oauth_id).await;
        let (user_id, is_new_user) = match existing {
            Ok(user) => (user.user_id, false),
            Err(UserError::Repo(RepoError::NotFound { .. })) => {
                debug!("unknown subject, registering");
                self.register(ctx, &oauth_id, &id_token, &access_token).await?
            }
            Err(e) => return Err(e.into()),
        };

        let tokens = self.start_session(ctx, user_id).await?;
        info!(%user_id, is_new_user, "session started");

        Ok(LoginResult {
            user_id,
            is_new_user,
            tokens,
        })
    }

    async fn refresh(
        &self,
        ctx: &RequestContext,
        refresh_token: &str,
    ) -> Result<AuthTokens, SessionError> {
        let verified = self
            .token_codec
            .verify_refresh_token(&RefreshToken(refresh_token.to_string()))
            .await?;
        let user_id = verified.user_id;

        let matches = match self
            .user_service
            .validate_stored_refresh_token(ctx, user_id, refresh_token)
            .await
        {
            Ok(matches) => matches,
            Err(UserError::RefreshTokenLookup(RepoError::NotFound { .. })) => false,
            Err(e) => return Err(e.into()),
        };
        if !matches {
            warn!(%user_id, "refresh token does not match the live session");
            return Err(SessionError::TokenInvalid);
        }

        self.ensure_user_exists(ctx, user_id).await?;

        let tokens = self.start_session(ctx, user_id).await?;
        debug!(%user_id, jti = %verified.jti, "session refreshed");
        Ok(tokens)
    }

    async fn authenticate(
        &self,
        ctx: &RequestContext,
        access_token: &str,
    ) -> Result<UserId, SessionError> {
        let verified = self
            .token_codec
            .verify_access_token(&AccessToken(access_token.to_string()))
            .await?;

        self.ensure_user_exists(ctx, verified.user_id).await?;
        Ok(verified.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::{JwtConfig, JwtHs256Codec, RealUserService};
    use crate::domain_model::User;
    use crate::domain_port::MockUserRepo;
    use crate::infra_memory::MemoryUserRepo;
    use crate::infra_oauth::FakeOAuthProvider;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Harness {
        repo: Arc<MemoryUserRepo>,
        users: Arc<dyn UserService>,
        sessions: RealSessionService,
    }

    fn codec() -> Arc<dyn TokenCodec> {
        Arc::new(JwtHs256Codec::new(JwtConfig {
            issuer: "tickit.auth".to_string(),
            audience: "tickit-app".to_string(),
            access_ttl: Duration::from_secs(600),
            refresh_ttl: Duration::from_secs(3600),
            signing_key: b"test-signing-key".to_vec(),
        }))
    }

    fn harness() -> Harness {
        let repo = Arc::new(MemoryUserRepo::new());
        let oauth: Arc<dyn OAuthProvider> = Arc::new(FakeOAuthProvider::new());
        let users: Arc<dyn UserService> =
            Arc::new(RealUserService::new(repo.clone(), oauth.clone()));
        let sessions = RealSessionService::new(users.clone(), oauth, codec());
        Harness {
            repo,
            users,
            sessions,
        }
    }

    fn alice() -> LoginInput {
        LoginInput {
            id_token: "fake-id-token:kakao-123".to_string(),
            access_token: "fake-access-token:Alice".to_string(),
        }
    }

    #[tokio::test]
    async fn first_login_registers_then_reuses_account() {
        let h = harness();
        let ctx = RequestContext::background();

        let first = h.sessions.login(&ctx, alice()).await.unwrap();
        assert!(first.is_new_user);

        let second = h.sessions.login(&ctx, alice()).await.unwrap();
        assert!(!second.is_new_user);
        assert_eq!(first.user_id, second.user_id);
        assert_eq!(h.repo.user_count(), 1);

        // the second login replaced the first session
        let stale = &first.tokens.refresh_token.0;
        assert!(
            !h.users
                .validate_stored_refresh_token(&ctx, first.user_id, stale)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn login_with_bad_id_token() {
        let h = harness();
        let input = LoginInput {
            id_token: "garbage".to_string(),
            ..alice()
        };

        let err = h
            .sessions
            .login(&RequestContext::background(), input)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::User(UserError::IdToken(_))));
        assert_eq!(h.repo.user_count(), 0);
    }

    #[tokio::test]
    async fn refresh_rotates_the_session() {
        let h = harness();
        let ctx = RequestContext::background();
        let login = h.sessions.login(&ctx, alice()).await.unwrap();
        let old = login.tokens.refresh_token.0.clone();

        let renewed = h.sessions.refresh(&ctx, &old).await.unwrap();
        assert_ne!(renewed.refresh_token.0, old);

        let err = h.sessions.refresh(&ctx, &old).await.unwrap_err();
        assert!(matches!(err, SessionError::TokenInvalid));

        let user_id = h
            .sessions
            .authenticate(&ctx, &renewed.access_token.0)
            .await
            .unwrap();
        assert_eq!(user_id, login.user_id);
    }

    #[tokio::test]
    async fn refresh_after_logout_is_rejected() {
        let h = harness();
        let ctx = RequestContext::background();
        let login = h.sessions.login(&ctx, alice()).await.unwrap();

        h.users.logout(&ctx, login.user_id).await.unwrap();

        let err = h
            .sessions
            .refresh(&ctx, &login.tokens.refresh_token.0)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::TokenInvalid));
    }

    #[tokio::test]
    async fn withdrawn_user_cannot_authenticate() {
        let h = harness();
        let ctx = RequestContext::background();
        let login = h.sessions.login(&ctx, alice()).await.unwrap();

        h.users.withdraw_user(&ctx, login.user_id).await.unwrap();

        let err = h
            .sessions
            .authenticate(&ctx, &login.tokens.access_token.0)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::TokenInvalid));

        let err = h
            .sessions
            .refresh(&ctx, &login.tokens.refresh_token.0)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::TokenInvalid));
    }

    #[tokio::test]
    async fn access_token_cannot_refresh() {
        let h = harness();
        let ctx = RequestContext::background();
        let login = h.sessions.login(&ctx, alice()).await.unwrap();

        let err = h
            .sessions
            .refresh(&ctx, &login.tokens.access_token.0)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::TokenInvalid));
    }

    #[tokio::test]
    async fn login_losing_registration_race_reuses_account() {
        let winner = User {
            user_id: UserId::new_v4(),
            oauth_id: "kakao-123".to_string(),
            name: "Alice".to_string(),
            created_at: chrono::Utc::now(),
        };
        let lookups = Arc::new(AtomicUsize::new(0));

        let mut repo = MockUserRepo::new();
        let seen = winner.clone();
        let counter = lookups.clone();
        repo.expect_get_by_oauth_id().returning(move |_, _| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(RepoError::NotFound { entity: "user" })
            } else {
                Ok(seen.clone())
            }
        });
        repo.expect_create()
            .times(1)
            .returning(|_, _| Err(RepoError::Conflict { entity: "user" }));
        repo.expect_save_refresh_token()
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        let oauth: Arc<dyn OAuthProvider> = Arc::new(FakeOAuthProvider::new());
        let users: Arc<dyn UserService> =
            Arc::new(RealUserService::new(Arc::new(repo), oauth.clone()));
        let sessions = RealSessionService::new(users, oauth, codec());

        let login = sessions
            .login(&RequestContext::background(), alice())
            .await
            .unwrap();
        assert_eq!(login.user_id, winner.user_id);
        assert!(!login.is_new_user);
        assert_eq!(lookups.load(Ordering::SeqCst), 2);
    }
}
