use crate::context::RequestContext;
use crate::domain_model::OAuthProfile;
use crate::domain_port::{OAuthError, OAuthProvider};

pub const FAKE_ID_TOKEN_PREFIX: &str = "fake-id-token:";
pub const FAKE_ACCESS_TOKEN_PREFIX: &str = "fake-access-token:";

/// Accepts `fake-id-token:<subject>` and `fake-access-token:<nickname>`.
#[derive(Debug, Default)]
pub struct FakeOAuthProvider;

impl FakeOAuthProvider {
    pub fn new() -> Self {
        Self
    }

    fn rejected() -> OAuthError {
        OAuthError::Rejected {
            status: 401,
            body: "fake provider: unknown token".to_string(),
        }
    }
}

#[async_trait::async_trait]
impl OAuthProvider for FakeOAuthProvider {
    async fn verify_identity_token(
        &self,
        ctx: &RequestContext,
        id_token: &str,
    ) -> Result<String, OAuthError> {
        ctx.check()?;
        match id_token.strip_prefix(FAKE_ID_TOKEN_PREFIX) {
            Some(subject) if !subject.is_empty() => Ok(subject.to_string()),
            _ => Err(Self::rejected()),
        }
    }

    async fn fetch_profile(
        &self,
        ctx: &RequestContext,
        access_token: &str,
    ) -> Result<OAuthProfile, OAuthError> {
        ctx.check()?;
        match access_token.strip_prefix(FAKE_ACCESS_TOKEN_PREFIX) {
            Some(nickname) if !nickname.is_empty() => Ok(OAuthProfile {
                nickname: nickname.to_string(),
            }),
            _ => Err(Self::rejected()),
        }
    }
}
