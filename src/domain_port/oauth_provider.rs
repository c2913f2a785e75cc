use crate::context::{ContextError, RequestContext};
use crate::domain_model::OAuthProfile;

#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    #[error("provider rejected the token ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("provider unreachable: {0}")]
    Transport(#[source] anyhow::Error),
    #[error("malformed provider response: {0}")]
    Malformed(String),
    #[error(transparent)]
    Context(#[from] ContextError),
}

/// Third-party identity provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Returns the stable subject id carried by a valid identity token.
    async fn verify_identity_token(
        &self,
        ctx: &RequestContext,
        id_token: &str,
    ) -> Result<String, OAuthError>;

    async fn fetch_profile(
        &self,
        ctx: &RequestContext,
        access_token: &str,
    ) -> Result<OAuthProfile, OAuthError>;
}
