use serde::{Deserialize, Serialize};

/// Profile data the identity provider returns for an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthProfile {
    pub nickname: String,
}
