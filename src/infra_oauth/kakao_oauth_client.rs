use crate::context::RequestContext;
use crate::domain_model::OAuthProfile;
use crate::domain_port::{OAuthError, OAuthProvider};
use crate::logger::*;
use reqwest::{Client, Response, header};
use serde::Deserialize;
use std::time::Duration;

pub const KAKAO_TOKEN_INFO_URL: &str = "https://kauth.kakao.com/oauth/tokeninfo";
pub const KAKAO_USER_INFO_URL: &str = "https://kapi.kakao.com/v2/user/me";

#[derive(Debug, Clone)]
pub struct KakaoConfig {
    pub token_info_url: String,
    pub user_info_url: String,
    /// Upper bound per call when the request context carries no deadline.
    pub http_timeout: Duration,
}

impl Default for KakaoConfig {
    fn default() -> Self {
        KakaoConfig {
            token_info_url: KAKAO_TOKEN_INFO_URL.to_string(),
            user_info_url: KAKAO_USER_INFO_URL.to_string(),
            http_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenInfoResponse {
    sub: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct UserInfoResponse {
    #[serde(default)]
    properties: Option<Properties>,
    #[serde(default)]
    kakao_account: Option<KakaoAccount>,
}

#[derive(Debug, Default, Deserialize)]
struct Properties {
    nickname: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct KakaoAccount {
    profile: Option<AccountProfile>,
}

#[derive(Debug, Default, Deserialize)]
struct AccountProfile {
    nickname: Option<String>,
}

impl UserInfoResponse {
    fn nickname(self) -> Option<String> {
        let from_account = self
            .kakao_account
            .and_then(|a| a.profile)
            .and_then(|p| p.nickname);
        let from_properties = self.properties.and_then(|p| p.nickname);
        from_account.or(from_properties)
    }
}

/// Kakao Login identity provider.
pub struct KakaoOAuthClient {
    client: Client,
    cfg: KakaoConfig,
}

impl KakaoOAuthClient {
    pub fn new(cfg: KakaoConfig) -> Result<Self, OAuthError> {
        let client = Client::builder()
            .build()
            .map_err(|e| OAuthError::Transport(e.into()))?;
        Ok(KakaoOAuthClient { client, cfg })
    }

    fn timeout(&self, ctx: &RequestContext) -> Duration {
        match ctx.remaining() {
            Some(left) => left.min(self.cfg.http_timeout),
            None => self.cfg.http_timeout,
        }
    }

    async fn send(
        &self,
        ctx: &RequestContext,
        request: reqwest::RequestBuilder,
    ) -> Result<Response, OAuthError> {
        let response = ctx
            .run(request.timeout(self.timeout(ctx)).send())
            .await?
            .map_err(|e| {
                warn!(error = %e, "kakao request failed");
                OAuthError::Transport(e.into())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = ctx.run(response.text()).await?.unwrap_or_default();
            return Err(OAuthError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    async fn read_json<T>(ctx: &RequestContext, response: Response) -> Result<T, OAuthError>
    where
        T: serde::de::DeserializeOwned,
    {
        ctx.run(response.json::<T>())
            .await?
            .map_err(|e| OAuthError::Malformed(e.to_string()))
    }
}

#[async_trait::async_trait]
impl OAuthProvider for KakaoOAuthClient {
    async fn verify_identity_token(
        &self,
        ctx: &RequestContext,
        id_token: &str,
    ) -> Result<String, OAuthError> {
        debug!("verifying identity token with kakao");
        let request = self
            .client
            .post(&self.cfg.token_info_url)
            .form(&[("id_token", id_token)]);

        let response = self.send(ctx, request).await?;
        let info: TokenInfoResponse = Self::read_json(ctx, response).await?;

        match info.sub {
            Some(sub) if !sub.is_empty() => Ok(sub),
            _ => Err(OAuthError::Malformed("token info has no subject".to_string())),
        }
    }

    async fn fetch_profile(
        &self,
        ctx: &RequestContext,
        access_token: &str,
    ) -> Result<OAuthProfile, OAuthError> {
        debug!("fetching kakao profile");
        let request = self
            .client
            .get(&self.cfg.user_info_url)
            .header(header::AUTHORIZATION, format!("Bearer {access_token}"));

        let response = self.send(ctx, request).await?;
        let info: UserInfoResponse = Self::read_json(ctx, response).await?;

        let nickname = info
            .nickname()
            .ok_or_else(|| OAuthError::Malformed("user info has no nickname".to_string()))?;
        Ok(OAuthProfile { nickname })
    }
}
