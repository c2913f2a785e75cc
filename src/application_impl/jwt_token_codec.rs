use crate::application_port::*;
use crate::domain_model::UserId;
use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub signing_key: Vec<u8>,
}

impl JwtConfig {
    /// Rejects TTLs that cannot be added to the current time.
    pub fn validate(&self) -> Result<(), SessionError> {
        let now = Utc::now();
        expiry(now, self.access_ttl)?;
        expiry(now, self.refresh_ttl)?;
        Ok(())
    }
}

fn expiry(issued_at: DateTime<Utc>, ttl: Duration) -> Result<DateTime<Utc>, SessionError> {
    TimeDelta::from_std(ttl)
        .ok()
        .and_then(|ttl| issued_at.checked_add_signed(ttl))
        .ok_or_else(|| SessionError::InternalError(format!("token ttl out of range: {ttl:?}")))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String, // user id
    exp: i64,
    iat: i64,
    iss: String,
    aud: String,
    jti: String,
    typ: TokenKind,
}

pub struct JwtHs256Codec {
    cfg: JwtConfig,
}

impl JwtHs256Codec {
    pub fn new(cfg: JwtConfig) -> Self {
        JwtHs256Codec { cfg }
    }

    fn encode(&self, uid: UserId, typ: TokenKind) -> Result<(String, DateTime<Utc>), SessionError> {
        let ttl = match typ {
            TokenKind::Access => self.cfg.access_ttl,
            TokenKind::Refresh => self.cfg.refresh_ttl,
        };
        let iat_dt = Utc::now();
        let exp_dt = expiry(iat_dt, ttl)?;
        let claims = Claims {
            sub: uid.to_string(),
            exp: exp_dt.timestamp(),
            iat: iat_dt.timestamp(),
            iss: self.cfg.issuer.clone(),
            aud: self.cfg.audience.clone(),
            jti: uuid::Uuid::new_v4().to_string(),
            typ,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.cfg.signing_key),
        )
        .map_err(|e| SessionError::InternalError(e.to_string()))?;
        Ok((token, exp_dt))
    }

    fn decode(&self, token: &str, typ: TokenKind) -> Result<TokenVerifyResult, SessionError> {
        let mut v = Validation::new(Algorithm::HS256);
        v.validate_exp = true;
        v.leeway = 0;
        v.set_audience(&[self.cfg.audience.clone()]);
        v.set_issuer(&[self.cfg.issuer.clone()]);

        let data = decode::<Claims>(token, &DecodingKey::from_secret(&self.cfg.signing_key), &v)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => SessionError::TokenExpired,
                _ => SessionError::TokenInvalid,
            })?;

        if data.claims.typ != typ {
            return Err(SessionError::TokenInvalid);
        }
        let user_id = data
            .claims
            .sub
            .parse::<UserId>()
            .map_err(|_| SessionError::TokenInvalid)?;

        Ok(TokenVerifyResult {
            user_id,
            jti: data.claims.jti,
        })
    }
}

#[async_trait::async_trait]
impl TokenCodec for JwtHs256Codec {
    async fn issue_access_token(
        &self,
        user: UserId,
    ) -> Result<(AccessToken, DateTime<Utc>), SessionError> {
        let (token, exp_dt) = self.encode(user, TokenKind::Access)?;
        Ok((AccessToken(token), exp_dt))
    }

    async fn issue_refresh_token(
        &self,
        user: UserId,
    ) -> Result<(RefreshToken, DateTime<Utc>), SessionError> {
        let (token, exp_dt) = self.encode(user, TokenKind::Refresh)?;
        Ok((RefreshToken(token), exp_dt))
    }

    async fn verify_access_token(
        &self,
        token: &AccessToken,
    ) -> Result<TokenVerifyResult, SessionError> {
        self.decode(&token.0, TokenKind::Access)
    }

    async fn verify_refresh_token(
        &self,
        token: &RefreshToken,
    ) -> Result<TokenVerifyResult, SessionError> {
        self.decode(&token.0, TokenKind::Refresh)
    }
}
