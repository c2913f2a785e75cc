use crate::application_impl::*;
use crate::application_port::*;
use crate::context::RequestContext;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::infra_oauth::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::{self, Settings};
use anyhow::anyhow;
use sqlx::{MySql, Pool};
use std::sync::Arc;
use std::time::Duration;

/// Everything a request handler needs, wired from [`Settings`].
pub struct Server {
    pub user_service: Arc<dyn UserService>,
    pub session_service: Arc<dyn SessionService>,
    request_timeout: Duration,
    pool: Option<Pool<MySql>>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let oauth: Arc<dyn OAuthProvider> = match settings.oauth.backend.as_str() {
            "fake" => Arc::new(FakeOAuthProvider::new()),
            "kakao" => Arc::new(KakaoOAuthClient::new(kakao_config(&settings.oauth))?),
            other => return Err(anyhow!("Unknown oauth backend: {}", other)),
        };

        let (user_repo, pool): (Arc<dyn UserRepo>, Option<Pool<MySql>>) =
            match settings.storage.backend.as_str() {
                "memory" => {
                    let repo: Arc<dyn UserRepo> = Arc::new(MemoryUserRepo::new());
                    (repo, None)
                }
                "mysql" => {
                    let storage = &settings.storage;
                    let redis_dsn = required(&storage.redis_dsn, "storage.redis_dsn")?;
                    let mysql_dsn = required(&storage.mysql_dsn, "storage.mysql_dsn")?;
                    let prefix = storage
                        .redis_prefix
                        .clone()
                        .unwrap_or_else(|| "tickit:refresh".to_string());

                    let redis_client = redis::Client::open(redis_dsn)?;
                    let redis_manager = redis_client.get_connection_manager().await?;
                    let tokens: Arc<dyn RefreshTokenStore> =
                        Arc::new(RedisRefreshTokenStore::new(redis_manager, prefix));

                    let pool = Pool::<MySql>::connect(mysql_dsn).await?;
                    let repo: Arc<dyn UserRepo> =
                        Arc::new(MySqlUserRepo::new(pool.clone(), tokens));
                    (repo, Some(pool))
                }
                other => return Err(anyhow!("Unknown storage backend: {}", other)),
            };

        let jwt = &settings.jwt;
        if jwt.signing_key.is_empty() {
            return Err(anyhow!("jwt.signing_key must not be empty"));
        }
        let jwt_config = JwtConfig {
            issuer: jwt.issuer.clone(),
            audience: jwt.audience.clone(),
            access_ttl: Duration::from_secs(jwt.access_ttl_secs),
            refresh_ttl: Duration::from_secs(jwt.refresh_ttl_secs),
            signing_key: jwt.signing_key.clone().into_bytes(),
        };
        jwt_config.validate()?;
        let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtHs256Codec::new(jwt_config));

        let user_service: Arc<dyn UserService> =
            Arc::new(RealUserService::new(user_repo, oauth.clone()));
        let session_service: Arc<dyn SessionService> = Arc::new(RealSessionService::new(
            user_service.clone(),
            oauth,
            token_codec,
        ));

        info!(
            oauth = %settings.oauth.backend,
            storage = %settings.storage.backend,
            "server started"
        );

        Ok(Self {
            user_service,
            session_service,
            request_timeout: Duration::from_millis(settings.http.request_timeout_ms),
            pool,
        })
    }

    /// Fresh context for one inbound request.
    pub fn request_context(&self) -> RequestContext {
        RequestContext::with_timeout(self.request_timeout)
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}

fn required<'a>(value: &'a Option<String>, name: &str) -> anyhow::Result<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| anyhow!("{} is required for this backend", name))
}

fn kakao_config(oauth: &settings::OAuth) -> KakaoConfig {
    let mut cfg = KakaoConfig::default();
    if let Some(url) = &oauth.kakao_token_info_url {
        cfg.token_info_url = url.clone();
    }
    if let Some(url) = &oauth.kakao_user_info_url {
        cfg.user_info_url = url.clone();
    }
    cfg
}
