//! Walks one account through login, refresh, logout and withdrawal
//! against the in-memory store and the fake identity provider.

use anyhow::anyhow;
use tickit::application_port::*;
use tickit::context::RequestContext;
use tickit::logger::*;
use tickit::server::Server;
use tickit::settings::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let logger = Logger::new_bootstrap();

    let settings = parse_settings(cli.settings.as_deref())?;
    logger.reload_from_config(&LogConfig::from(&settings.log))?;
    if settings.oauth.backend != "fake" {
        return Err(anyhow!("session_demo needs the fake oauth backend"));
    }

    let server = Server::try_new(&settings).await?;
    let sessions = server.session_service.clone();
    let users = server.user_service.clone();
    let ctx = RequestContext::background();

    let input = LoginInput {
        id_token: "fake-id-token:kakao-123".to_string(),
        access_token: "fake-access-token:Alice".to_string(),
    };

    let first = sessions.login(&ctx, input.clone()).await?;
    info!(user_id = %first.user_id, is_new_user = first.is_new_user, "first login");

    let again = sessions.login(&ctx, input).await?;
    info!(user_id = %again.user_id, is_new_user = again.is_new_user, "second login");

    let profile = users.get_profile(&ctx, again.user_id).await?;
    info!(nickname = %profile.nickname, "profile");

    match sessions.refresh(&ctx, &first.tokens.refresh_token.0).await {
        Err(e) => info!(error = %e, "superseded refresh token rejected"),
        Ok(_) => return Err(anyhow!("superseded refresh token was accepted")),
    }

    let renewed = sessions.refresh(&ctx, &again.tokens.refresh_token.0).await?;
    let user_id = sessions
        .authenticate(&ctx, &renewed.access_token.0)
        .await?;
    info!(%user_id, "refreshed and authenticated");

    users.logout(&ctx, user_id).await?;
    match sessions.refresh(&ctx, &renewed.refresh_token.0).await {
        Err(e) => info!(error = %e, "refresh after logout rejected"),
        Ok(_) => return Err(anyhow!("refresh after logout was accepted")),
    }

    users.withdraw_user(&ctx, user_id).await?;
    match users.get_profile(&ctx, user_id).await {
        Err(e) => info!(error = %e, code = ?e.code(), "withdrawn user is gone"),
        Ok(_) => return Err(anyhow!("withdrawn user still has a profile")),
    }

    server.shutdown().await;
    Ok(())
}
