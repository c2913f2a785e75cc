use super::error::*;
use super::handler;
use crate::application_port::SessionService;
use crate::context::RequestContext;
use crate::domain_model::UserId;
use crate::server::*;
use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, http, reject};

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(handler::health);

    let kakao_login = warp::path!("auth" / "kakao")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_context(server.clone()))
        .and(with(server.session_service.clone()))
        .and_then(handler::kakao_login);

    let refresh = warp::path!("auth" / "refresh")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_context(server.clone()))
        .and(with(server.session_service.clone()))
        .and_then(handler::refresh);

    let logout = warp::path!("auth" / "logout")
        .and(warp::post())
        .and(with_verification(server.clone()))
        .and(with(server.user_service.clone()))
        .and_then(handler::logout);

    let profile = warp::path!("users" / "me")
        .and(warp::get())
        .and(with_verification(server.clone()))
        .and(with(server.user_service.clone()))
        .and_then(handler::get_profile);

    let withdraw = warp::path!("users" / "me")
        .and(warp::delete())
        .and(with_verification(server.clone()))
        .and(with(server.user_service.clone()))
        .and_then(handler::withdraw);

    health
        .or(kakao_login)
        .or(refresh)
        .or(logout)
        .or(profile)
        .or(withdraw)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

/// A new deadline-bound context per request.
fn with_context(
    server: Arc<Server>,
) -> impl Filter<Extract = (RequestContext,), Error = Infallible> + Clone {
    warp::any().map(move || server.request_context())
}

/// Resolves the bearer access token to a user, sharing the request context.
fn with_verification(
    server: Arc<Server>,
) -> impl Filter<Extract = (RequestContext, UserId), Error = warp::Rejection> + Clone {
    let session_service: Arc<dyn SessionService> = server.session_service.clone();
    with_context(server)
        .and(warp::header::<String>(http::header::AUTHORIZATION.as_ref()))
        .and_then(move |ctx: RequestContext, token: String| {
            let session_service = session_service.clone();
            async move {
                let Some(token) = token.strip_prefix("Bearer ") else {
                    return Err(reject::custom(ApiErrorCode::InvalidToken));
                };
                let user_id = session_service
                    .authenticate(&ctx, token)
                    .await
                    .map_err(ApiErrorCode::from)
                    .map_err(reject::custom)?;
                Ok((ctx, user_id))
            }
        })
        .untuple_one()
}
