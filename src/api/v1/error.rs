use crate::api::v1::handler::ApiResponse;
use crate::application_port::*;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use tracing::warn;
use warp::filters::body::BodyDeserializeError;
use warp::http::StatusCode;
use warp::{Rejection, reject};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let code = if let Some(code) = err.find::<ApiErrorCode>() {
        code.clone()
    } else if err.is_not_found() {
        ApiErrorCode::RouteNotFound
    } else if let Some(e) = err.find::<BodyDeserializeError>() {
        warn!("bad request body: {}", e);
        ApiErrorCode::BadRequest
    } else if err.find::<reject::MissingHeader>().is_some() {
        ApiErrorCode::InvalidToken
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        ApiErrorCode::MethodNotAllowed
    } else {
        ApiErrorCode::internal(format!("unhandled rejection: {:?}", err))
    };

    let json = warp::reply::json(&ApiResponse::<()>::err(code.clone(), code.to_string()));
    Ok(warp::reply::with_status(json, code.status()))
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum ApiErrorCode {
    #[error("ID Token: failed to load user info from the OAuth provider")]
    InvalidIdToken,
    #[error("Access Token: failed to load user info from the OAuth provider")]
    InvalidAccessToken,
    #[error("User not found")]
    UserNotFound,
    #[error("Account already exists")]
    AccountExists,
    #[error("Token is not valid")]
    InvalidToken,
    #[error("Token has expired")]
    TokenExpired,
    #[error("Malformed request")]
    BadRequest,
    #[error("No such route")]
    RouteNotFound,
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Request timed out")]
    Timeout,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        warn!("Internal error: {}", error);
        ApiErrorCode::InternalError
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiErrorCode::InvalidIdToken
            | ApiErrorCode::InvalidAccessToken
            | ApiErrorCode::UserNotFound
            | ApiErrorCode::RouteNotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::AccountExists => StatusCode::CONFLICT,
            ApiErrorCode::InvalidToken | ApiErrorCode::TokenExpired => StatusCode::UNAUTHORIZED,
            ApiErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ApiErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiErrorCode::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl reject::Reject for ApiErrorCode {}

impl From<UserError> for ApiErrorCode {
    fn from(error: UserError) -> Self {
        match &error {
            UserError::IdToken(e) => {
                warn!("id token rejected: {}", e);
                return ApiErrorCode::InvalidIdToken;
            }
            UserError::AccessToken(e) => {
                warn!("access token rejected: {}", e);
                return ApiErrorCode::InvalidAccessToken;
            }
            _ => {}
        }

        match error.code() {
            ErrorCode::NotFound => ApiErrorCode::UserNotFound,
            ErrorCode::Conflict => ApiErrorCode::AccountExists,
            ErrorCode::Timeout => {
                warn!("request ran out of time: {}", error);
                ApiErrorCode::Timeout
            }
            ErrorCode::Server => ApiErrorCode::internal(error),
        }
    }
}

impl From<SessionError> for ApiErrorCode {
    fn from(error: SessionError) -> Self {
        match error {
            SessionError::User(e) => e.into(),
            SessionError::TokenInvalid => ApiErrorCode::InvalidToken,
            SessionError::TokenExpired => ApiErrorCode::TokenExpired,
            SessionError::InternalError(e) => ApiErrorCode::internal(e),
        }
    }
}
