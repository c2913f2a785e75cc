use serde_json::{Value, json};
use std::sync::Arc;
use tickit::api;
use tickit::server::Server;
use tickit::settings::*;
use warp::Filter;
use warp::http::StatusCode;

fn memory_settings() -> Settings {
    Settings {
        http: Http {
            address: "127.0.0.1:0".to_string(),
            request_timeout_ms: 5000,
            tls: None,
        },
        jwt: Jwt {
            issuer: "tickit.auth".to_string(),
            audience: "tickit-app".to_string(),
            access_ttl_secs: 600,
            refresh_ttl_secs: 3600,
            signing_key: "api-test-key".to_string(),
        },
        log: Log {
            filter: "info".to_string(),
        },
        oauth: OAuth {
            backend: "fake".to_string(),
            kakao_token_info_url: None,
            kakao_user_info_url: None,
        },
        storage: Storage {
            backend: "memory".to_string(),
            mysql_dsn: None,
            redis_dsn: None,
            redis_prefix: None,
        },
    }
}

async fn routes()
-> impl Filter<Extract = (impl warp::Reply,), Error = std::convert::Infallible> + Clone {
    let server = Server::try_new(&memory_settings()).await.unwrap();
    api::routes(Arc::new(server))
}

fn body<B: AsRef<[u8]>>(resp: &warp::http::Response<B>) -> Value {
    serde_json::from_slice(resp.body().as_ref()).unwrap()
}

fn alice() -> Value {
    json!({
        "id_token": "fake-id-token:kakao-123",
        "access_token": "fake-access-token:Alice",
    })
}

#[tokio::test]
async fn health_check() {
    let api = routes().await;
    let resp = warp::test::request()
        .method("GET")
        .path("/api/v1/health")
        .reply(&api)
        .await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body(&resp), json!({"status": "ok"}));
}

#[tokio::test]
async fn full_session_lifecycle() {
    let api = routes().await;

    let resp = warp::test::request()
        .method("POST")
        .path("/api/v1/auth/kakao")
        .json(&alice())
        .reply(&api)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let login = body(&resp);
    assert_eq!(login["success"], true);
    assert_eq!(login["data"]["is_new_user"], true);
    let access = login["data"]["auth_tokens"]["access_token"]
        .as_str()
        .unwrap()
        .to_string();
    let refresh = login["data"]["auth_tokens"]["refresh_token"]
        .as_str()
        .unwrap()
        .to_string();

    let resp = warp::test::request()
        .method("GET")
        .path("/api/v1/users/me")
        .header("authorization", format!("Bearer {access}"))
        .reply(&api)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body(&resp)["data"]["nickname"], "Alice");

    let resp = warp::test::request()
        .method("POST")
        .path("/api/v1/auth/refresh")
        .json(&json!({ "refresh_token": refresh }))
        .reply(&api)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let renewed = body(&resp);
    let access = renewed["data"]["access_token"].as_str().unwrap().to_string();
    let refresh = renewed["data"]["refresh_token"].as_str().unwrap().to_string();

    let resp = warp::test::request()
        .method("POST")
        .path("/api/v1/auth/logout")
        .header("authorization", format!("Bearer {access}"))
        .reply(&api)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = warp::test::request()
        .method("POST")
        .path("/api/v1/auth/refresh")
        .json(&json!({ "refresh_token": refresh }))
        .reply(&api)
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body(&resp)["error"]["code"], "InvalidToken");

    let resp = warp::test::request()
        .method("DELETE")
        .path("/api/v1/users/me")
        .header("authorization", format!("Bearer {access}"))
        .reply(&api)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    // the access token outlives the account but no longer resolves to a user
    let resp = warp::test::request()
        .method("GET")
        .path("/api/v1/users/me")
        .header("authorization", format!("Bearer {access}"))
        .reply(&api)
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn second_login_is_not_new() {
    let api = routes().await;
    for expected in [true, false] {
        let resp = warp::test::request()
            .method("POST")
            .path("/api/v1/auth/kakao")
            .json(&alice())
            .reply(&api)
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body(&resp)["data"]["is_new_user"], expected);
    }
}

#[tokio::test]
async fn bad_id_token_is_not_found() {
    let api = routes().await;
    let resp = warp::test::request()
        .method("POST")
        .path("/api/v1/auth/kakao")
        .json(&json!({
            "id_token": "garbage",
            "access_token": "fake-access-token:Alice",
        }))
        .reply(&api)
        .await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let err = body(&resp);
    assert_eq!(err["success"], false);
    assert_eq!(err["error"]["code"], "InvalidIdToken");
    assert!(err["error"]["message"].as_str().unwrap().starts_with("ID Token"));
}

#[tokio::test]
async fn bad_access_token_on_first_login() {
    let api = routes().await;
    let resp = warp::test::request()
        .method("POST")
        .path("/api/v1/auth/kakao")
        .json(&json!({
            "id_token": "fake-id-token:kakao-9",
            "access_token": "garbage",
        }))
        .reply(&api)
        .await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(
        body(&resp)["error"]["message"]
            .as_str()
            .unwrap()
            .starts_with("Access Token")
    );
}

#[tokio::test]
async fn protected_routes_need_a_bearer_token() {
    let api = routes().await;

    let resp = warp::test::request()
        .method("GET")
        .path("/api/v1/users/me")
        .reply(&api)
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = warp::test::request()
        .method("GET")
        .path("/api/v1/users/me")
        .header("authorization", "Basic abc")
        .reply(&api)
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = warp::test::request()
        .method("GET")
        .path("/api/v1/users/me")
        .header("authorization", "Bearer not-a-jwt")
        .reply(&api)
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_body_and_unknown_route() {
    let api = routes().await;

    let resp = warp::test::request()
        .method("POST")
        .path("/api/v1/auth/refresh")
        .header("content-type", "application/json")
        .body("{not json")
        .reply(&api)
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = warp::test::request()
        .method("GET")
        .path("/api/v1/nowhere")
        .reply(&api)
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn server_rejects_unusable_token_ttl() {
    let mut settings = memory_settings();
    settings.jwt.access_ttl_secs = u64::MAX;
    assert!(Server::try_new(&settings).await.is_err());

    let mut settings = memory_settings();
    settings.jwt.signing_key.clear();
    assert!(Server::try_new(&settings).await.is_err());
}
