mod common;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use livelobby::{AppState, app};
use serde_json::{Value, json};
use tower::ServiceExt;

async fn test_app() -> (Router, common::TestDb) {
    let db = common::setup().await;
    let router = app(AppState {
        db_pool: db.pool.clone(),
    });
    (router, db)
}

async fn call(
    router: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn register(router: &Router, name: &str) -> String {
    let (status, body) = call(
        router,
        "POST",
        "/user/create",
        None,
        Some(json!({ "user_name": name, "leader_card_id": 1000 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["user_token"].as_str().unwrap().to_owned()
}

#[tokio::test]
async fn root_answers() {
    let (router, _db) = test_app().await;
    let (status, body) = call(&router, "GET", "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Hello World");
}

#[tokio::test]
async fn user_create_me_update() {
    let (router, _db) = test_app().await;
    let token = register(&router, "speed of sound").await;

    let (status, me) = call(&router, "GET", "/user/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["name"], "speed of sound");
    assert_eq!(me["leader_card_id"], 1000);

    let (status, _) = call(
        &router,
        "POST",
        "/user/update",
        Some(&token),
        Some(json!({ "user_name": "sonic", "leader_card_id": 42 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, me) = call(&router, "GET", "/user/me", Some(&token), None).await;
    assert_eq!(me["name"], "sonic");
    assert_eq!(me["leader_card_id"], 42);
}

#[tokio::test]
async fn missing_and_unknown_credentials() {
    let (router, _db) = test_app().await;

    let (status, _) = call(&router, "GET", "/user/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&router, "GET", "/user/me", Some("no-such-token"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn full_room_flow_over_http() {
    let (router, _db) = test_app().await;
    let host = register(&router, "host").await;
    let guest = register(&router, "guest").await;
    let late = register(&router, "late").await;

    let (status, body) = call(
        &router,
        "POST",
        "/room/create",
        Some(&host),
        Some(json!({ "live_id": 10, "select_difficulty": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let room_id = body["room_id"].as_i64().unwrap();

    let (_, body) = call(
        &router,
        "POST",
        "/room/list",
        None,
        Some(json!({ "live_id": 10 })),
    )
    .await;
    let listed = body["room_info_list"].as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["room_id"].as_i64().unwrap(), room_id);
    assert_eq!(listed[0]["max_user_count"], 4);

    let (_, body) = call(
        &router,
        "POST",
        "/room/join",
        Some(&guest),
        Some(json!({ "room_id": room_id, "select_difficulty": 1 })),
    )
    .await;
    assert_eq!(body["join_room_result"], 1);

    let (_, body) = call(
        &router,
        "POST",
        "/room/wait",
        Some(&guest),
        Some(json!({ "room_id": room_id })),
    )
    .await;
    assert_eq!(body["status"], 1);
    let waiting = body["room_member_list"].as_array().unwrap();
    assert_eq!(waiting.len(), 2);
    let me = waiting.iter().find(|m| m["is_me"] == true).unwrap();
    assert_eq!(me["name"], "guest");
    assert_eq!(me["is_host"], false);
    assert_eq!(me["select_difficulty"], 1);
    assert_eq!(
        waiting.iter().filter(|m| m["is_host"] == true).count(),
        1
    );

    let (_, _) = call(
        &router,
        "POST",
        "/room/start",
        Some(&host),
        Some(json!({ "room_id": room_id })),
    )
    .await;

    // started rooms leave discovery and reject joiners
    let (_, body) = call(
        &router,
        "POST",
        "/room/list",
        None,
        Some(json!({ "live_id": 0 })),
    )
    .await;
    assert!(body["room_info_list"].as_array().unwrap().is_empty());

    let (_, body) = call(
        &router,
        "POST",
        "/room/join",
        Some(&late),
        Some(json!({ "room_id": room_id, "select_difficulty": 1 })),
    )
    .await;
    assert_eq!(body["join_room_result"], 3);

    let (status, _) = call(
        &router,
        "POST",
        "/room/end",
        Some(&host),
        Some(json!({ "room_id": room_id, "judge_count_list": [9, 8, 7, 6], "score": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for (token, score) in [(&host, 100_000), (&guest, 90_000)] {
        let (status, _) = call(
            &router,
            "POST",
            "/room/end",
            Some(token),
            Some(json!({
                "room_id": room_id,
                "judge_count_list": [90, 5, 3, 1, 1],
                "score": score,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = call(
        &router,
        "POST",
        "/room/result",
        None,
        Some(json!({ "room_id": room_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let results = body["result_user_list"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["judge_count_list"], json!([90, 5, 3, 1, 1]));

    let (_, body) = call(
        &router,
        "POST",
        "/room/wait",
        Some(&host),
        Some(json!({ "room_id": room_id })),
    )
    .await;
    assert_eq!(body["status"], 3);
}

#[tokio::test]
async fn wait_on_unknown_room_is_not_found() {
    let (router, _db) = test_app().await;
    let token = register(&router, "loner").await;

    let (status, _) = call(
        &router,
        "POST",
        "/room/wait",
        Some(&token),
        Some(json!({ "room_id": 9999 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
