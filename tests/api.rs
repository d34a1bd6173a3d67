use std::{net::SocketAddr, str::FromStr};

use axum::{
    body::{to_bytes, Body},
    extract::connect_info::MockConnectInfo,
    Router,
};
use http::{header::CONTENT_TYPE, Request, StatusCode};
use poll_server::{db, routes::create_routes};
use serde_json::{json, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tower::ServiceExt;

async fn app() -> Router {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();
    db::migrate(&pool).await.unwrap();

    let peer: SocketAddr = "198.51.100.1:40000".parse().unwrap();
    create_routes(pool, None).layer(MockConnectInfo(peer))
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_from(uri: &str, body: Value, voter: &str) -> Request<Body> {
    let mut req = post(uri, body);
    req.headers_mut()
        .insert("x-forwarded-for", voter.parse().unwrap());
    req
}

async fn create(app: &Router, title: &str, options: &[&str]) -> i64 {
    let payload = json!({ "title": title, "options": options });
    let (status, body) = send(app, post("/api/polls", payload)).await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_i64().unwrap()
}

async fn option_ids(app: &Router, poll_id: i64) -> Vec<i64> {
    let (_, body) = send(app, get(&format!("/api/polls/{poll_id}"))).await;
    body["options"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["id"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn create_then_fetch_poll() {
    let app = app().await;

    let (status, body) = send(
        &app,
        post("/api/polls", json!({ "title": "Lunch", "options": ["Pizza", "Sushi"] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Poll created successfully.");
    let id = body["id"].as_i64().unwrap();

    let (status, body) = send(&app, get(&format!("/api/polls/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id);
    assert_eq!(body["title"], "Lunch");
    assert_eq!(body["description"], Value::Null);
    assert!(body["created_at"].is_string());
    let texts: Vec<_> = body["options"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["text"].as_str().unwrap())
        .collect();
    assert_eq!(texts, ["Pizza", "Sushi"]);
}

#[tokio::test]
async fn list_returns_newest_first() {
    let app = app().await;
    let older = create(&app, "Older", &["a", "b"]).await;
    let newer = create(&app, "Newer", &["a", "b"]).await;

    let (status, body) = send(&app, get("/api/polls")).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<_> = body.as_array().unwrap().iter().map(|p| p["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, [newer, older]);
    assert!(body[0].get("options").is_none());
}

#[tokio::test]
async fn invalid_polls_are_rejected_without_writes() {
    let app = app().await;

    for payload in [
        json!({ "title": "Solo", "options": ["only"] }),
        json!({ "options": ["a", "b"] }),
        json!({ "title": "No options" }),
        json!({ "title": "Blank", "options": ["a", "   "] }),
    ] {
        let (status, body) = send(&app, post("/api/polls", payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    let (_, body) = send(&app, get("/api/polls")).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let app = app().await;
    let req = Request::post("/api/polls")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn unknown_poll_is_not_found() {
    let app = app().await;

    let (status, body) = send(&app, get("/api/polls/404")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Poll not found.");

    let (status, _) = send(&app, get("/api/polls/abc")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, get("/api/polls/404/results")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn second_vote_from_same_client_is_rejected() {
    let app = app().await;
    let id = create(&app, "Lunch", &["Pizza", "Sushi"]).await;
    let options = option_ids(&app, id).await;
    let uri = format!("/api/polls/{id}/vote");

    let (status, body) = send(&app, post(&uri, json!({ "option_id": options[0] }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Vote submitted successfully.");

    let (status, body) = send(&app, post(&uri, json!({ "option_id": options[1] }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "You have already voted on this poll.");
}

#[tokio::test]
async fn forwarded_for_identifies_distinct_voters() {
    let app = app().await;
    let id = create(&app, "Lunch", &["Pizza", "Sushi"]).await;
    let options = option_ids(&app, id).await;
    let uri = format!("/api/polls/{id}/vote");

    for voter in ["203.0.113.1", "203.0.113.2"] {
        let req = post_from(&uri, json!({ "option_id": options[1] }), voter);
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let req = post_from(&uri, json!({ "option_id": options[0] }), "203.0.113.1");
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = send(&app, get(&format!("/api/polls/{id}/results"))).await;
    assert_eq!(body["totalVotes"], 2);
    assert_eq!(body["results"][0]["text"], "Sushi");
    assert_eq!(body["results"][0]["vote_count"], 2);
}

#[tokio::test]
async fn vote_validation_errors() {
    let app = app().await;
    let id = create(&app, "Lunch", &["Pizza", "Sushi"]).await;
    let other = create(&app, "Dinner", &["Soup", "Salad"]).await;
    let foreign = option_ids(&app, other).await;
    let uri = format!("/api/polls/{id}/vote");

    let (status, body) = send(&app, post(&uri, json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Option ID is required.");

    let (status, body) = send(&app, post(&uri, json!({ "option_id": 0 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Option ID is required.");

    let (status, body) = send(&app, post(&uri, json!({ "option_id": foreign[0] }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Option not found.");

    let (_, body) = send(&app, get(&format!("/api/polls/{id}/results"))).await;
    assert_eq!(body["totalVotes"], 0);
}

#[tokio::test]
async fn results_round_trip() {
    let app = app().await;
    let id = create(&app, "Letters", &["A", "B", "C"]).await;
    let options = option_ids(&app, id).await;

    let (status, _) = send(
        &app,
        post(&format!("/api/polls/{id}/vote"), json!({ "option_id": options[1] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, get(&format!("/api/polls/{id}/results"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id);
    assert_eq!(body["title"], "Letters");
    assert_eq!(body["totalVotes"], 1);
    assert_eq!(
        body["results"],
        json!([
            { "id": options[1], "text": "B", "vote_count": 1 },
            { "id": options[0], "text": "A", "vote_count": 0 },
            { "id": options[2], "text": "C", "vote_count": 0 },
        ])
    );
}
