use std::time::Duration;

use fake::faker::internet::en::SafeEmail;
use fake::Fake;
use serde_json::json;
use serde_json::Value;
use wiremock::matchers::any;
use wiremock::matchers::bearer_token;
use wiremock::matchers::body_json;
use wiremock::matchers::method;
use wiremock::matchers::path;
use wiremock::Mock;
use wiremock::ResponseTemplate;

use crate::helpers::spawn_app;
use crate::helpers::spawn_app_without_api_key;
use crate::helpers::TestApp;
use crate::helpers::TEST_API_KEY;
use crate::helpers::TEST_LIST_ID;

const INVALID_EMAIL: &str = "Please provide a valid email address.";

/// Mount a provider that accepts every upsert with `202`, expecting exactly
/// `times` calls
async fn provider_accepts(
    app: &TestApp,
    times: u64,
) {
    Mock::given(path("/v3/marketing/contacts"))
        .and(method("PUT"))
        .and(bearer_token(TEST_API_KEY))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({ "job_id": "job-1" })))
        .expect(times)
        .mount(&app.provider_server)
        .await;
}

/// Mount a provider that must never be called
async fn provider_untouched(app: &TestApp) {
    Mock::given(any())
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&app.provider_server)
        .await;
}

#[tokio::test]
async fn subscribe_returns_provider_status() {
    let app = spawn_app().await;
    provider_accepts(&app, 1).await;

    let resp = app.post_subscribe(&json!({ "email": "a@b.com" })).await;

    assert_eq!(resp.status().as_u16(), 202);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Successfully subscribed user");
    assert_eq!(body["sgmessage"], json!({ "job_id": "job-1" }));
}

#[tokio::test]
async fn subscribe_with_empty_provider_body() {
    let app = spawn_app().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.provider_server)
        .await;

    let resp = app.post_subscribe(&json!({ "email": "a@b.com" })).await;

    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Successfully subscribed user");
    assert_eq!(body["sgmessage"], Value::Null);
}

#[tokio::test]
async fn subscribe_invalid() {
    let app = spawn_app().await;
    provider_untouched(&app).await;

    for (body, msg) in [
        (json!({}), "no email"),
        (json!({ "name": "john" }), "name only"),
        (json!({ "email": "" }), "empty email"),
        (json!({ "email": "   " }), "blank email"),
        (json!({ "email": null }), "null email"),
        (json!({ "email": "not-an-email" }), "invalid email"),
        (json!({ "email": "john@localhost" }), "no dot in domain"),
        (json!({ "email": "@foo.com" }), "no local part"),
        (json!({ "email": 42 }), "number"),
        (json!({ "email": { "x": "a@b.com" } }), "object"),
        (json!({ "email": [] }), "empty array"),
    ] {
        let resp = app.post_subscribe(&body).await;
        assert_eq!(resp.status().as_u16(), 400, "{msg}");
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body, json!({ "error": INVALID_EMAIL }), "{msg}");
    }
}

#[tokio::test]
async fn subscribe_without_api_key() {
    let app = spawn_app_without_api_key().await;
    provider_untouched(&app).await;

    // the credential check comes first, so even bad input gets the same answer
    for body in [json!({ "email": "a@b.com" }), json!({ "email": "nope" })] {
        let resp = app.post_subscribe(&body).await;
        assert_eq!(resp.status().as_u16(), 500);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(
            body,
            json!({ "error": "SENDGRID_API_KEY is not configured on the server." })
        );
    }
}

#[tokio::test]
async fn first_name_omitted_without_name() {
    let app = spawn_app().await;
    let email: String = SafeEmail().fake();

    Mock::given(body_json(json!({
        "list_ids": [TEST_LIST_ID],
        "contacts": [{ "email": email }],
    })))
    .respond_with(ResponseTemplate::new(202))
    .expect(3)
    .mount(&app.provider_server)
    .await;

    for body in [
        json!({ "email": email }),
        json!({ "email": email, "name": "" }),
        json!({ "email": email, "name": "   " }),
    ] {
        let resp = app.post_subscribe(&body).await;
        assert_eq!(resp.status().as_u16(), 202);
    }
}

#[tokio::test]
async fn first_name_sent_trimmed() {
    let app = spawn_app().await;

    Mock::given(body_json(json!({
        "list_ids": [TEST_LIST_ID],
        "contacts": [{ "email": "user@example.com", "first_name": "John" }],
    })))
    .respond_with(ResponseTemplate::new(202))
    .expect(1)
    .mount(&app.provider_server)
    .await;

    let resp = app
        .post_subscribe(&json!({ "email": "  user@example.com  ", "name": "  John " }))
        .await;
    assert_eq!(resp.status().as_u16(), 202);
}

/// Idempotency is the provider's job; both calls must reach it and succeed
#[tokio::test]
async fn subscribe_twice() {
    let app = spawn_app().await;
    provider_accepts(&app, 2).await;

    let body = json!({ "email": "twice@example.com", "name": "Twice" });
    for _ in 0..2 {
        let resp = app.post_subscribe(&body).await;
        assert_eq!(resp.status().as_u16(), 202);
    }
}

#[tokio::test]
async fn provider_failure_then_recovery() {
    let app = spawn_app().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .expect(1)
        .mount(&app.provider_server)
        .await;
    provider_accepts(&app, 1).await;

    let resp = app.post_subscribe(&json!({ "email": "a@b.com" })).await;
    assert_eq!(resp.status().as_u16(), 500);
    let body: Value = resp.json().await.unwrap();
    assert!(!body["error"].as_str().unwrap().is_empty());

    // the server is still up and serving
    assert!(app.get_health_check().await.status().is_success());
    let resp = app.post_subscribe(&json!({ "email": "a@b.com" })).await;
    assert_eq!(resp.status().as_u16(), 202);
}

#[tokio::test]
async fn provider_timeout() {
    let app = spawn_app().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(202).set_delay(Duration::from_secs(30)))
        .expect(1)
        .mount(&app.provider_server)
        .await;

    let resp = app.post_subscribe(&json!({ "email": "a@b.com" })).await;
    assert_eq!(resp.status().as_u16(), 500);
    let body: Value = resp.json().await.unwrap();
    assert!(!body["error"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_json() {
    let app = spawn_app().await;
    provider_untouched(&app).await;

    for body in ["{\"email\": ", "email=a%40b.com", ""] {
        let resp = app.post_subscribe_raw(body.to_string()).await;
        assert_eq!(resp.status().as_u16(), 500, "{body:?}");
        let json: Value = resp.json().await.unwrap();
        assert!(!json["error"].as_str().unwrap().is_empty(), "{body:?}");
    }
}

/// A single-element array is read as its element
#[tokio::test]
async fn array_email_unwrapped() {
    let app = spawn_app().await;

    Mock::given(body_json(json!({
        "list_ids": [TEST_LIST_ID],
        "contacts": [{ "email": "a@b.com" }],
    })))
    .respond_with(ResponseTemplate::new(202))
    .expect(1)
    .mount(&app.provider_server)
    .await;

    let resp = app.post_subscribe(&json!({ "email": ["a@b.com"] })).await;
    assert_eq!(resp.status().as_u16(), 202);
}

/// Well-formed, but over the 256 KiB body limit
fn oversized_body() -> String {
    format!(
        r#"{{"email": "a@b.com", "name": "{}"}}"#,
        "x".repeat(300_000)
    )
}

#[tokio::test]
async fn oversized_body_is_json_500() {
    let app = spawn_app().await;
    provider_untouched(&app).await;

    let resp = app.post_subscribe_raw(oversized_body()).await;
    assert_eq!(resp.status().as_u16(), 500);
    let body: Value = resp.json().await.unwrap();
    assert!(!body["error"].as_str().unwrap().is_empty());

    assert!(app.get_health_check().await.status().is_success());
}

#[tokio::test]
async fn oversized_body_without_api_key() {
    let app = spawn_app_without_api_key().await;
    provider_untouched(&app).await;

    let resp = app.post_subscribe_raw(oversized_body()).await;
    assert_eq!(resp.status().as_u16(), 500);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body,
        json!({ "error": "SENDGRID_API_KEY is not configured on the server." })
    );
}

#[tokio::test]
async fn form_route_alias() {
    let app = spawn_app().await;
    provider_accepts(&app, 1).await;

    let resp = app
        .api_client
        .post(format!("{}/api/subscribeUser", app.addr))
        .json(&json!({ "email": "a@b.com", "name": "A" }))
        .send()
        .await
        .expect("execute request");
    assert_eq!(resp.status().as_u16(), 202);
}
