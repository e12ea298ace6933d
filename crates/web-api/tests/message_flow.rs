mod support;

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use support::spawn_app;

#[tokio::test]
async fn health_does_not_require_auth() {
    let app = spawn_app().await;
    let resp = Client::new().get(app.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn requests_without_valid_token_are_unauthorized() {
    let app = spawn_app().await;
    let client = Client::new();

    let resp = client
        .get(app.url("/api/v1/conversations"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "MISSING_CREDENTIALS");

    let resp = client
        .get(app.url("/api/v1/conversations"))
        .bearer_auth("garbage")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn one_way_follow_conversation_flow() {
    let app = spawn_app().await;
    let client = Client::new();
    let alice = app.user("alice").await;
    let bob = app.user("bob").await;
    app.follow(&alice, &bob).await;
    let alice_token = app.token_for(&alice);
    let bob_token = app.token_for(&bob);

    // alice 关注了 bob，可以发送
    let resp = client
        .post(app.url("/api/v1/conversations/bob/messages"))
        .bearer_auth(&alice_token)
        .json(&json!({ "content": "  hi  " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let sent: Value = resp.json().await.unwrap();
    assert_eq!(sent["content"], "hi");
    assert_eq!(sent["fromMe"], true);
    assert_eq!(sent["read"], false);
    assert_eq!(sent["sender"], alice.id.to_string());

    // bob 的会话列表里有一条未读
    let conversations: Value = client
        .get(app.url("/api/v1/conversations"))
        .bearer_auth(&bob_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(conversations[0]["partner"], "alice");
    assert_eq!(conversations[0]["displayName"], "alice");
    assert_eq!(conversations[0]["latestMessage"]["text"], "hi");
    assert_eq!(conversations[0]["unreadCount"], 1);

    // bob 没有关注 alice，不能回复
    let resp = client
        .post(app.url("/api/v1/conversations/alice/messages"))
        .bearer_auth(&bob_token)
        .json(&json!({ "content": "hello back" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // 但可以查看会话
    let page: Value = client
        .get(app.url("/api/v1/conversations/alice/messages"))
        .bearer_auth(&bob_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["totalItems"], 1);
    assert_eq!(page["hasNext"], false);
    assert_eq!(page["items"][0]["fromMe"], false);
    assert_eq!(page["items"][0]["createdAt"], sent["createdAt"]);

    let resp = client
        .post(app.url("/api/v1/conversations/alice/read"))
        .bearer_auth(&bob_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let conversations: Value = client
        .get(app.url("/api/v1/conversations"))
        .bearer_auth(&bob_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(conversations[0]["unreadCount"], 0);
}

#[tokio::test]
async fn validation_and_lookup_errors() {
    let app = spawn_app().await;
    let client = Client::new();
    let alice = app.user("alice").await;
    let bob = app.user("bob").await;
    let carol = app.user("carol").await;
    app.follow(&alice, &bob).await;
    let alice_token = app.token_for(&alice);

    let resp = client
        .post(app.url("/api/v1/conversations/bob/messages"))
        .bearer_auth(&alice_token)
        .json(&json!({ "content": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "INVALID_ARGUMENT");

    // 缺少 content 字段
    let resp = client
        .post(app.url("/api/v1/conversations/bob/messages"))
        .bearer_auth(&alice_token)
        .json(&json!({ "text": "hi" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "INVALID_ARGUMENT");

    let resp = client
        .post(app.url("/api/v1/conversations/bob/messages"))
        .bearer_auth(&alice_token)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = client
        .post(app.url("/api/v1/conversations/nobody/messages"))
        .bearer_auth(&alice_token)
        .json(&json!({ "content": "hello?" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // 双方互不关注，不可查看
    let resp = client
        .get(app.url(&format!(
            "/api/v1/conversations/{}/messages",
            carol.username
        )))
        .bearer_auth(&alice_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "VIEW_NOT_ALLOWED");
}

#[tokio::test]
async fn thread_pages_are_chronological() {
    let app = spawn_app().await;
    let client = Client::new();
    let alice = app.user("alice").await;
    let bob = app.user("bob").await;
    app.follow(&alice, &bob).await;
    let token = app.token_for(&alice);

    for i in 0..5 {
        client
            .post(app.url("/api/v1/conversations/bob/messages"))
            .bearer_auth(&token)
            .json(&json!({ "content": format!("m{i}") }))
            .send()
            .await
            .unwrap();
    }

    let page: Value = client
        .get(app.url("/api/v1/conversations/bob/messages?page=0&size=2"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let texts: Vec<_> = page["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(texts, vec!["m3", "m4"]);
    assert_eq!(page["page"], 0);
    assert_eq!(page["size"], 2);
    assert_eq!(page["totalItems"], 5);
    assert_eq!(page["hasNext"], true);

    let last: Value = client
        .get(app.url("/api/v1/conversations/bob/messages?page=2&size=2"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(last["items"][0]["content"], "m0");
    assert_eq!(last["hasNext"], false);
}
