//! Optimistic send flow against a mock HTTP server.

use chatwire_client::{PullClient, TokioEnv, send_optimistic};
use chatwire_proto::DeliveryState;
use chatwire_view::{CacheConfig, MessageCache, SendError};
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

fn cache_with_history() -> MessageCache {
    let mut cache = MessageCache::new(5, CacheConfig::default());
    cache.merge_server_page(chatwire_proto::Page {
        conversation_id: 5,
        page_number: 1,
        messages: vec![chatwire_proto::ChatMessage {
            id: 10,
            conversation_id: 5,
            sender_id: 2,
            body: "earlier".to_string(),
            media_refs: Vec::new(),
            created_at: 1_700_000_000_000,
            delivery_state: DeliveryState::Confirmed,
        }],
        has_more_older: false,
    });
    cache
}

#[tokio::test]
async fn confirmed_send_replaces_the_optimistic_entry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/conversations/5/messages"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 42,
            "conversation_id": 5,
            "sender_id": 1,
            "body": "hello",
            "created_at": 1_700_000_001_000u64,
        })))
        .mount(&server)
        .await;

    let pull = PullClient::new(server.uri(), None);
    let mut cache = cache_with_history();

    let confirmed =
        send_optimistic(&TokioEnv, &pull, &mut cache, 1, "hello", &[], None).await.unwrap();

    assert_eq!(confirmed.id, 42);
    let ids: Vec<u64> = cache.messages().iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![10, 42]);
    assert!(cache.messages().iter().all(|m| m.delivery_state == DeliveryState::Confirmed));
}

#[tokio::test]
async fn rejected_send_rolls_back_and_returns_the_draft() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/conversations/5/messages"))
        .respond_with(ResponseTemplate::new(422))
        .mount(&server)
        .await;

    let pull = PullClient::new(server.uri(), None);
    let mut cache = cache_with_history();

    let err = send_optimistic(&TokioEnv, &pull, &mut cache, 1, "my draft", &[], None)
        .await
        .unwrap_err();

    let SendError::Rejected { draft, .. } = err;
    assert_eq!(draft, "my draft");
    let ids: Vec<u64> = cache.messages().iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![10]);
}
