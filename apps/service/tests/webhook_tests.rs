//! Webhook delivery tests: signing, event filtering, trigger timestamps and
//! per-webhook failure isolation

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use uppe_health::webhooks::{
    EVENT_HEADER, MemoryWebhookStore, SIGNATURE_HEADER, WebhookDelivery, WebhookEventType, WebhookSubscription,
    verify_signature,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn setup(webhooks: Vec<WebhookSubscription>) -> (Arc<MemoryWebhookStore>, WebhookDelivery) {
    let store = Arc::new(MemoryWebhookStore::new());
    for webhook in webhooks {
        store.insert(webhook).await;
    }
    let delivery = WebhookDelivery::new(store.clone(), Duration::from_secs(2)).unwrap();
    (store, delivery)
}

#[tokio::test]
async fn test_signed_delivery_verifies_over_raw_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hooks/uppe"))
        .and(header("user-agent", "Uppe-Webhooks/1.0"))
        .and(header("x-uppe-event", "site.down"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let webhook = WebhookSubscription::new("org-1", format!("{}/hooks/uppe", server.uri()), [WebhookEventType::SiteDown])
        .with_secret("whsec_test");
    let (_store, delivery) = setup(vec![webhook]).await;

    let outcomes = delivery
        .trigger("org-1", WebhookEventType::SiteDown, json!({"siteId": "site-1", "status": "OFFLINE"}))
        .await
        .join()
        .await;

    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].delivered());

    let requests = server.received_requests().await.unwrap();
    let request = &requests[0];
    let signature = request.headers.get(SIGNATURE_HEADER).unwrap().to_str().unwrap();
    assert!(verify_signature("whsec_test", &request.body, signature));
    assert!(request.headers.get(EVENT_HEADER).is_some());

    let envelope: Value = serde_json::from_slice(&request.body).unwrap();
    assert_eq!(envelope["event"], json!("site.down"));
    assert_eq!(envelope["data"]["siteId"], json!("site-1"));
    assert!(envelope["timestamp"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_unsigned_webhook_has_no_signature_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST")).respond_with(ResponseTemplate::new(200)).mount(&server).await;

    let webhook = WebhookSubscription::new("org-1", server.uri(), [WebhookEventType::IncidentCreated]);
    let (_store, delivery) = setup(vec![webhook]).await;

    delivery.trigger("org-1", WebhookEventType::IncidentCreated, json!({})).await.join().await;

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get(SIGNATURE_HEADER).is_none());
}

#[tokio::test]
async fn test_only_active_subscribed_webhooks_fire() {
    let server = MockServer::start().await;
    Mock::given(method("POST")).respond_with(ResponseTemplate::new(200)).expect(1).mount(&server).await;

    let subscribed = WebhookSubscription::new("org-1", server.uri(), [WebhookEventType::SiteRecovered]);
    let other_event = WebhookSubscription::new("org-1", server.uri(), [WebhookEventType::SiteDown]);
    let inactive = WebhookSubscription::new("org-1", server.uri(), [WebhookEventType::SiteRecovered]).inactive();
    let other_org = WebhookSubscription::new("org-2", server.uri(), [WebhookEventType::SiteRecovered]);
    let (_store, delivery) = setup(vec![subscribed, other_event, inactive, other_org]).await;

    let handle = delivery.trigger("org-1", WebhookEventType::SiteRecovered, json!({})).await;

    assert_eq!(handle.len(), 1);
    handle.join().await;
}

#[tokio::test]
async fn test_error_response_still_marks_triggered() {
    let server = MockServer::start().await;
    Mock::given(method("POST")).respond_with(ResponseTemplate::new(500)).mount(&server).await;

    let webhook = WebhookSubscription::new("org-1", server.uri(), [WebhookEventType::SiteDegraded]);
    let id = webhook.id.clone();
    let (store, delivery) = setup(vec![webhook]).await;

    let outcomes = delivery.trigger("org-1", WebhookEventType::SiteDegraded, json!({})).await.join().await;

    assert_eq!(outcomes[0].status, Some(500));
    assert!(!outcomes[0].delivered());
    assert!(store.get(&id).await.unwrap().last_triggered_at.is_some());
}

#[tokio::test]
async fn test_transport_failure_does_not_mark_triggered() {
    let webhook = WebhookSubscription::new("org-1", "http://127.0.0.1:1/hook", [WebhookEventType::SiteDown]);
    let id = webhook.id.clone();
    let (store, delivery) = setup(vec![webhook]).await;

    let outcomes = delivery.trigger("org-1", WebhookEventType::SiteDown, json!({})).await.join().await;

    assert_eq!(outcomes[0].status, None);
    assert!(outcomes[0].error.is_some());
    assert!(store.get(&id).await.unwrap().last_triggered_at.is_none());
}

#[tokio::test]
async fn test_failing_webhook_does_not_block_siblings() {
    let healthy = MockServer::start().await;
    Mock::given(method("POST")).respond_with(ResponseTemplate::new(200)).expect(2).mount(&healthy).await;
    let slow = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
        .mount(&slow)
        .await;

    let webhooks = vec![
        WebhookSubscription::new("org-1", healthy.uri(), [WebhookEventType::IncidentResolved]),
        WebhookSubscription::new("org-1", "http://127.0.0.1:1/hook", [WebhookEventType::IncidentResolved]),
        WebhookSubscription::new("org-1", slow.uri(), [WebhookEventType::IncidentResolved]),
        WebhookSubscription::new("org-1", healthy.uri(), [WebhookEventType::IncidentResolved]),
    ];
    let (_store, delivery) = setup(webhooks).await;

    let outcomes = delivery.trigger("org-1", WebhookEventType::IncidentResolved, json!({})).await.join().await;

    assert_eq!(outcomes.len(), 4);
    assert!(outcomes[0].delivered());
    assert!(outcomes[1].error.is_some());
    // Cut off by the 2s delivery timeout
    assert!(outcomes[2].error.is_some());
    assert!(outcomes[3].delivered());
}

#[tokio::test]
async fn test_unknown_organization_triggers_nothing() {
    let (_store, delivery) = setup(Vec::new()).await;

    let handle = delivery.trigger("org-404", WebhookEventType::SiteDown, json!({})).await;

    assert!(handle.is_empty());
    assert!(handle.join().await.is_empty());
}
