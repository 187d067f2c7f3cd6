mod common;

use axum::http::{Method, StatusCode};
use chrono::Utc;
use common::{checkout_body, response_json, source_event, TestApp};
use restaurant_orders::config::AppConfig;
use restaurant_orders::models::OrderStatus;
use restaurant_orders::services::payment_webhooks::WebhookVerifier;

async fn gcash_order(app: &TestApp) -> String {
    let (status, body) = response_json(
        app.request(Method::POST, "/api/v1/orders", Some(checkout_body("GCash", None)))
            .await,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["orderNumber"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn chargeable_event_marks_order_paid_once() {
    let app = TestApp::new();
    let order_number = gcash_order(&app).await;
    let event = source_event("source.chargeable", &order_number).to_string();

    let (status, ack) = response_json(app.post_raw("/api/v1/payments/webhook", &event, None).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["success"], true);
    assert_eq!(app.order(&order_number).await.status, OrderStatus::Paid);

    let sms = app.outbox.sms();
    assert_eq!(sms.len(), 1);
    assert!(sms[0].1.starts_with("Hi Maria Santos! Payment received for order"));

    // Gateways retry deliveries; the second one must not text the customer again.
    let (status, ack) = response_json(app.post_raw("/api/v1/payments/webhook", &event, None).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["message"], "Payment already recorded");
    assert_eq!(app.outbox.sms().len(), 1);
}

#[tokio::test]
async fn events_are_accepted_on_the_orders_endpoint() {
    let app = TestApp::new();
    let order_number = gcash_order(&app).await;
    let event = source_event("source.failed", &order_number).to_string();

    let (status, ack) = response_json(app.post_raw("/api/v1/orders", &event, None).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["success"], true);
    assert_eq!(app.order(&order_number).await.status, OrderStatus::PaymentFailed);

    // A late success after failure is acknowledged but does not resurrect the order.
    let late = source_event("source.chargeable", &order_number).to_string();
    let (status, _) = response_json(app.post_raw("/api/v1/orders", &late, None).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.order(&order_number).await.status, OrderStatus::PaymentFailed);
    assert!(app.outbox.sms().is_empty());
}

#[tokio::test]
async fn unknown_orders_and_bad_payloads_are_rejected_in_the_ack() {
    let app = TestApp::new();

    let event = source_event("source.chargeable", "ORD-0").to_string();
    let (status, ack) = response_json(app.post_raw("/api/v1/payments/webhook", &event, None).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["success"], false);
    assert_eq!(ack["message"], "Order not found: ORD-0");

    let (status, ack) =
        response_json(app.post_raw("/api/v1/payments/webhook", "not json", None).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["success"], false);

    let other = r#"{"type":"payment.paid","data":{"id":"pay_1"}}"#;
    let (status, ack) = response_json(app.post_raw("/api/v1/payments/webhook", other, None).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["success"], true);
}

#[tokio::test]
async fn signed_webhooks_are_verified_when_secret_is_set() {
    let mut config = AppConfig::default();
    config.paymongo.webhook_secret = Some("whsk_test".to_string());
    config.paymongo.webhook_tolerance_secs = 300;
    let app = TestApp::with_config(config);
    let order_number = gcash_order(&app).await;

    let event = source_event("source.chargeable", &order_number).to_string();

    let (status, _) = response_json(app.post_raw("/api/v1/payments/webhook", &event, None).await).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let now = Utc::now().timestamp();
    let forged = format!("t={},te={}", now, "00".repeat(32));
    let (status, _) =
        response_json(app.post_raw("/api/v1/payments/webhook", &event, Some(&forged)).await).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        app.order(&order_number).await.status,
        OrderStatus::AwaitingPayment
    );

    let verifier = WebhookVerifier::new("whsk_test", 300);
    let header = format!("t={},te=,li={}", now, verifier.sign(now, event.as_bytes()));
    let (status, ack) =
        response_json(app.post_raw("/api/v1/payments/webhook", &event, Some(&header)).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["success"], true);
    assert_eq!(app.order(&order_number).await.status, OrderStatus::Paid);
}
