#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use restaurant_orders::{
    build_router,
    config::AppConfig,
    handlers::AppServices,
    models::{Order, PaymentSource},
    providers::{
        CreateSourceRequest, GatewayError, NotificationError, PaymentGateway, PushMessage,
        PushSender, PushTarget, SmsSender,
    },
    repositories::{OrderStore, SheetOrderStore},
    services::{catalog::CatalogService, factory::ServiceFactory},
    AppState,
};
use serde_json::Value;
use tower::ServiceExt;

pub const CHECKOUT_URL: &str = "https://pay.example.test/checkout/src_test_1";

/// Everything the fake vendors were asked to do.
#[derive(Default)]
pub struct Outbox {
    pub sms: Mutex<Vec<(String, String)>>,
    pub pushes: Mutex<Vec<(PushTarget, PushMessage)>>,
    pub sources: Mutex<Vec<CreateSourceRequest>>,
}

impl Outbox {
    pub fn sms(&self) -> Vec<(String, String)> {
        self.sms.lock().unwrap().clone()
    }

    pub fn pushes(&self) -> Vec<(PushTarget, PushMessage)> {
        self.pushes.lock().unwrap().clone()
    }

    pub fn sources(&self) -> Vec<CreateSourceRequest> {
        self.sources.lock().unwrap().clone()
    }
}

struct FakeGateway {
    outbox: Arc<Outbox>,
    fail: bool,
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_gcash_source(
        &self,
        request: CreateSourceRequest,
    ) -> Result<PaymentSource, GatewayError> {
        if self.fail {
            return Err(GatewayError::Api {
                status: 400,
                body: "amount below minimum".to_string(),
            });
        }
        let source = PaymentSource {
            id: "src_test_1".to_string(),
            amount: request.amount,
            currency: request.currency.clone(),
            status: "pending".to_string(),
            checkout_url: Some(CHECKOUT_URL.to_string()),
        };
        self.outbox.sources.lock().unwrap().push(request);
        Ok(source)
    }

    async fn get_source(&self, source_id: &str) -> Result<PaymentSource, GatewayError> {
        Ok(PaymentSource {
            id: source_id.to_string(),
            amount: 3628,
            currency: "PHP".to_string(),
            status: "chargeable".to_string(),
            checkout_url: None,
        })
    }
}

struct FakeSms(Arc<Outbox>);

#[async_trait]
impl SmsSender for FakeSms {
    async fn send_sms(&self, phone: &str, message: &str) -> Result<(), NotificationError> {
        self.0
            .sms
            .lock()
            .unwrap()
            .push((phone.to_string(), message.to_string()));
        Ok(())
    }
}

struct FakePush(Arc<Outbox>);

#[async_trait]
impl PushSender for FakePush {
    async fn send_push(
        &self,
        target: PushTarget,
        message: PushMessage,
    ) -> Result<(), NotificationError> {
        self.0.pushes.lock().unwrap().push((target, message));
        Ok(())
    }
}

/// Router over an in-memory order sheet with recording vendor fakes.
pub struct TestApp {
    router: Router,
    pub store: Arc<SheetOrderStore>,
    pub outbox: Arc<Outbox>,
    pub config: Arc<AppConfig>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(AppConfig::default(), false)
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self::build(config, false)
    }

    pub fn with_failing_gateway() -> Self {
        Self::build(AppConfig::default(), true)
    }

    fn build(mut config: AppConfig, gateway_fails: bool) -> Self {
        config.website_url = "https://shop.example.test".to_string();
        let config = Arc::new(config);
        let outbox = Arc::new(Outbox::default());
        let store = Arc::new(SheetOrderStore::new());

        let factory = ServiceFactory::new(
            config.clone(),
            store.clone() as Arc<dyn OrderStore>,
            Arc::new(FakeGateway {
                outbox: outbox.clone(),
                fail: gateway_fails,
            }),
            Arc::new(FakeSms(outbox.clone())),
            Arc::new(FakePush(outbox.clone())),
        );
        let services = AppServices::new(&factory, CatalogService::built_in());
        let router = build_router(AppState::new(config.clone(), services));

        Self {
            router,
            store,
            outbox,
            config,
        }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap()
    }

    /// POST with an exact body and optional signature header.
    pub async fn post_raw(&self, uri: &str, body: &str, signature: Option<&str>) -> Response {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(signature) = signature {
            builder = builder.header("paymongo-signature", signature);
        }
        self.router
            .clone()
            .oneshot(builder.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap()
    }

    pub async fn order_count(&self) -> usize {
        self.store.list().await.unwrap().len()
    }

    pub async fn order(&self, order_number: &str) -> Order {
        self.store
            .find_by_order_number(order_number)
            .await
            .unwrap()
            .expect("order should exist")
    }
}

pub async fn response_json(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

pub fn checkout_body(payment_method: &str, reference: Option<&str>) -> Value {
    let mut body = serde_json::json!({
        "fullName": "Maria Santos",
        "email": "maria@example.com",
        "phone": "0917 123 4567",
        "address": "12 Mabini St",
        "city": "Quezon City",
        "barangay": "1100",
        "paymentMethod": payment_method,
        "playerId": "player-1",
        "lines": [
            {"productId": 1, "name": "Margherita Pizza", "variant": "Medium", "unitPrice": "12.99", "quantity": 2},
            {"productId": 16, "name": "Coca Cola", "unitPrice": "2.99", "quantity": 1}
        ],
        "subtotal": "28.97",
        "deliveryFee": "4.99",
        "tax": "2.32",
        "total": "36.28"
    });
    if let Some(reference) = reference {
        body["paymentReference"] = Value::String(reference.to_string());
    }
    body
}

pub fn source_event(event_type: &str, order_number: &str) -> Value {
    serde_json::json!({
        "type": event_type,
        "data": {
            "id": "src_test_1",
            "attributes": {
                "status": "chargeable",
                "metadata": { "order_number": order_number }
            }
        }
    })
}
