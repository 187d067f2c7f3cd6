//! Gateway payment events: signature check, then source events mapped onto
//! order statuses.
//!
//! Handling is idempotent through a status check: a repeated
//! `source.chargeable` for an order that is already `Paid` is acknowledged
//! without a second SMS.

use chrono::Utc;
use hmac::{Hmac, Mac};
use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use super::notifications::NotificationDispatcher;
use crate::config::PaymongoConfig;
use crate::errors::ServiceError;
use crate::models::OrderStatus;
use crate::repositories::OrderStore;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "paymongo-signature";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("missing webhook signature")]
    Missing,
    #[error("malformed webhook signature")]
    Malformed,
    #[error("webhook signature timestamp outside tolerance")]
    Stale,
    #[error("invalid webhook signature")]
    Mismatch,
}

impl From<SignatureError> for ServiceError {
    fn from(err: SignatureError) -> Self {
        ServiceError::Unauthorized(err.to_string())
    }
}

/// Checks `t=<ts>,te=<hex>,li=<hex>` signature headers: HMAC-SHA256 over
/// `<ts>.<raw body>` keyed by the webhook secret, matching either the test
/// (`te`) or live (`li`) signature.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: String,
    tolerance_secs: u64,
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<String>, tolerance_secs: u64) -> Self {
        Self {
            secret: secret.into(),
            tolerance_secs,
        }
    }

    /// `None` when no real webhook secret is configured.
    pub fn from_config(config: &PaymongoConfig) -> Option<Self> {
        config
            .configured_webhook_secret()
            .map(|secret| Self::new(secret, config.webhook_tolerance_secs))
    }

    fn mac(&self, timestamp: &str, body: &[u8]) -> Result<HmacSha256, SignatureError> {
        let mut mac =
            HmacSha256::new_from_slice(self.secret.as_bytes()).map_err(|_| SignatureError::Mismatch)?;
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(body);
        Ok(mac)
    }

    /// Hex signature for `body` at `timestamp`.
    pub fn sign(&self, timestamp: i64, body: &[u8]) -> String {
        match self.mac(&timestamp.to_string(), body) {
            Ok(mac) => hex::encode(mac.finalize().into_bytes()),
            Err(_) => String::new(),
        }
    }

    pub fn verify(&self, header: Option<&str>, body: &[u8]) -> Result<(), SignatureError> {
        self.verify_at(header, body, Utc::now().timestamp())
    }

    pub fn verify_at(&self, header: Option<&str>, body: &[u8], now: i64) -> Result<(), SignatureError> {
        let header = header
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or(SignatureError::Missing)?;

        let mut timestamp = None;
        let mut candidates = Vec::new();
        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => timestamp = Some(value.trim()),
                Some(("te", value)) | Some(("li", value)) if !value.trim().is_empty() => {
                    candidates.push(value.trim())
                }
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or(SignatureError::Malformed)?;
        let issued: i64 = timestamp.parse().map_err(|_| SignatureError::Malformed)?;
        if candidates.is_empty() {
            return Err(SignatureError::Malformed);
        }
        if (now - issued).unsigned_abs() > self.tolerance_secs {
            return Err(SignatureError::Stale);
        }

        let mac = self.mac(timestamp, body)?;
        let matched = candidates.into_iter().any(|candidate| {
            hex::decode(candidate)
                .map(|expected| mac.clone().verify_slice(&expected).is_ok())
                .unwrap_or(false)
        });

        if matched {
            Ok(())
        } else {
            Err(SignatureError::Mismatch)
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventAttributes {
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventData {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub attributes: Option<EventAttributes>,
}

/// Inbound gateway event. Only the fields the order lifecycle needs.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type", default)]
    pub event_type: String,
    #[serde(default)]
    pub data: Option<EventData>,
}

impl WebhookEvent {
    pub fn source_id(&self) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|d| d.id.as_deref())
            .filter(|id| !id.is_empty())
    }

    pub fn order_number(&self) -> Option<String> {
        let metadata = self.data.as_ref()?.attributes.as_ref()?.metadata.as_ref()?;
        match metadata.get("order_number")? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Acknowledgement body. Gateways only need a 200; `success` tells operators
/// whether the event changed anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct WebhookAck {
    pub success: bool,
    pub message: String,
}

impl WebhookAck {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

#[derive(Clone)]
pub struct PaymentWebhookService {
    store: Arc<dyn OrderStore>,
    notifier: NotificationDispatcher,
    verifier: Option<WebhookVerifier>,
}

impl PaymentWebhookService {
    pub fn new(
        store: Arc<dyn OrderStore>,
        notifier: NotificationDispatcher,
        verifier: Option<WebhookVerifier>,
    ) -> Self {
        Self {
            store,
            notifier,
            verifier,
        }
    }

    pub fn verifies_signatures(&self) -> bool {
        self.verifier.is_some()
    }

    /// Signature check (when configured), then JSON decode, then dispatch.
    /// Undecodable bodies are acknowledged with `success = false`.
    #[instrument(skip(self, signature, body), fields(body_len = body.len()))]
    pub async fn handle_raw(
        &self,
        signature: Option<&str>,
        body: &[u8],
    ) -> Result<WebhookAck, ServiceError> {
        if let Some(verifier) = &self.verifier {
            if let Err(e) = verifier.verify(signature, body) {
                warn!(error = %e, "payment webhook signature verification failed");
                counter!("restaurant_orders.webhook_events", 1, "outcome" => "unauthorized");
                return Err(e.into());
            }
        }

        match serde_json::from_slice::<WebhookEvent>(body) {
            Ok(event) => self.handle_event(event).await,
            Err(e) => {
                warn!(error = %e, "malformed payment webhook body");
                counter!("restaurant_orders.webhook_events", 1, "outcome" => "malformed");
                Ok(WebhookAck::rejected("Invalid webhook payload"))
            }
        }
    }

    #[instrument(skip(self, event), fields(event_type = %event.event_type, order_number = tracing::field::Empty))]
    pub async fn handle_event(&self, event: WebhookEvent) -> Result<WebhookAck, ServiceError> {
        let event_type = event.event_type.as_str();
        if !matches!(event_type, "source.chargeable" | "source.failed" | "source.expired") {
            info!("ignoring payment event");
            counter!("restaurant_orders.webhook_events", 1, "outcome" => "ignored");
            return Ok(WebhookAck::ok(format!("Event {} ignored", event_type)));
        }

        let Some(order_number) = event.order_number() else {
            warn!("payment event without order number metadata");
            counter!("restaurant_orders.webhook_events", 1, "outcome" => "malformed");
            return Ok(WebhookAck::rejected("Missing order number in event metadata"));
        };
        tracing::Span::current().record("order_number", order_number.as_str());

        let ack = if event_type == "source.chargeable" {
            self.mark_paid(&order_number, event.source_id()).await?
        } else {
            self.mark_failed(&order_number, event.source_id()).await?
        };

        counter!(
            "restaurant_orders.webhook_events",
            1,
            "type" => event.event_type.clone(),
            "outcome" => if ack.success { "processed" } else { "rejected" }
        );
        Ok(ack)
    }

    async fn mark_paid(
        &self,
        order_number: &str,
        source_id: Option<&str>,
    ) -> Result<WebhookAck, ServiceError> {
        let Some(order) = self.store.find_by_order_number(order_number).await? else {
            warn!(order_number, "payment event for unknown order");
            return Ok(WebhookAck::rejected(format!("Order not found: {}", order_number)));
        };

        if order.status == OrderStatus::Paid {
            info!(order_number, "payment already recorded");
            return Ok(WebhookAck::ok("Payment already recorded"));
        }
        if !order.status.can_transition_to(OrderStatus::Paid) {
            warn!(order_number, status = %order.status, "chargeable event for order that cannot become Paid");
            return Ok(WebhookAck::ok(format!(
                "Order is {}; payment event ignored",
                order.status
            )));
        }

        let updated = self
            .store
            .update_status(order_number, OrderStatus::Paid, source_id.map(str::to_string))
            .await?;
        info!(order_number, "order marked as Paid");

        self.notifier.payment_received_sms(&updated).await;
        Ok(WebhookAck::ok("Webhook processed"))
    }

    async fn mark_failed(
        &self,
        order_number: &str,
        source_id: Option<&str>,
    ) -> Result<WebhookAck, ServiceError> {
        let Some(order) = self.store.find_by_order_number(order_number).await? else {
            warn!(order_number, "payment event for unknown order");
            return Ok(WebhookAck::rejected(format!("Order not found: {}", order_number)));
        };

        match order.status {
            OrderStatus::PaymentFailed => Ok(WebhookAck::ok("Payment failure already recorded")),
            OrderStatus::Pending | OrderStatus::AwaitingPayment => {
                self.store
                    .update_status(
                        order_number,
                        OrderStatus::PaymentFailed,
                        source_id.map(str::to_string),
                    )
                    .await?;
                info!(order_number, "order payment failed");
                Ok(WebhookAck::ok("Webhook processed"))
            }
            status => {
                warn!(order_number, status = %status, "failure event for paid order ignored");
                Ok(WebhookAck::ok(format!(
                    "Order is {}; payment event ignored",
                    status
                )))
            }
        }
    }
}
