//! Outbound vendor integrations: payment gateway, SMS and push transports.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::PaymentSource;

pub mod onesignal;
pub mod paymongo;
pub mod semaphore;

pub use onesignal::OneSignalPushSender;
pub use paymongo::PaymongoGateway;
pub use semaphore::SemaphoreSmsSender;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("PayMongo API error: {status}")]
    Api { status: u16, body: String },

    #[error("payment gateway request failed: {0}")]
    Transport(String),

    #[error("unexpected payment gateway response: {0}")]
    InvalidResponse(String),

    #[error("invalid payment source id: {0}")]
    InvalidSourceId(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        GatewayError::Transport(err.to_string())
    }
}

/// Transport-level notification failures. `Disabled` and `NotConfigured`
/// mean nothing was attempted.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("{0}")]
    Disabled(&'static str),

    #[error("{0}")]
    NotConfigured(&'static str),

    #[error("provider rejected message: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("notification request failed: {0}")]
    Transport(String),
}

impl NotificationError {
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            NotificationError::Disabled(_) | NotificationError::NotConfigured(_)
        )
    }
}

impl From<reqwest::Error> for NotificationError {
    fn from(err: reqwest::Error) -> Self {
        NotificationError::Transport(err.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BillingDetails {
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// Everything needed to open a GCash checkout for an order.
#[derive(Clone, Debug, PartialEq)]
pub struct CreateSourceRequest {
    pub order_number: String,
    /// Minor units (centavos)
    pub amount: i64,
    pub currency: String,
    pub success_url: String,
    pub failed_url: String,
    pub billing: BillingDetails,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_gcash_source(
        &self,
        request: CreateSourceRequest,
    ) -> Result<PaymentSource, GatewayError>;

    async fn get_source(&self, source_id: &str) -> Result<PaymentSource, GatewayError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send_sms(&self, phone: &str, message: &str) -> Result<(), NotificationError>;
}

/// Value of the `type` field in push data payloads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushKind {
    OrderConfirmed,
    Preparing,
    OutForDelivery,
    Delivered,
    NewOrder,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushData {
    pub order_number: String,
    #[serde(rename = "type")]
    pub kind: PushKind,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub data: PushData,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PushTarget {
    /// Every subscriber (restaurant staff dashboards)
    AllSubscribers,
    Subscriber(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send_push(
        &self,
        target: PushTarget,
        message: PushMessage,
    ) -> Result<(), NotificationError>;
}

/// Shared reqwest client builder used by the vendor integrations.
pub(crate) fn http_client(timeout: std::time::Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("restaurant-orders/", env!("CARGO_PKG_VERSION")))
        .build()
}
