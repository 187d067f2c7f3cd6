use std::time::Duration;

use serde_json::Value;
use tracing::{info, instrument, warn};

use super::cart::Cart;
use crate::config::PricingConfig;
use crate::handlers::orders::{CreateOrderRequest, CreateOrderResponse};
use crate::models::{CustomerDetails, PaymentMethod};
use crate::services::orders::SmsStatus;
use crate::services::pricing;

const DEFAULT_FAILURE: &str = "Failed to process order";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Please enter the Bank reference number.")]
    MissingPaymentReference,
    #[error("Your cart is empty")]
    EmptyCart,
    #[error("Cart total is too large")]
    AmountOutOfRange,
    #[error("{message}")]
    Server { status: u16, message: String },
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// What the customer typed into the checkout form.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutForm {
    pub customer: CustomerDetails,
    pub payment_method: PaymentMethod,
    pub payment_reference: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutOutcome {
    /// Order placed; the cart has been cleared.
    Confirmed {
        order_number: String,
        sms_status: SmsStatus,
    },
    /// GCash checkout pending. The cart is kept until the customer returns.
    RedirectToPayment {
        order_number: String,
        payment_url: String,
        source_id: Option<String>,
    },
}

pub struct CheckoutClient {
    client: reqwest::Client,
    orders_url: String,
    pricing: PricingConfig,
}

impl CheckoutClient {
    pub fn new(base_url: &str, pricing: PricingConfig, timeout: Duration) -> Result<Self, ClientError> {
        Ok(Self {
            client: crate::providers::http_client(timeout)?,
            orders_url: format!("{}/api/v1/orders", base_url.trim_end_matches('/')),
            pricing,
        })
    }

    /// Payload for `POST /api/v1/orders`, totals rendered the way the form shows them.
    pub fn build_request(
        &self,
        cart: &Cart,
        form: &CheckoutForm,
        subscriber: Option<&str>,
    ) -> Result<CreateOrderRequest, ClientError> {
        if cart.is_empty() {
            return Err(ClientError::EmptyCart);
        }
        let reference = form.payment_reference.trim();
        if form.payment_method.is_bank_transfer() && reference.is_empty() {
            return Err(ClientError::MissingPaymentReference);
        }

        let totals = pricing::compute_totals(cart.total_price(), &self.pricing)
            .ok_or(ClientError::AmountOutOfRange)?;
        let summary = cart
            .summary(&self.pricing.currency_label)
            .ok_or(ClientError::AmountOutOfRange)?;
        let method_label = match &form.payment_method {
            PaymentMethod::BankTransfer { .. } => "Bank Transfer".to_string(),
            other => other.to_string(),
        };

        Ok(CreateOrderRequest {
            customer: form.customer.clone(),
            payment_method: method_label,
            payment_reference: Some(if reference.is_empty() {
                "N/A".to_string()
            } else {
                reference.to_string()
            }),
            player_id: Some(subscriber.unwrap_or_default().to_string()),
            items: Some(summary),
            lines: Some(cart.order_lines()),
            subtotal: Some(totals.subtotal.round_dp(2)),
            delivery_fee: Some(totals.delivery_fee.round_dp(2)),
            tax: Some(totals.tax.round_dp(2)),
            total: Some(totals.total.round_dp(2)),
        })
    }

    #[instrument(skip_all, fields(items = cart.total_item_count()))]
    pub async fn submit(
        &self,
        cart: &mut Cart,
        form: &CheckoutForm,
        subscriber: Option<&str>,
    ) -> Result<CheckoutOutcome, ClientError> {
        let request = self.build_request(cart, form, subscriber)?;
        let response = self.client.post(&self.orders_url).json(&request).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let message = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or(DEFAULT_FAILURE)
                .to_string();
            warn!(status = status.as_u16(), %message, "Order submission rejected");
            return Err(ClientError::Server {
                status: status.as_u16(),
                message,
            });
        }

        let created: CreateOrderResponse = response.json().await?;
        match (created.requires_payment, created.payment_url) {
            (Some(true), Some(payment_url)) => {
                info!(order_number = %created.order_number, "Redirecting to payment");
                Ok(CheckoutOutcome::RedirectToPayment {
                    order_number: created.order_number,
                    payment_url,
                    source_id: created.source_id,
                })
            }
            _ => {
                cart.clear();
                info!(order_number = %created.order_number, "Order confirmed");
                Ok(CheckoutOutcome::Confirmed {
                    order_number: created.order_number,
                    sms_status: created.sms_status,
                })
            }
        }
    }
}

/// Result carried back on the storefront URL after the GCash checkout page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentReturn {
    Success { order_number: Option<String> },
    Failed { order_number: Option<String> },
}

impl PaymentReturn {
    /// Reads `payment=success|failed&order=...`; anything else is not a payment return.
    pub fn from_query(query: &str) -> Option<Self> {
        let query = query.trim_start_matches('?');
        let mut payment = None;
        let mut order_number = None;
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "payment" => payment = Some(value.into_owned()),
                "order" if !value.is_empty() => order_number = Some(value.into_owned()),
                _ => {}
            }
        }

        match payment.as_deref() {
            Some("success") => Some(PaymentReturn::Success { order_number }),
            Some("failed") => Some(PaymentReturn::Failed { order_number }),
            _ => None,
        }
    }

    pub fn order_number(&self) -> Option<&str> {
        match self {
            PaymentReturn::Success { order_number } | PaymentReturn::Failed { order_number } => {
                order_number.as_deref()
            }
        }
    }

    /// A successful payment empties the cart; a failed one leaves it for retry.
    pub fn apply(&self, cart: &mut Cart) {
        if matches!(self, PaymentReturn::Success { .. }) {
            cart.clear();
        }
    }
}
