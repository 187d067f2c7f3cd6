use chrono::Utc;
use metrics::counter;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

use super::notifications::{NotificationDispatcher, NotificationOutcome};
use super::order_number::OrderNumberGenerator;
use super::pricing::{self, OrderLine};
use crate::config::{AppConfig, PricingConfig};
use crate::errors::ServiceError;
use crate::models::payment::to_minor_units;
use crate::models::{CustomerDetails, Order, OrderStatus, OrderTotals, PaymentMethod};
use crate::providers::{BillingDetails, CreateSourceRequest, PaymentGateway};
use crate::repositories::OrderStore;

/// What was ordered: structured cart lines, or a summary the client already
/// rendered together with its subtotal.
#[derive(Clone, Debug, PartialEq)]
pub enum SubmissionItems {
    Lines(Vec<OrderLine>),
    Summary { summary: String, subtotal: Decimal },
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrderSubmission {
    pub customer: CustomerDetails,
    pub payment_method: PaymentMethod,
    /// Reference typed by the customer, kept for cash as well as bank orders.
    pub payment_reference: Option<String>,
    pub player_id: Option<String>,
    pub items: SubmissionItems,
    /// Totals as computed by the client, checked against the server's.
    pub client_totals: Option<OrderTotals>,
}

fn amount_out_of_range() -> ServiceError {
    ServiceError::ValidationError("Order amount is out of range".to_string())
}

/// Outcome of the synchronous confirmation SMS, as reported to the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SmsStatus {
    Sent,
    Failed,
    Pending,
}

impl From<&NotificationOutcome> for SmsStatus {
    fn from(outcome: &NotificationOutcome) -> Self {
        match outcome {
            NotificationOutcome::Sent => SmsStatus::Sent,
            NotificationOutcome::Failed(_) => SmsStatus::Failed,
            NotificationOutcome::Skipped(_) => SmsStatus::Pending,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SubmissionResult {
    pub order_number: String,
    pub sms_status: SmsStatus,
    pub payment_url: Option<String>,
    pub source_id: Option<String>,
    pub requires_payment: bool,
    pub order: Order,
}

/// Turns a checkout into a persisted order and fans out notifications.
#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn OrderStore>,
    gateway: Arc<dyn PaymentGateway>,
    notifier: NotificationDispatcher,
    numbers: Arc<OrderNumberGenerator>,
    pricing: PricingConfig,
    website_url: String,
    notification_timeout: Duration,
}

impl OrderService {
    pub fn new(
        store: Arc<dyn OrderStore>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: NotificationDispatcher,
        config: &AppConfig,
    ) -> Self {
        Self {
            store,
            gateway,
            notifier,
            numbers: Arc::new(OrderNumberGenerator::new(
                config.pricing.order_number_prefix.clone(),
            )),
            pricing: config.pricing.clone(),
            website_url: config.website_url.clone(),
            notification_timeout: config.notification_timeout(),
        }
    }

    pub fn pricing(&self) -> &PricingConfig {
        &self.pricing
    }

    fn validate(&self, submission: &OrderSubmission) -> Result<(), ServiceError> {
        if submission.payment_method.is_bank_transfer()
            && submission.payment_method.bank_reference().is_none()
        {
            return Err(ServiceError::MissingPaymentReference);
        }

        match &submission.items {
            SubmissionItems::Lines(lines) => {
                if lines.is_empty() {
                    return Err(ServiceError::ValidationError(
                        "Order must contain at least one item".to_string(),
                    ));
                }
                if let Some(line) = lines.iter().find(|l| l.quantity == 0) {
                    return Err(ServiceError::ValidationError(format!(
                        "Quantity for {} must be at least 1",
                        line.name
                    )));
                }
                if let Some(line) = lines.iter().find(|l| l.unit_price.is_sign_negative()) {
                    return Err(ServiceError::ValidationError(format!(
                        "Price for {} cannot be negative",
                        line.name
                    )));
                }
            }
            SubmissionItems::Summary { summary, subtotal } => {
                if summary.trim().is_empty() {
                    return Err(ServiceError::ValidationError(
                        "Order must contain at least one item".to_string(),
                    ));
                }
                if subtotal.is_sign_negative() {
                    return Err(ServiceError::ValidationError(
                        "Subtotal cannot be negative".to_string(),
                    ));
                }
            }
        }

        submission.customer.validate()?;
        Ok(())
    }

    /// Items summary and server-side totals.
    fn price(&self, items: &SubmissionItems) -> Result<(String, OrderTotals), ServiceError> {
        let (summary, subtotal) = match items {
            SubmissionItems::Lines(lines) => (
                pricing::summarize(lines, &self.pricing.currency_label),
                pricing::subtotal(lines),
            ),
            SubmissionItems::Summary { summary, subtotal } => {
                (Some(summary.trim().to_string()), Some(*subtotal))
            }
        };
        let totals = subtotal.and_then(|subtotal| pricing::compute_totals(subtotal, &self.pricing));
        match (summary, totals) {
            (Some(summary), Some(totals)) => Ok((summary, totals)),
            _ => Err(amount_out_of_range()),
        }
    }

    fn check_client_totals(client: &OrderTotals, server: &OrderTotals) -> Result<(), ServiceError> {
        let client_sum = client
            .subtotal
            .checked_add(client.delivery_fee)
            .and_then(|sum| sum.checked_add(client.tax))
            .ok_or_else(amount_out_of_range)?;
        if !pricing::within_tolerance(client_sum, client.total) {
            return Err(ServiceError::ValidationError(format!(
                "Order total {:.2} does not equal subtotal + delivery fee + tax ({:.2})",
                client.total, client_sum
            )));
        }
        if !pricing::within_tolerance(client.total, server.total) {
            return Err(ServiceError::ValidationError(format!(
                "Order total {:.2} does not match computed total {:.2}",
                client.total, server.total
            )));
        }
        Ok(())
    }

    fn redirect_url(&self, outcome: &str, order_number: &str) -> String {
        format!(
            "{}?payment={}&order={}",
            self.website_url, outcome, order_number
        )
    }

    async fn open_gcash_checkout(
        &self,
        order_number: &str,
        total: Decimal,
        customer: &CustomerDetails,
    ) -> Result<(String, String), ServiceError> {
        let amount = to_minor_units(total).ok_or_else(amount_out_of_range)?;

        let request = CreateSourceRequest {
            order_number: order_number.to_string(),
            amount,
            currency: self.pricing.currency.clone(),
            success_url: self.redirect_url("success", order_number),
            failed_url: self.redirect_url("failed", order_number),
            billing: BillingDetails {
                name: customer.full_name.clone(),
                email: customer.email.clone(),
                phone: customer.phone.clone(),
            },
        };

        let source = self.gateway.create_gcash_source(request).await.map_err(|e| {
            warn!(order_number, error = %e, "failed to create GCash source");
            counter!("restaurant_orders.gcash_sources", 1, "outcome" => "failed");
            ServiceError::from(e)
        })?;
        counter!("restaurant_orders.gcash_sources", 1, "outcome" => "created");

        let checkout_url = source.checkout_url.ok_or_else(|| {
            ServiceError::PaymentGateway(format!("source {} has no checkout URL", source.id))
        })?;
        Ok((source.id, checkout_url))
    }

    /// Staff alert and customer confirmation run together; neither may hold
    /// up the response past the notification timeout.
    async fn fan_out_pushes(&self, order: &Order) {
        let staff = self
            .notifier
            .new_order_staff_alert(&order.order_number, order.total);
        let customer = self.notifier.order_confirmed(
            order.subscriber(),
            &order.order_number,
            &order.customer.full_name,
        );

        if tokio::time::timeout(self.notification_timeout, futures::future::join(staff, customer))
            .await
            .is_err()
        {
            warn!(
                order_number = %order.order_number,
                timeout_ms = self.notification_timeout.as_millis() as u64,
                "push notifications timed out"
            );
            counter!("restaurant_orders.notification_timeouts", 1);
        }
    }

    #[instrument(skip(self, submission), fields(payment_method = submission.payment_method.key()))]
    pub async fn submit(&self, submission: OrderSubmission) -> Result<SubmissionResult, ServiceError> {
        self.validate(&submission)?;

        let (items, totals) = self.price(&submission.items)?;
        if let Some(client) = &submission.client_totals {
            Self::check_client_totals(client, &totals)?;
        }

        let order_number = self.numbers.next();
        let is_gcash = submission.payment_method.is_gcash();

        let (status, payment_reference, checkout) = if is_gcash {
            let (source_id, checkout_url) = self
                .open_gcash_checkout(&order_number, totals.total, &submission.customer)
                .await?;
            (
                OrderStatus::AwaitingPayment,
                source_id.clone(),
                Some((source_id, checkout_url)),
            )
        } else {
            let supplied = submission
                .payment_reference
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty());
            let reference = submission
                .payment_method
                .bank_reference()
                .or(supplied)
                .unwrap_or("N/A")
                .to_string();
            (OrderStatus::Pending, reference, None)
        };

        let order = Order {
            created_at: Utc::now(),
            order_number: order_number.clone(),
            customer: submission.customer,
            payment_method: submission.payment_method.to_string(),
            payment_reference,
            items,
            subtotal: totals.subtotal,
            delivery_fee: totals.delivery_fee,
            tax: totals.tax,
            total: totals.total,
            status,
            player_id: submission
                .player_id
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty()),
        };

        self.store.append(&order).await?;
        info!(order_number = %order.order_number, total = %order.total, status = %order.status, "order saved");
        counter!(
            "restaurant_orders.orders_submitted",
            1,
            "payment_method" => submission.payment_method.key()
        );

        let sms_status = if is_gcash {
            SmsStatus::Pending
        } else {
            SmsStatus::from(&self.notifier.order_confirmation_sms(&order).await)
        };

        self.fan_out_pushes(&order).await;

        let (source_id, payment_url) = match checkout {
            Some((id, url)) => (Some(id), Some(url)),
            None => (None, None),
        };

        Ok(SubmissionResult {
            order_number,
            sms_status,
            payment_url,
            source_id,
            requires_payment: is_gcash,
            order,
        })
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, order_number: &str) -> Result<Order, ServiceError> {
        self.store
            .find_by_order_number(order_number)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_number)))
    }
}
