use metrics::counter;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::models::{Order, OrderStatus};
use crate::providers::{
    NotificationError, PushData, PushKind, PushMessage, PushSender, PushTarget, SmsSender,
};

/// Result of a single best-effort notification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "lowercase")]
pub enum NotificationOutcome {
    Sent,
    Skipped(String),
    Failed(String),
}

impl NotificationOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, NotificationOutcome::Sent)
    }

    fn label(&self) -> &'static str {
        match self {
            NotificationOutcome::Sent => "sent",
            NotificationOutcome::Skipped(_) => "skipped",
            NotificationOutcome::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for NotificationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationOutcome::Sent => write!(f, "sent"),
            NotificationOutcome::Skipped(reason) => write!(f, "skipped: {}", reason),
            NotificationOutcome::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

impl From<Result<(), NotificationError>> for NotificationOutcome {
    fn from(result: Result<(), NotificationError>) -> Self {
        match result {
            Ok(()) => NotificationOutcome::Sent,
            Err(err) if err.is_skip() => NotificationOutcome::Skipped(err.to_string()),
            Err(err) => NotificationOutcome::Failed(err.to_string()),
        }
    }
}

/// Builds customer and staff messages for each lifecycle event and hands
/// them to the SMS and push transports. Never returns an error.
#[derive(Clone)]
pub struct NotificationDispatcher {
    sms: Arc<dyn SmsSender>,
    push: Arc<dyn PushSender>,
    currency_label: String,
    restaurant_name: String,
}

impl NotificationDispatcher {
    pub fn new(
        sms: Arc<dyn SmsSender>,
        push: Arc<dyn PushSender>,
        currency_label: impl Into<String>,
        restaurant_name: impl Into<String>,
    ) -> Self {
        Self {
            sms,
            push,
            currency_label: currency_label.into(),
            restaurant_name: restaurant_name.into(),
        }
    }

    fn record(channel: &'static str, event: &'static str, outcome: &NotificationOutcome) {
        counter!(
            "restaurant_orders.notifications",
            1,
            "channel" => channel,
            "event" => event,
            "outcome" => outcome.label()
        );
        match outcome {
            NotificationOutcome::Sent => info!(channel, event, "notification sent"),
            NotificationOutcome::Skipped(reason) => {
                debug!(channel, event, reason = %reason, "notification skipped")
            }
            NotificationOutcome::Failed(reason) => {
                warn!(channel, event, reason = %reason, "notification failed")
            }
        }
    }

    async fn push_to(
        &self,
        event: &'static str,
        target: PushTarget,
        title: &str,
        body: String,
        order_number: &str,
        kind: PushKind,
    ) -> NotificationOutcome {
        let message = PushMessage {
            title: title.to_string(),
            body,
            data: PushData {
                order_number: order_number.to_string(),
                kind,
            },
        };
        let outcome = self.push.send_push(target, message).await.into();
        Self::record("push", event, &outcome);
        outcome
    }

    async fn push_to_subscriber(
        &self,
        event: &'static str,
        subscriber: Option<&str>,
        title: &str,
        body: String,
        order_number: &str,
        kind: PushKind,
    ) -> NotificationOutcome {
        match subscriber.map(str::trim).filter(|s| !s.is_empty()) {
            Some(id) => {
                self.push_to(
                    event,
                    PushTarget::Subscriber(id.to_string()),
                    title,
                    body,
                    order_number,
                    kind,
                )
                .await
            }
            None => {
                let outcome = NotificationOutcome::Skipped("No player ID".to_string());
                Self::record("push", event, &outcome);
                outcome
            }
        }
    }

    pub async fn order_confirmed(
        &self,
        subscriber: Option<&str>,
        order_number: &str,
        customer_name: &str,
    ) -> NotificationOutcome {
        self.push_to_subscriber(
            "order_confirmed",
            subscriber,
            "🎉 Order Confirmed!",
            format!(
                "Hi {}! Your order {} has been received. We're preparing it now!",
                customer_name, order_number
            ),
            order_number,
            PushKind::OrderConfirmed,
        )
        .await
    }

    pub async fn preparing(&self, subscriber: Option<&str>, order_number: &str) -> NotificationOutcome {
        self.push_to_subscriber(
            "preparing",
            subscriber,
            "👨‍🍳 Preparing Your Order!",
            format!(
                "Your order {} is now being prepared. Almost ready!",
                order_number
            ),
            order_number,
            PushKind::Preparing,
        )
        .await
    }

    pub async fn out_for_delivery(
        &self,
        subscriber: Option<&str>,
        order_number: &str,
    ) -> NotificationOutcome {
        self.push_to_subscriber(
            "out_for_delivery",
            subscriber,
            "🚴 On The Way!",
            format!(
                "Your order {} is out for delivery. See you soon!",
                order_number
            ),
            order_number,
            PushKind::OutForDelivery,
        )
        .await
    }

    pub async fn delivered(&self, subscriber: Option<&str>, order_number: &str) -> NotificationOutcome {
        self.push_to_subscriber(
            "delivered",
            subscriber,
            "✅ Order Delivered!",
            format!(
                "Your order {} has been delivered. Enjoy your meal! 🍽️",
                order_number
            ),
            order_number,
            PushKind::Delivered,
        )
        .await
    }

    /// Broadcast to every subscriber so staff dashboards pick up the order.
    pub async fn new_order_staff_alert(
        &self,
        order_number: &str,
        total: rust_decimal::Decimal,
    ) -> NotificationOutcome {
        self.push_to(
            "new_order",
            PushTarget::AllSubscribers,
            "🔔 New Order Received!",
            format!(
                "Order {} - Total: {} {:.2}. Check your dashboard!",
                order_number, self.currency_label, total
            ),
            order_number,
            PushKind::NewOrder,
        )
        .await
    }

    async fn sms_to(&self, event: &'static str, order: &Order, message: String) -> NotificationOutcome {
        let outcome = if order.customer.has_phone() {
            self.sms.send_sms(&order.customer.phone, &message).await.into()
        } else {
            NotificationOutcome::Skipped("No phone number".to_string())
        };
        Self::record("sms", event, &outcome);
        outcome
    }

    pub async fn order_confirmation_sms(&self, order: &Order) -> NotificationOutcome {
        let message = format!(
            "Hi {}! Your order {} has been confirmed. Total: {} {:.2}. Payment: {}. We'll deliver to {}, {} in 25-30 mins. Thank you for ordering from {}!",
            order.customer.full_name,
            order.order_number,
            self.currency_label,
            order.total,
            order.payment_method,
            order.customer.address,
            order.customer.city,
            self.restaurant_name,
        );
        self.sms_to("order_confirmation", order, message).await
    }

    pub async fn payment_received_sms(&self, order: &Order) -> NotificationOutcome {
        let message = format!(
            "Hi {}! Payment received for order {}. Total: {} {:.2}. We'll deliver to {}, {} in 25-30 mins. Thank you!",
            order.customer.full_name,
            order.order_number,
            self.currency_label,
            order.total,
            order.customer.address,
            order.customer.city,
        );
        self.sms_to("payment_received", order, message).await
    }

    /// Customer push for fulfilment statuses; everything else is skipped.
    pub async fn notify_status_change(&self, order: &Order, status: OrderStatus) -> NotificationOutcome {
        let subscriber = order.subscriber();
        match status {
            OrderStatus::Preparing => self.preparing(subscriber, &order.order_number).await,
            OrderStatus::OutForDelivery => {
                self.out_for_delivery(subscriber, &order.order_number).await
            }
            OrderStatus::Delivered => self.delivered(subscriber, &order.order_number).await,
            other => NotificationOutcome::Skipped(format!("No notification for status {}", other)),
        }
    }
}
