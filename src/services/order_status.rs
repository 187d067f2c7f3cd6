use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;

use super::notifications::{NotificationDispatcher, NotificationOutcome};
use crate::errors::ServiceError;
use crate::models::{Order, OrderStatus};
use crate::repositories::OrderStore;

/// Result of a status change: the stored order and what the customer was told.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub order: Order,
    pub previous_status: OrderStatus,
    pub changed: bool,
    #[schema(value_type = Object)]
    pub notification: NotificationOutcome,
}

/// Outcome of an external-edit fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "result", content = "message", rename_all = "lowercase")]
pub enum ExternalEditResult {
    Notified(String),
    Ignored(String),
    Failed(String),
}

#[derive(Clone)]
pub struct OrderStatusService {
    store: Arc<dyn OrderStore>,
    notifier: NotificationDispatcher,
}

impl OrderStatusService {
    pub fn new(store: Arc<dyn OrderStore>, notifier: NotificationDispatcher) -> Self {
        Self { store, notifier }
    }

    /// Manual status change, validated against the order state machine.
    #[instrument(skip(self), fields(order_number = %order_number, new_status = %raw_status))]
    pub async fn update_status(
        &self,
        order_number: &str,
        raw_status: &str,
    ) -> Result<StatusChange, ServiceError> {
        let new_status = OrderStatus::parse_label(raw_status).ok_or_else(|| {
            error!("Invalid order status: {}", raw_status);
            ServiceError::InvalidStatus(raw_status.trim().to_string())
        })?;

        let order = self
            .store
            .find_by_order_number(order_number)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_number)))?;

        let previous_status = order.status;
        if previous_status == new_status {
            info!("status unchanged");
            return Ok(StatusChange {
                order,
                previous_status,
                changed: false,
                notification: NotificationOutcome::Skipped("Status unchanged".to_string()),
            });
        }

        if !previous_status.can_transition_to(new_status) {
            error!(
                "Invalid status transition from {} to {}",
                previous_status, new_status
            );
            return Err(ServiceError::InvalidTransition {
                from: previous_status.to_string(),
                to: new_status.to_string(),
            });
        }

        let updated = self
            .store
            .update_status(order_number, new_status, None)
            .await?;
        info!(from = %previous_status, to = %new_status, "order status updated");

        let notification = self.notifier.notify_status_change(&updated, new_status).await;

        Ok(StatusChange {
            order: updated,
            previous_status,
            changed: true,
            notification,
        })
    }

    /// The status was already edited in the store by someone else; only
    /// fan out the customer notification for fulfilment statuses.
    #[instrument(skip(self), fields(order_number = %order_number, status = %raw_status))]
    pub async fn handle_external_edit(
        &self,
        order_number: &str,
        raw_status: &str,
    ) -> Result<ExternalEditResult, ServiceError> {
        let status = match OrderStatus::parse_label(raw_status) {
            Some(status) if status.notifies_customer() => status,
            _ => {
                return Ok(ExternalEditResult::Ignored(format!(
                    "No notification for status: {}",
                    raw_status.trim()
                )))
            }
        };

        let Some(order) = self.store.find_by_order_number(order_number).await? else {
            return Ok(ExternalEditResult::Failed(format!(
                "Order not found: {}",
                order_number
            )));
        };

        Ok(match self.notifier.notify_status_change(&order, status).await {
            NotificationOutcome::Sent => {
                ExternalEditResult::Notified(format!("Customer notified: {}", status))
            }
            NotificationOutcome::Skipped(reason) => ExternalEditResult::Ignored(reason),
            NotificationOutcome::Failed(reason) => ExternalEditResult::Failed(reason),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{MockPushSender, MockSmsSender, PushKind, PushTarget};
    use crate::repositories::order_row::tests::sample_order;
    use crate::repositories::{MockOrderStore, SheetOrderStore};
    use assert_matches::assert_matches;

    async fn seeded(status: OrderStatus) -> Arc<SheetOrderStore> {
        let store = Arc::new(SheetOrderStore::new());
        let mut order = sample_order("ORD-1");
        order.status = status;
        store.append(&order).await.unwrap();
        store
    }

    fn service(store: Arc<dyn OrderStore>, push: MockPushSender) -> OrderStatusService {
        let notifier = NotificationDispatcher::new(
            Arc::new(MockSmsSender::new()),
            Arc::new(push),
            "Php",
            "Kuchefnero",
        );
        OrderStatusService::new(store, notifier)
    }

    #[tokio::test]
    async fn valid_transition_persists_and_notifies() {
        let store = seeded(OrderStatus::Paid).await;
        let mut push = MockPushSender::new();
        push.expect_send_push()
            .withf(|target, message| {
                *target == PushTarget::Subscriber("player-1".into())
                    && message.data.kind == PushKind::Preparing
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let svc = service(store.clone(), push);
        let change = svc.update_status("ORD-1", "preparing").await.unwrap();

        assert!(change.changed);
        assert_eq!(change.previous_status, OrderStatus::Paid);
        assert_eq!(change.order.status, OrderStatus::Preparing);
        assert_eq!(change.notification, NotificationOutcome::Sent);
        let stored = store.find_by_order_number("ORD-1").await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Preparing);
    }

    #[tokio::test]
    async fn same_status_is_a_noop() {
        let store = seeded(OrderStatus::Preparing).await;
        let mut push = MockPushSender::new();
        push.expect_send_push().never();

        let change = service(store, push)
            .update_status("ORD-1", "Preparing")
            .await
            .unwrap();
        assert!(!change.changed);
    }

    #[tokio::test]
    async fn rejects_unknown_status_missing_order_and_bad_transition() {
        let store = seeded(OrderStatus::Delivered).await;
        let svc = service(store, MockPushSender::new());

        assert_matches!(
            svc.update_status("ORD-1", "Shipped").await,
            Err(ServiceError::InvalidStatus(_))
        );
        assert_matches!(
            svc.update_status("ORD-404", "Preparing").await,
            Err(ServiceError::NotFound(_))
        );
        assert_matches!(
            svc.update_status("ORD-1", "Pending").await,
            Err(ServiceError::InvalidTransition { .. })
        );
    }

    #[tokio::test]
    async fn unknown_status_never_touches_the_store() {
        let mut store = MockOrderStore::new();
        store.expect_find_by_order_number().never();
        let svc = service(Arc::new(store), MockPushSender::new());

        let result = svc.handle_external_edit("ORD-1", "Paid").await.unwrap();
        assert_matches!(result, ExternalEditResult::Ignored(_));
    }

    #[tokio::test]
    async fn external_edit_notifies_without_persisting() {
        let store = seeded(OrderStatus::Preparing).await;
        let mut push = MockPushSender::new();
        push.expect_send_push()
            .withf(|_, message| message.data.kind == PushKind::Delivered)
            .times(1)
            .returning(|_, _| Ok(()));

        let svc = service(store.clone(), push);
        let result = svc.handle_external_edit("ORD-1", "DELIVERED").await.unwrap();
        assert_matches!(result, ExternalEditResult::Notified(_));

        let stored = store.find_by_order_number("ORD-1").await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Preparing);
    }

    #[tokio::test]
    async fn external_edit_for_missing_order_fails_softly() {
        let store = seeded(OrderStatus::Preparing).await;
        let svc = service(store, MockPushSender::new());
        assert_eq!(
            svc.handle_external_edit("ORD-9", "out for delivery").await.unwrap(),
            ExternalEditResult::Failed("Order not found: ORD-9".into())
        );
    }
}
