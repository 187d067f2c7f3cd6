pub mod catalog;
pub mod health;
pub mod orders;
pub mod payment_webhooks;
pub mod payments;

use std::sync::Arc;

use crate::repositories::OrderStore;
use crate::services::{
    catalog::CatalogService, factory::ServiceFactory, order_status::OrderStatusService,
    orders::OrderService, payment_webhooks::PaymentWebhookService, payments::PaymentService,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<OrderService>,
    pub order_status: Arc<OrderStatusService>,
    pub payment_webhooks: Arc<PaymentWebhookService>,
    pub payments: Arc<PaymentService>,
    pub catalog: Arc<CatalogService>,
    pub store: Arc<dyn OrderStore>,
}

impl AppServices {
    pub fn new(factory: &ServiceFactory, catalog: CatalogService) -> Self {
        Self {
            orders: Arc::new(factory.order_service()),
            order_status: Arc::new(factory.order_status_service()),
            payment_webhooks: Arc::new(factory.payment_webhook_service()),
            payments: Arc::new(factory.payment_service()),
            catalog: Arc::new(catalog),
            store: factory.store().clone(),
        }
    }
}
