use std::sync::Arc;

use crate::{
    config::AppConfig,
    errors::ServiceError,
    providers::{
        OneSignalPushSender, PaymentGateway, PaymongoGateway, PushSender, SemaphoreSmsSender,
        SmsSender,
    },
    repositories::OrderStore,
    services::{
        notifications::NotificationDispatcher, order_status::OrderStatusService,
        orders::OrderService, payment_webhooks::{PaymentWebhookService, WebhookVerifier},
        payments::PaymentService,
    },
};

/// Factory for creating service instances with shared dependencies
#[derive(Clone)]
pub struct ServiceFactory {
    config: Arc<AppConfig>,
    store: Arc<dyn OrderStore>,
    gateway: Arc<dyn PaymentGateway>,
    sms: Arc<dyn SmsSender>,
    push: Arc<dyn PushSender>,
}

impl ServiceFactory {
    pub fn new(
        config: Arc<AppConfig>,
        store: Arc<dyn OrderStore>,
        gateway: Arc<dyn PaymentGateway>,
        sms: Arc<dyn SmsSender>,
        push: Arc<dyn PushSender>,
    ) -> Self {
        Self {
            config,
            store,
            gateway,
            sms,
            push,
        }
    }

    /// Wires the PayMongo, Semaphore and OneSignal clients from configuration.
    pub fn from_config(
        config: Arc<AppConfig>,
        store: Arc<dyn OrderStore>,
    ) -> Result<Self, ServiceError> {
        let timeout = config.http_client_timeout();
        let gateway = PaymongoGateway::new(&config.paymongo, timeout)?;
        let sms = SemaphoreSmsSender::new(config.sms.clone(), timeout)
            .map_err(|e| ServiceError::InternalError(e.to_string()))?;
        let push = OneSignalPushSender::new(config.push.clone(), timeout)
            .map_err(|e| ServiceError::InternalError(e.to_string()))?;

        Ok(Self::new(
            config,
            store,
            Arc::new(gateway),
            Arc::new(sms),
            Arc::new(push),
        ))
    }

    pub fn notifier(&self) -> NotificationDispatcher {
        NotificationDispatcher::new(
            self.sms.clone(),
            self.push.clone(),
            self.config.pricing.currency_label.clone(),
            self.config.sms.sender_name.clone(),
        )
    }

    pub fn order_service(&self) -> OrderService {
        OrderService::new(
            self.store.clone(),
            self.gateway.clone(),
            self.notifier(),
            &self.config,
        )
    }

    pub fn order_status_service(&self) -> OrderStatusService {
        OrderStatusService::new(self.store.clone(), self.notifier())
    }

    pub fn payment_webhook_service(&self) -> PaymentWebhookService {
        PaymentWebhookService::new(
            self.store.clone(),
            self.notifier(),
            WebhookVerifier::from_config(&self.config.paymongo),
        )
    }

    pub fn payment_service(&self) -> PaymentService {
        PaymentService::new(self.gateway.clone())
    }

    pub fn store(&self) -> &Arc<dyn OrderStore> {
        &self.store
    }

    pub fn config(&self) -> &Arc<AppConfig> {
        &self.config
    }
}
