// Order lifecycle
pub mod order_number;
pub mod order_status;
pub mod orders;
pub mod pricing;

// Payments
pub mod payment_webhooks;
pub mod payments;

// Customer and staff messaging
pub mod notifications;

// Product listings
pub mod catalog;

// Service factory for dependency injection
pub mod factory;
