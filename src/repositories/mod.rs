use async_trait::async_trait;
use sea_orm::DbErr;

use crate::models::{Order, OrderStatus};

pub mod order_row;
pub mod sheet_store;
pub mod sql_store;

pub use sheet_store::SheetOrderStore;
pub use sql_store::SqlOrderStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("order {0} not found")]
    NotFound(String),

    #[error("order {0} already exists")]
    Duplicate(String),

    #[error("malformed order row: {0}")]
    MalformedRow(String),

    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

/// Persistence for order records. Orders are appended once and only their
/// status (and payment reference) change afterwards.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn find_by_order_number(&self, order_number: &str) -> Result<Option<Order>, StoreError>;

    async fn append(&self, order: &Order) -> Result<(), StoreError>;

    /// Sets the status, and the payment reference when one is given.
    /// Returns the updated record, or `StoreError::NotFound`.
    async fn update_status(
        &self,
        order_number: &str,
        status: OrderStatus,
        payment_reference: Option<String>,
    ) -> Result<Order, StoreError>;

    async fn list(&self) -> Result<Vec<Order>, StoreError>;

    /// Short backend name for health output.
    fn backend_name(&self) -> &'static str;
}
