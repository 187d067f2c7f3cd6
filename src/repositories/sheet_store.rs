use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use super::order_row::{self, ORDER_NUMBER_COL, PAYMENT_REFERENCE_COL, STATUS_COL};
use super::{OrderStore, StoreError};
use crate::models::{Order, OrderStatus};

/// In-memory order sheet: one row of cells per order, scanned linearly.
#[derive(Debug, Default)]
pub struct SheetOrderStore {
    rows: RwLock<Vec<Vec<String>>>,
}

impl SheetOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the sheet from existing rows (without the header row).
    pub fn from_rows(rows: Vec<Vec<String>>) -> Result<Self, StoreError> {
        for row in &rows {
            order_row::from_row(row)?;
        }
        Ok(Self {
            rows: RwLock::new(rows),
        })
    }

    /// Copy of the sheet contents, header row first.
    pub async fn export_rows(&self) -> Vec<Vec<String>> {
        let rows = self.rows.read().await;
        let mut out = Vec::with_capacity(rows.len() + 1);
        out.push(order_row::HEADERS.iter().map(|h| h.to_string()).collect());
        out.extend(rows.iter().cloned());
        out
    }

    fn position(rows: &[Vec<String>], order_number: &str) -> Option<usize> {
        rows.iter()
            .position(|row| row.get(ORDER_NUMBER_COL).map(String::as_str) == Some(order_number))
    }
}

#[async_trait]
impl OrderStore for SheetOrderStore {
    async fn find_by_order_number(&self, order_number: &str) -> Result<Option<Order>, StoreError> {
        let rows = self.rows.read().await;
        Self::position(&rows, order_number)
            .map(|idx| order_row::from_row(&rows[idx]))
            .transpose()
    }

    #[instrument(skip(self, order), fields(order_number = %order.order_number))]
    async fn append(&self, order: &Order) -> Result<(), StoreError> {
        let mut rows = self.rows.write().await;
        if Self::position(&rows, &order.order_number).is_some() {
            return Err(StoreError::Duplicate(order.order_number.clone()));
        }
        rows.push(order_row::to_row(order));
        debug!(row = rows.len() + 1, "order row appended");
        Ok(())
    }

    async fn update_status(
        &self,
        order_number: &str,
        status: OrderStatus,
        payment_reference: Option<String>,
    ) -> Result<Order, StoreError> {
        let mut rows = self.rows.write().await;
        let idx = Self::position(&rows, order_number)
            .ok_or_else(|| StoreError::NotFound(order_number.to_string()))?;

        let row = &mut rows[idx];
        row[STATUS_COL] = status.label().to_string();
        if let Some(reference) = payment_reference {
            row[PAYMENT_REFERENCE_COL] = reference;
        }
        order_row::from_row(row)
    }

    async fn list(&self) -> Result<Vec<Order>, StoreError> {
        let rows = self.rows.read().await;
        rows.iter().map(|row| order_row::from_row(row)).collect()
    }

    fn backend_name(&self) -> &'static str {
        "sheet"
    }
}
