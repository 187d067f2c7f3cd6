use async_trait::async_trait;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use std::str::FromStr;
use std::sync::Arc;
use tracing::instrument;

use super::order_row::format_amount;
use super::{OrderStore, StoreError};
use crate::entities::order::{self, Column, Entity as OrderEntity};
use crate::models::{CustomerDetails, Order, OrderStatus};

/// Order store backed by the `orders` table.
#[derive(Debug, Clone)]
pub struct SqlOrderStore {
    db: Arc<DatabaseConnection>,
}

impl SqlOrderStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    fn to_active_model(order: &Order) -> order::ActiveModel {
        order::ActiveModel {
            order_number: Set(order.order_number.clone()),
            created_at: Set(order.created_at),
            full_name: Set(order.customer.full_name.clone()),
            email: Set(order.customer.email.clone()),
            phone: Set(order.customer.phone.clone()),
            address: Set(order.customer.address.clone()),
            city: Set(order.customer.city.clone()),
            barangay: Set(order.customer.barangay.clone()),
            payment_method: Set(order.payment_method.clone()),
            payment_reference: Set(order.payment_reference.clone()),
            items: Set(order.items.clone()),
            subtotal: Set(format_amount(order.subtotal)),
            delivery_fee: Set(format_amount(order.delivery_fee)),
            tax: Set(format_amount(order.tax)),
            total: Set(format_amount(order.total)),
            status: Set(order.status.label().to_string()),
            player_id: Set(order.player_id.clone()),
        }
    }

    fn from_model(model: order::Model) -> Result<Order, StoreError> {
        let amount = |raw: &str| {
            Decimal::from_str(raw.trim())
                .map_err(|_| StoreError::MalformedRow(format!("bad amount {:?}", raw)))
        };
        let status = OrderStatus::parse_label(&model.status)
            .ok_or_else(|| StoreError::MalformedRow(format!("unknown status {:?}", model.status)))?;

        Ok(Order {
            created_at: model.created_at,
            customer: CustomerDetails {
                full_name: model.full_name,
                email: model.email,
                phone: model.phone,
                address: model.address,
                city: model.city,
                barangay: model.barangay,
            },
            payment_method: model.payment_method,
            payment_reference: model.payment_reference,
            items: model.items,
            subtotal: amount(&model.subtotal)?,
            delivery_fee: amount(&model.delivery_fee)?,
            tax: amount(&model.tax)?,
            total: amount(&model.total)?,
            status,
            player_id: model.player_id.filter(|id| !id.trim().is_empty()),
            order_number: model.order_number,
        })
    }

    async fn find_model(&self, order_number: &str) -> Result<Option<order::Model>, StoreError> {
        Ok(OrderEntity::find()
            .filter(Column::OrderNumber.eq(order_number))
            .one(&*self.db)
            .await?)
    }
}

#[async_trait]
impl OrderStore for SqlOrderStore {
    async fn find_by_order_number(&self, order_number: &str) -> Result<Option<Order>, StoreError> {
        self.find_model(order_number)
            .await?
            .map(Self::from_model)
            .transpose()
    }

    #[instrument(skip(self, order), fields(order_number = %order.order_number))]
    async fn append(&self, order: &Order) -> Result<(), StoreError> {
        if self.find_model(&order.order_number).await?.is_some() {
            return Err(StoreError::Duplicate(order.order_number.clone()));
        }
        Self::to_active_model(order).insert(&*self.db).await?;
        Ok(())
    }

    async fn update_status(
        &self,
        order_number: &str,
        status: OrderStatus,
        payment_reference: Option<String>,
    ) -> Result<Order, StoreError> {
        let model = self
            .find_model(order_number)
            .await?
            .ok_or_else(|| StoreError::NotFound(order_number.to_string()))?;

        let mut active = model.into_active_model();
        active.status = Set(status.label().to_string());
        if let Some(reference) = payment_reference {
            active.payment_reference = Set(reference);
        }

        let updated = active.update(&*self.db).await?;
        Self::from_model(updated)
    }

    async fn list(&self) -> Result<Vec<Order>, StoreError> {
        OrderEntity::find()
            .order_by_asc(Column::CreatedAt)
            .all(&*self.db)
            .await?
            .into_iter()
            .map(Self::from_model)
            .collect()
    }

    fn backend_name(&self) -> &'static str {
        "database"
    }
}
