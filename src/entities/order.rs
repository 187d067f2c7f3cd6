use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// The `orders` table. Money columns are stored as text, the same way the
/// order sheet holds them, so values round-trip exactly on every backend.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub order_number: String,
    pub created_at: DateTime<Utc>,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub barangay: String,
    pub payment_method: String,
    pub payment_reference: String,
    #[sea_orm(column_type = "Text")]
    pub items: String,
    pub subtotal: String,
    pub delivery_fee: String,
    pub tax: String,
    pub total: String,
    pub status: String,
    pub player_id: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
