use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

use crate::errors::ServiceError;
use crate::models::payment::is_valid_source_id;
use crate::providers::PaymentGateway;

/// Gateway-side status of a payment source, amount in major units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PaymentStatus {
    pub success: bool,
    pub status: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64, example = 36.28)]
    pub amount: Decimal,
}

#[derive(Clone)]
pub struct PaymentService {
    gateway: Arc<dyn PaymentGateway>,
}

impl PaymentService {
    pub fn new(gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { gateway }
    }

    #[instrument(skip(self))]
    pub async fn check_payment(&self, source_id: &str) -> Result<PaymentStatus, ServiceError> {
        let source_id = source_id.trim();
        if source_id.is_empty() {
            return Err(ServiceError::ValidationError(
                "sourceId is required".to_string(),
            ));
        }
        if !is_valid_source_id(source_id) {
            return Err(ServiceError::ValidationError(format!(
                "Invalid sourceId: {}",
                source_id
            )));
        }

        let source = self.gateway.get_source(source_id).await?;
        Ok(PaymentStatus {
            success: true,
            status: source.status.clone(),
            amount: source.amount_major(),
        })
    }
}
