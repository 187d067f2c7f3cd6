use axum::{
    extract::{Path, State},
    response::Json,
    routing::get,
    Router,
};

use crate::services::payments::PaymentStatus;
use crate::{errors::ServiceError, AppState};

#[utoipa::path(
    get,
    path = "/api/v1/payments/sources/{source_id}",
    summary = "Check payment source",
    params(("source_id" = String, Path, description = "Gateway source id")),
    responses(
        (status = 200, description = "Source status", body = PaymentStatus),
        (status = 400, description = "Malformed source id", body = crate::errors::ErrorResponse),
        (status = 502, description = "Payment gateway failure", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn get_payment_source(
    State(state): State<AppState>,
    Path(source_id): Path<String>,
) -> Result<Json<PaymentStatus>, ServiceError> {
    let status = state.services.payments.check_payment(&source_id).await?;
    Ok(Json(status))
}

pub fn payments_routes() -> Router<AppState> {
    Router::new()
        .route("/sources/:source_id", get(get_payment_source))
        .merge(super::payment_webhooks::webhook_routes())
}
