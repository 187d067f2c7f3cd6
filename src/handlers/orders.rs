use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::str::FromStr;
use tracing::info;
use utoipa::ToSchema;

use super::payment_webhooks::signature_header;
use crate::errors::ServiceError;
use crate::models::{CustomerDetails, Order, OrderTotals, PaymentMethod};
use crate::services::order_status::{ExternalEditResult, StatusChange};
use crate::services::orders::{OrderSubmission, SmsStatus, SubmissionItems, SubmissionResult};
use crate::services::pricing::OrderLine;
use crate::{ApiResponse, AppState};

/// Money fields arrive as `"36.28"` or `36.28`.
fn amount<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Decimal::from_str(s.trim())
            .map(Some)
            .map_err(|_| de::Error::custom(format!("invalid amount: {s}"))),
        Some(Value::Number(n)) => {
            let raw = n.to_string();
            Decimal::from_str(&raw)
                .or_else(|_| Decimal::from_scientific(&raw))
                .map(Some)
                .map_err(|_| de::Error::custom(format!("invalid amount: {raw}")))
        }
        Some(other) => Err(de::Error::custom(format!("invalid amount: {other}"))),
    }
}

/// Checkout payload posted by the storefront.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(flatten)]
    pub customer: CustomerDetails,
    /// `cash`, `bank`, `gcash` or a display label
    #[schema(example = "Cash on Delivery")]
    pub payment_method: String,
    #[serde(default)]
    pub payment_reference: Option<String>,
    #[serde(default)]
    pub player_id: Option<String>,
    /// Pre-rendered items summary
    #[serde(default)]
    pub items: Option<String>,
    /// Structured cart lines; preferred over `items` when present
    #[serde(default)]
    pub lines: Option<Vec<OrderLine>>,
    #[serde(default, deserialize_with = "amount")]
    #[schema(value_type = Option<String>, example = "28.97")]
    pub subtotal: Option<Decimal>,
    #[serde(default, deserialize_with = "amount")]
    #[schema(value_type = Option<String>, example = "4.99")]
    pub delivery_fee: Option<Decimal>,
    #[serde(default, deserialize_with = "amount")]
    #[schema(value_type = Option<String>, example = "2.32")]
    pub tax: Option<Decimal>,
    #[serde(default, deserialize_with = "amount")]
    #[schema(value_type = Option<String>, example = "36.28")]
    pub total: Option<Decimal>,
}

impl CreateOrderRequest {
    fn client_totals(&self) -> Option<OrderTotals> {
        Some(OrderTotals {
            subtotal: self.subtotal?,
            delivery_fee: self.delivery_fee?,
            tax: self.tax?,
            total: self.total?,
        })
    }

    pub fn into_submission(self) -> Result<OrderSubmission, ServiceError> {
        let payment_method = PaymentMethod::from_str(&self.payment_method)
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?
            .with_reference(self.payment_reference.as_deref());
        let client_totals = self.client_totals();

        let items = match self.lines {
            Some(lines) if !lines.is_empty() => SubmissionItems::Lines(lines),
            _ => {
                let summary = self.items.unwrap_or_default();
                let subtotal = match self.subtotal {
                    Some(subtotal) => subtotal,
                    None if summary.trim().is_empty() => Decimal::ZERO,
                    None => {
                        return Err(ServiceError::ValidationError(
                            "subtotal is required with an items summary".to_string(),
                        ))
                    }
                };
                SubmissionItems::Summary { summary, subtotal }
            }
        };

        Ok(OrderSubmission {
            customer: self.customer,
            payment_method,
            payment_reference: self.payment_reference,
            player_id: self.player_id,
            items,
            client_totals,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub success: bool,
    pub order_number: String,
    pub sms_status: SmsStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_payment: Option<bool>,
}

impl From<SubmissionResult> for CreateOrderResponse {
    fn from(result: SubmissionResult) -> Self {
        Self {
            success: true,
            order_number: result.order_number,
            sms_status: result.sms_status,
            payment_url: result.payment_url,
            source_id: result.source_id,
            requires_payment: result.requires_payment.then_some(true),
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StatusRequest {
    #[schema(example = "Preparing")]
    pub status: String,
}

fn is_webhook_payload(payload: &Value) -> bool {
    payload
        .get("type")
        .and_then(Value::as_str)
        .is_some_and(|t| t.starts_with("source."))
}

/// Creates an order. Gateway events posted to the same endpoint are
/// handed to the payment webhook handler.
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    summary = "Submit order",
    description = "Submit a checkout. GCash orders return a payment URL and requiresPayment = true.",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = CreateOrderResponse,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 200, description = "Gateway event acknowledged", body = crate::services::payment_webhooks::WebhookAck),
        (status = 400, description = "Invalid order", body = crate::errors::ErrorResponse),
        (status = 502, description = "Payment gateway failure", body = crate::errors::ErrorResponse),
    ),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ServiceError> {
    let payload: Value = serde_json::from_slice(&body)
        .map_err(|e| ServiceError::BadRequest(format!("invalid json: {}", e)))?;

    if is_webhook_payload(&payload) {
        info!("gateway event received on orders endpoint");
        let ack = state
            .services
            .payment_webhooks
            .handle_raw(signature_header(&headers), &body)
            .await?;
        return Ok((StatusCode::OK, Json(ack)).into_response());
    }

    let request: CreateOrderRequest = serde_json::from_value(payload)
        .map_err(|e| ServiceError::BadRequest(format!("invalid order: {}", e)))?;
    let result = state.services.orders.submit(request.into_submission()?).await?;

    Ok((StatusCode::CREATED, Json(CreateOrderResponse::from(result))).into_response())
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{order_number}",
    summary = "Get order",
    params(("order_number" = String, Path, description = "Order number, e.g. ORD-1733740200000")),
    responses(
        (status = 200, description = "Order found", body = Order),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
) -> Result<Json<ApiResponse<Order>>, ServiceError> {
    let order = state.services.orders.get_order(&order_number).await?;
    Ok(Json(ApiResponse::success(order)))
}

#[utoipa::path(
    put,
    path = "/api/v1/orders/{order_number}/status",
    summary = "Change order status",
    description = "Manual status change, validated against the order state machine. Fulfilment statuses notify the customer.",
    params(("order_number" = String, Path, description = "Order number")),
    request_body = StatusRequest,
    responses(
        (status = 200, description = "Status updated", body = StatusChange),
        (status = 400, description = "Unknown status", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Transition not allowed", body = crate::errors::ErrorResponse),
    ),
    tag = "Orders"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
    Json(request): Json<StatusRequest>,
) -> Result<Json<ApiResponse<StatusChange>>, ServiceError> {
    let change = state
        .services
        .order_status
        .update_status(&order_number, &request.status)
        .await?;
    Ok(Json(ApiResponse::success(change)))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/{order_number}/status-events",
    summary = "Status edited elsewhere",
    description = "Notifies the customer about a status that was already changed in the order sheet.",
    params(("order_number" = String, Path, description = "Order number")),
    request_body = StatusRequest,
    responses(
        (status = 200, description = "Event handled", body = ExternalEditResult),
    ),
    tag = "Orders"
)]
pub async fn order_status_event(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
    Json(request): Json<StatusRequest>,
) -> Result<Json<ApiResponse<ExternalEditResult>>, ServiceError> {
    let result = state
        .services
        .order_status
        .handle_external_edit(&order_number, &request.status)
        .await?;
    Ok(Json(ApiResponse::success(result)))
}

pub fn orders_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_order))
        .route("/:order_number", get(get_order))
        .route("/:order_number/status", put(update_order_status))
        .route("/:order_number/status-events", post(order_status_event))
}
