use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::models::{Product, ProductWire};
use crate::{errors::ServiceError, AppState};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct CatalogQuery {
    /// `checkPayment` to query a payment source instead of listing products
    pub action: Option<String>,
    pub source_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductsResponse {
    pub success: bool,
    #[schema(value_type = Vec<ProductWire>)]
    pub products: Vec<Product>,
}

#[utoipa::path(
    get,
    path = "/api/v1/products",
    summary = "List products",
    description = "Product catalog. With action=checkPayment&sourceId=... returns the payment source status instead.",
    params(CatalogQuery),
    responses(
        (status = 200, description = "Catalog", body = ProductsResponse),
        (status = 400, description = "Unknown action", body = crate::errors::ErrorResponse),
    ),
    tag = "Catalog"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Result<Response, ServiceError> {
    match query.action.as_deref() {
        None | Some("") => Ok(Json(ProductsResponse {
            success: true,
            products: state.services.catalog.list(),
        })
        .into_response()),
        Some("checkPayment") => {
            let source_id = query.source_id.unwrap_or_default();
            let status = state.services.payments.check_payment(&source_id).await?;
            Ok(Json(status).into_response())
        }
        Some(other) => Err(ServiceError::BadRequest(format!("Unknown action: {}", other))),
    }
}

pub fn catalog_routes() -> Router<AppState> {
    Router::new().route("/", get(list_products))
}
