use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Restaurant Orders API",
        version = "0.1.0",
        description = r#"
# Restaurant Orders API

Storefront catalog and order lifecycle for a single restaurant.

## Order flow

1. `GET /api/v1/products` lists the menu.
2. `POST /api/v1/orders` submits a checkout. Cash and bank transfer orders are
   saved as `Pending` and the customer gets a confirmation SMS. GCash orders
   are saved as `Awaiting Payment` and the response carries a `paymentUrl`.
3. The payment gateway posts `source.chargeable` / `source.failed` events to
   `POST /api/v1/payments/webhook`, which moves the order to `Paid` or
   `Payment Failed`.
4. Staff move orders through `Preparing`, `Out for Delivery` and `Delivered`
   with `PUT /api/v1/orders/{order_number}/status`; each step sends the
   customer a push notification.

## Errors

```json
{
  "success": false,
  "error": "Validation error: bank transfer requires a payment reference",
  "requestId": "req-abc123xyz",
  "timestamp": "2024-12-09T10:30:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Orders", description = "Order submission and status"),
        (name = "Payments", description = "GCash sources and gateway webhooks"),
        (name = "Catalog", description = "Menu listing"),
        (name = "Health", description = "Health check endpoints")
    ),
    paths(
        // Orders
        handlers::orders::create_order,
        handlers::orders::get_order,
        handlers::orders::update_order_status,
        handlers::orders::order_status_event,

        // Payments
        handlers::payments::get_payment_source,
        handlers::payment_webhooks::payment_webhook,

        // Catalog
        handlers::catalog::list_products,

        // Health
        handlers::health::health_check,
    ),
    components(
        schemas(
            // Order types
            crate::models::Order,
            crate::models::OrderStatus,
            crate::models::CustomerDetails,
            crate::models::OrderTotals,
            crate::services::pricing::OrderLine,
            crate::services::orders::SmsStatus,
            crate::services::order_status::StatusChange,
            crate::services::order_status::ExternalEditResult,
            handlers::orders::CreateOrderRequest,
            handlers::orders::CreateOrderResponse,
            handlers::orders::StatusRequest,

            // Payments types
            crate::models::PaymentSource,
            crate::services::payments::PaymentStatus,
            crate::services::payment_webhooks::WebhookAck,

            // Catalog types
            crate::models::ProductWire,
            crate::models::SizeOption,
            handlers::catalog::ProductsResponse,

            // Error types
            crate::errors::ErrorResponse,
            handlers::health::HealthResponse,
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_order_lifecycle_paths() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Restaurant Orders API"));
        assert!(json.contains("/api/v1/orders"));
        assert!(json.contains("/api/v1/orders/{order_number}/status"));
        assert!(json.contains("/api/v1/payments/webhook"));
        assert!(json.contains("/api/v1/products"));
    }
}
