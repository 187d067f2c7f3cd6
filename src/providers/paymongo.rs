use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{info, instrument, warn};

use super::{http_client, CreateSourceRequest, GatewayError, PaymentGateway};
use crate::config::PaymongoConfig;
use crate::models::payment::is_valid_source_id;
use crate::models::PaymentSource;

/// PayMongo sources API client.
#[derive(Clone)]
pub struct PaymongoGateway {
    client: reqwest::Client,
    api_base: String,
    authorization: String,
}

#[derive(Debug, Deserialize)]
struct SourceEnvelope {
    data: SourceData,
}

#[derive(Debug, Deserialize)]
struct SourceData {
    id: String,
    attributes: SourceAttributes,
}

#[derive(Debug, Deserialize)]
struct SourceAttributes {
    amount: i64,
    #[serde(default)]
    currency: String,
    status: String,
    #[serde(default)]
    redirect: Option<SourceRedirect>,
}

#[derive(Debug, Deserialize)]
struct SourceRedirect {
    #[serde(default)]
    checkout_url: Option<String>,
}

impl From<SourceEnvelope> for PaymentSource {
    fn from(envelope: SourceEnvelope) -> Self {
        let SourceData { id, attributes } = envelope.data;
        PaymentSource {
            id,
            amount: attributes.amount,
            currency: attributes.currency,
            status: attributes.status,
            checkout_url: attributes.redirect.and_then(|r| r.checkout_url),
        }
    }
}

impl PaymongoGateway {
    pub fn new(config: &PaymongoConfig, timeout: Duration) -> Result<Self, GatewayError> {
        Ok(Self {
            client: http_client(timeout)?,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            authorization: format!("Basic {}", STANDARD.encode(format!("{}:", config.secret_key))),
        })
    }

    async fn read_source(response: reqwest::Response) -> Result<PaymentSource, GatewayError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(status = status.as_u16(), body = %body, "PayMongo returned an error");
            return Err(GatewayError::Api {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str::<SourceEnvelope>(&body)
            .map(PaymentSource::from)
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl PaymentGateway for PaymongoGateway {
    #[instrument(skip(self, request), fields(order_number = %request.order_number, amount = request.amount))]
    async fn create_gcash_source(
        &self,
        request: CreateSourceRequest,
    ) -> Result<PaymentSource, GatewayError> {
        let payload = json!({
            "data": {
                "attributes": {
                    "amount": request.amount,
                    "currency": request.currency,
                    "type": "gcash",
                    "redirect": {
                        "success": request.success_url,
                        "failed": request.failed_url,
                    },
                    "billing": request.billing,
                    "metadata": { "order_number": request.order_number },
                }
            }
        });

        let response = self
            .client
            .post(format!("{}/sources", self.api_base))
            .header(reqwest::header::AUTHORIZATION, &self.authorization)
            .json(&payload)
            .send()
            .await?;

        let source = Self::read_source(response).await?;
        info!(source_id = %source.id, "GCash source created");
        Ok(source)
    }

    #[instrument(skip(self))]
    async fn get_source(&self, source_id: &str) -> Result<PaymentSource, GatewayError> {
        if !is_valid_source_id(source_id) {
            return Err(GatewayError::InvalidSourceId(source_id.to_string()));
        }
        let response = self
            .client
            .get(format!("{}/sources/{}", self.api_base, source_id))
            .header(reqwest::header::AUTHORIZATION, &self.authorization)
            .send()
            .await?;

        Self::read_source(response).await
    }
}
