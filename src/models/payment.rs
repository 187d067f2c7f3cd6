use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Gateway-side payment source (a GCash checkout).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSource {
    pub id: String,
    /// Amount in minor units (centavos)
    pub amount: i64,
    pub currency: String,
    /// Gateway status, e.g. `pending`, `chargeable`, `expired`
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkout_url: Option<String>,
}

impl PaymentSource {
    pub fn amount_major(&self) -> Decimal {
        Decimal::new(self.amount, 2)
    }
}

static SOURCE_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^src_[A-Za-z0-9_]+$").unwrap());

/// Gateway source ids are `src_` followed by word characters; anything else
/// never reaches a gateway URL.
pub fn is_valid_source_id(id: &str) -> bool {
    SOURCE_ID.is_match(id)
}

/// Converts a major-unit amount to minor units, rounding half away from zero.
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    amount
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .checked_mul(Decimal::ONE_HUNDRED)?
        .to_i64()
}
