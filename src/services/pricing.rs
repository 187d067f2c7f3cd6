//! Order money math and the human-readable items summary.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::PricingConfig;
use crate::models::OrderTotals;

/// Largest discrepancy tolerated between client-side and server-side totals.
pub const TOTALS_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// One priced line of an order, as sent by the storefront.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    #[schema(value_type = String, example = "12.99")]
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl OrderLine {
    /// `None` when the amount does not fit in a `Decimal`.
    pub fn line_total(&self) -> Option<Decimal> {
        self.unit_price.checked_mul(Decimal::from(self.quantity))
    }

    /// `Margherita Pizza (Medium) (x2) - Php 25.98`
    pub fn summary(&self, currency_label: &str) -> Option<String> {
        let variant = self
            .variant
            .as_deref()
            .map(|v| format!(" ({})", v))
            .unwrap_or_default();
        Some(format!(
            "{}{} (x{}) - {} {:.2}",
            self.name,
            variant,
            self.quantity,
            currency_label,
            self.line_total()?
        ))
    }
}

pub fn subtotal<'a>(lines: impl IntoIterator<Item = &'a OrderLine>) -> Option<Decimal> {
    lines
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, line| acc.checked_add(line.line_total()?))
}

pub fn summarize(lines: &[OrderLine], currency_label: &str) -> Option<String> {
    let parts = lines
        .iter()
        .map(|line| line.summary(currency_label))
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join(", "))
}

/// Tax is charged on the subtotal only and rounded once, half away from zero.
/// `None` when any term overflows.
pub fn compute_totals(subtotal: Decimal, pricing: &PricingConfig) -> Option<OrderTotals> {
    let tax = subtotal
        .checked_mul(pricing.tax_rate)?
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let total = subtotal
        .checked_add(pricing.delivery_fee)?
        .checked_add(tax)?;
    Some(OrderTotals {
        subtotal,
        delivery_fee: pricing.delivery_fee,
        tax,
        total,
    })
}

pub fn within_tolerance(a: Decimal, b: Decimal) -> bool {
    a.checked_sub(b)
        .map_or(false, |diff| diff.abs() <= TOTALS_TOLERANCE)
}
