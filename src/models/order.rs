use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

/// Lifecycle status of an order. Labels are what the order sheet shows.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    EnumString,
    Display,
    IntoStaticStr,
    Serialize,
    Deserialize,
    ToSchema,
)]
#[strum(ascii_case_insensitive)]
pub enum OrderStatus {
    #[strum(serialize = "Pending")]
    #[serde(rename = "Pending")]
    Pending,
    #[strum(serialize = "Awaiting Payment")]
    #[serde(rename = "Awaiting Payment")]
    AwaitingPayment,
    #[strum(serialize = "Paid")]
    #[serde(rename = "Paid")]
    Paid,
    #[strum(serialize = "Payment Failed")]
    #[serde(rename = "Payment Failed")]
    PaymentFailed,
    #[strum(serialize = "Preparing")]
    #[serde(rename = "Preparing")]
    Preparing,
    #[strum(serialize = "Out for Delivery")]
    #[serde(rename = "Out for Delivery")]
    OutForDelivery,
    #[strum(serialize = "Delivered")]
    #[serde(rename = "Delivered")]
    Delivered,
}

impl OrderStatus {
    pub fn label(&self) -> &'static str {
        self.into()
    }

    /// Parses a label, ignoring case and surrounding whitespace.
    pub fn parse_label(raw: &str) -> Option<Self> {
        Self::from_str(raw.trim()).ok()
    }

    /// Whether a manual change from `self` to `next` is allowed.
    /// Re-applying the current status is accepted and treated as a no-op by callers.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;

        if *self == next {
            return true;
        }

        matches!(
            (self, next),
            (Pending, AwaitingPayment)
                | (Pending, Paid)
                | (Pending, Preparing)
                | (AwaitingPayment, Paid)
                | (AwaitingPayment, PaymentFailed)
                | (Paid, Preparing)
                | (Preparing, OutForDelivery)
                | (OutForDelivery, Delivered)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::PaymentFailed)
    }

    /// Statuses the customer gets a push notification for.
    pub fn notifies_customer(&self) -> bool {
        matches!(
            self,
            OrderStatus::Preparing | OrderStatus::OutForDelivery | OrderStatus::Delivered
        )
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("unknown payment method: {0}")]
pub struct UnknownPaymentMethod(pub String);

/// How the customer pays.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PaymentMethod {
    CashOnDelivery,
    BankTransfer { reference: Option<String> },
    GCash,
}

impl PaymentMethod {
    pub fn is_gcash(&self) -> bool {
        matches!(self, PaymentMethod::GCash)
    }

    pub fn is_bank_transfer(&self) -> bool {
        matches!(self, PaymentMethod::BankTransfer { .. })
    }

    /// Short key used by the storefront form (`cash`, `bank`, `gcash`).
    pub fn key(&self) -> &'static str {
        match self {
            PaymentMethod::CashOnDelivery => "cash",
            PaymentMethod::BankTransfer { .. } => "bank",
            PaymentMethod::GCash => "gcash",
        }
    }

    /// Attaches a bank reference; blank references are dropped. No effect on other methods.
    pub fn with_reference(self, reference: Option<&str>) -> Self {
        match self {
            PaymentMethod::BankTransfer { reference: existing } => {
                let supplied = reference
                    .map(str::trim)
                    .filter(|r| !r.is_empty() && !r.eq_ignore_ascii_case("N/A"))
                    .map(str::to_string);
                PaymentMethod::BankTransfer {
                    reference: supplied.or(existing),
                }
            }
            other => other,
        }
    }

    pub fn bank_reference(&self) -> Option<&str> {
        match self {
            PaymentMethod::BankTransfer { reference } => reference.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::CashOnDelivery => write!(f, "Cash on Delivery"),
            PaymentMethod::BankTransfer {
                reference: Some(reference),
            } => write!(f, "Bank Transfer (Ref: {})", reference),
            PaymentMethod::BankTransfer { reference: None } => write!(f, "Bank Transfer"),
            PaymentMethod::GCash => write!(f, "GCash"),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = UnknownPaymentMethod;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let lower = trimmed.to_ascii_lowercase();

        match lower.as_str() {
            "cash" | "cash on delivery" | "cod" => return Ok(PaymentMethod::CashOnDelivery),
            "gcash" => return Ok(PaymentMethod::GCash),
            "bank" | "bank transfer" => return Ok(PaymentMethod::BankTransfer { reference: None }),
            _ => {}
        }

        // "Bank Transfer (Ref: ABC123)"
        if lower.starts_with("bank transfer (ref:") && trimmed.ends_with(')') {
            let start = "bank transfer (ref:".len();
            let reference = trimmed[start..trimmed.len() - 1].trim();
            return Ok(PaymentMethod::BankTransfer {
                reference: (!reference.is_empty()).then(|| reference.to_string()),
            });
        }

        Err(UnknownPaymentMethod(trimmed.to_string()))
    }
}

fn validate_optional_email(email: &str) -> Result<(), ValidationError> {
    if email.trim().is_empty() || validator::validate_email(email.trim()) {
        Ok(())
    } else {
        Err(ValidationError::new("email"))
    }
}

/// Contact and delivery details captured at checkout.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetails {
    #[validate(length(min = 1, message = "Full name is required"))]
    #[serde(default)]
    pub full_name: String,
    #[validate(custom = "validate_optional_email")]
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    /// Barangay / area code
    #[serde(default)]
    pub barangay: String,
}

impl CustomerDetails {
    pub fn has_phone(&self) -> bool {
        !self.phone.trim().is_empty()
    }
}

/// Money breakdown of an order. `total = subtotal + delivery_fee + tax`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    #[schema(value_type = String, example = "28.97")]
    pub subtotal: Decimal,
    #[schema(value_type = String, example = "4.99")]
    pub delivery_fee: Decimal,
    #[schema(value_type = String, example = "2.32")]
    pub tax: Decimal,
    #[schema(value_type = String, example = "36.28")]
    pub total: Decimal,
}

/// A persisted order record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub created_at: DateTime<Utc>,
    pub order_number: String,
    #[serde(flatten)]
    pub customer: CustomerDetails,
    /// Display label, e.g. "Bank Transfer (Ref: 12345)"
    pub payment_method: String,
    /// Gateway source id, bank reference, or "N/A"
    pub payment_reference: String,
    /// Rendered items summary
    pub items: String,
    #[schema(value_type = String)]
    pub subtotal: Decimal,
    #[schema(value_type = String)]
    pub delivery_fee: Decimal,
    #[schema(value_type = String)]
    pub tax: Decimal,
    #[schema(value_type = String)]
    pub total: Decimal,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<String>,
}

impl Order {
    pub fn totals(&self) -> OrderTotals {
        OrderTotals {
            subtotal: self.subtotal,
            delivery_fee: self.delivery_fee,
            tax: self.tax,
            total: self.total,
        }
    }

    /// Push subscriber id, if the customer opted in.
    pub fn subscriber(&self) -> Option<&str> {
        self.player_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    pub fn is_gcash(&self) -> bool {
        self.payment_method.eq_ignore_ascii_case("gcash")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use strum::IntoEnumIterator;

    #[rstest]
    #[case("pending", OrderStatus::Pending)]
    #[case("AWAITING PAYMENT", OrderStatus::AwaitingPayment)]
    #[case(" Out for delivery ", OrderStatus::OutForDelivery)]
    #[case("payment failed", OrderStatus::PaymentFailed)]
    fn parses_status_labels_case_insensitively(#[case] raw: &str, #[case] expected: OrderStatus) {
        assert_eq!(OrderStatus::parse_label(raw), Some(expected));
    }

    #[test]
    fn labels_round_trip() {
        for status in OrderStatus::iter() {
            assert_eq!(OrderStatus::parse_label(status.label()), Some(status));
            assert_eq!(status.to_string(), status.label());
        }
        assert_eq!(OrderStatus::parse_label("shipped"), None);
    }

    #[test]
    fn transition_table_is_exact() {
        use OrderStatus::*;
        let allowed = [
            (Pending, AwaitingPayment),
            (Pending, Paid),
            (Pending, Preparing),
            (AwaitingPayment, Paid),
            (AwaitingPayment, PaymentFailed),
            (Paid, Preparing),
            (Preparing, OutForDelivery),
            (OutForDelivery, Delivered),
        ];

        for from in OrderStatus::iter() {
            for to in OrderStatus::iter() {
                let expected = from == to || allowed.contains(&(from, to));
                assert_eq!(
                    from.can_transition_to(to),
                    expected,
                    "{} -> {}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn terminal_statuses_have_no_exits() {
        for status in OrderStatus::iter().filter(OrderStatus::is_terminal) {
            assert!(OrderStatus::iter()
                .filter(|next| *next != status)
                .all(|next| !status.can_transition_to(next)));
        }
    }

    #[rstest]
    #[case("cash", PaymentMethod::CashOnDelivery)]
    #[case("Cash on Delivery", PaymentMethod::CashOnDelivery)]
    #[case("GCash", PaymentMethod::GCash)]
    #[case("gcash", PaymentMethod::GCash)]
    #[case("bank", PaymentMethod::BankTransfer { reference: None })]
    #[case("Bank Transfer (Ref: BDO-778)", PaymentMethod::BankTransfer { reference: Some("BDO-778".into()) })]
    fn parses_payment_method_labels(#[case] raw: &str, #[case] expected: PaymentMethod) {
        assert_eq!(raw.parse::<PaymentMethod>().unwrap(), expected);
    }

    #[test]
    fn payment_method_labels() {
        assert_eq!(PaymentMethod::CashOnDelivery.to_string(), "Cash on Delivery");
        assert_eq!(PaymentMethod::GCash.to_string(), "GCash");
        let bank = PaymentMethod::BankTransfer { reference: None }.with_reference(Some(" 12345 "));
        assert_eq!(bank.to_string(), "Bank Transfer (Ref: 12345)");
        assert!("paypal".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn na_reference_is_not_a_reference() {
        let bank = PaymentMethod::BankTransfer { reference: None }.with_reference(Some("N/A"));
        assert_eq!(bank.bank_reference(), None);
    }

    #[test]
    fn customer_validation() {
        let mut customer = CustomerDetails {
            full_name: "Juan Dela Cruz".into(),
            email: String::new(),
            ..Default::default()
        };
        assert!(customer.validate().is_ok());

        customer.email = "not-an-email".into();
        assert!(customer.validate().is_err());

        customer.email = "juan@example.com".into();
        customer.full_name.clear();
        assert!(customer.validate().is_err());
    }
}
