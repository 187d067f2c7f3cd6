//! Fixed 17-column layout of an order row, shared by the sheet store and
//! snapshot import/export.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;

use super::StoreError;
use crate::models::{CustomerDetails, Order, OrderStatus};

pub const HEADERS: [&str; 17] = [
    "Timestamp",
    "Order Number",
    "Full Name",
    "Email",
    "Phone",
    "Address",
    "City",
    "Barangay",
    "Payment Method",
    "Payment Reference",
    "Items",
    "Subtotal",
    "Delivery Fee",
    "Tax",
    "Total",
    "Status",
    "Player ID",
];

pub const ORDER_NUMBER_COL: usize = 1;
pub const PAYMENT_REFERENCE_COL: usize = 9;
pub const STATUS_COL: usize = 15;
pub const PLAYER_ID_COL: usize = 16;

/// Columns a row must have; the trailing player id may be absent.
const REQUIRED_COLUMNS: usize = PLAYER_ID_COL;

pub fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", amount)
}

pub fn to_row(order: &Order) -> Vec<String> {
    vec![
        order.created_at.to_rfc3339(),
        order.order_number.clone(),
        order.customer.full_name.clone(),
        order.customer.email.clone(),
        order.customer.phone.clone(),
        order.customer.address.clone(),
        order.customer.city.clone(),
        order.customer.barangay.clone(),
        order.payment_method.clone(),
        order.payment_reference.clone(),
        order.items.clone(),
        format_amount(order.subtotal),
        format_amount(order.delivery_fee),
        format_amount(order.tax),
        format_amount(order.total),
        order.status.label().to_string(),
        order.player_id.clone().unwrap_or_default(),
    ]
}

fn parse_amount(row: &[String], col: usize) -> Result<Decimal, StoreError> {
    let raw = row[col].trim();
    if raw.is_empty() {
        return Ok(Decimal::ZERO);
    }
    Decimal::from_str(raw)
        .map_err(|_| StoreError::MalformedRow(format!("{} is not an amount: {:?}", HEADERS[col], raw)))
}

pub fn from_row(row: &[String]) -> Result<Order, StoreError> {
    if row.len() < REQUIRED_COLUMNS {
        return Err(StoreError::MalformedRow(format!(
            "expected at least {} columns, got {}",
            REQUIRED_COLUMNS,
            row.len()
        )));
    }

    let created_at = DateTime::parse_from_rfc3339(row[0].trim())
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StoreError::MalformedRow(format!("bad timestamp {:?}: {}", row[0], e)))?;

    let status = OrderStatus::parse_label(&row[STATUS_COL]).ok_or_else(|| {
        StoreError::MalformedRow(format!("unknown status {:?}", row[STATUS_COL]))
    })?;

    let player_id = row
        .get(PLAYER_ID_COL)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    Ok(Order {
        created_at,
        order_number: row[ORDER_NUMBER_COL].clone(),
        customer: CustomerDetails {
            full_name: row[2].clone(),
            email: row[3].clone(),
            phone: row[4].clone(),
            address: row[5].clone(),
            city: row[6].clone(),
            barangay: row[7].clone(),
        },
        payment_method: row[8].clone(),
        payment_reference: row[PAYMENT_REFERENCE_COL].clone(),
        items: row[10].clone(),
        subtotal: parse_amount(row, 11)?,
        delivery_fee: parse_amount(row, 12)?,
        tax: parse_amount(row, 13)?,
        total: parse_amount(row, 14)?,
        status,
        player_id,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    pub(crate) fn sample_order(order_number: &str) -> Order {
        Order {
            created_at: Utc.with_ymd_and_hms(2024, 12, 9, 10, 30, 0).unwrap(),
            order_number: order_number.to_string(),
            customer: CustomerDetails {
                full_name: "Maria Santos".into(),
                email: "maria@example.com".into(),
                phone: "0917 123 4567".into(),
                address: "12 Mabini St".into(),
                city: "Quezon City".into(),
                barangay: "1100".into(),
            },
            payment_method: "Cash on Delivery".into(),
            payment_reference: "N/A".into(),
            items: "Margherita Pizza (Medium) (x2) - Php 25.98, Coca Cola (x1) - Php 2.99".into(),
            subtotal: dec!(28.97),
            delivery_fee: dec!(4.99),
            tax: dec!(2.32),
            total: dec!(36.28),
            status: OrderStatus::Pending,
            player_id: Some("player-1".into()),
        }
    }

    #[test]
    fn row_has_fixed_layout() {
        let row = to_row(&sample_order("ORD-1"));
        assert_eq!(row.len(), HEADERS.len());
        assert_eq!(row[ORDER_NUMBER_COL], "ORD-1");
        assert_eq!(row[14], "36.28");
        assert_eq!(row[STATUS_COL], "Pending");
        assert_eq!(row[PLAYER_ID_COL], "player-1");
    }

    #[test]
    fn reads_back_what_it_writes() {
        let order = sample_order("ORD-2");
        assert_eq!(from_row(&to_row(&order)).unwrap(), order);
    }

    #[test]
    fn tolerates_missing_or_empty_player_id() {
        let mut order = sample_order("ORD-3");
        order.player_id = None;

        let mut row = to_row(&order);
        assert_eq!(from_row(&row).unwrap().player_id, None);

        row.pop();
        assert_eq!(row.len(), 16);
        assert_eq!(from_row(&row).unwrap(), order);
    }

    #[test]
    fn rejects_short_rows_and_bad_status() {
        let row: Vec<String> = vec!["x".into(); 10];
        assert_matches!(from_row(&row), Err(StoreError::MalformedRow(_)));

        let mut row = to_row(&sample_order("ORD-4"));
        row[STATUS_COL] = "Shipped".into();
        assert_matches!(from_row(&row), Err(StoreError::MalformedRow(_)));
    }
}
