//! Property-based tests for cart arithmetic, order totals and order-status
//! label parsing.

use proptest::prelude::*;
use restaurant_orders::config::PricingConfig;
use restaurant_orders::models::payment::to_minor_units;
use restaurant_orders::models::{OrderStatus, Product, SizeOption};
use restaurant_orders::services::pricing::{compute_totals, within_tolerance};
use restaurant_orders::storefront::Cart;
use rust_decimal::Decimal;
use std::collections::HashMap;

fn price_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..100_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn menu() -> Vec<Product> {
    vec![
        Product::sized(
            1,
            "Margherita Pizza",
            "Pizza",
            vec![
                SizeOption::new("Small", Decimal::new(999, 2)),
                SizeOption::new("Medium", Decimal::new(1299, 2)),
                SizeOption::new("Large", Decimal::new(1599, 2)),
            ],
        ),
        Product::flat(16, "Coca Cola", "Drinks", Decimal::new(299, 2)),
        Product::flat(20, "Garlic Bread", "Sides", Decimal::new(450, 2)),
    ]
}

/// (product index, size index) pairs; the size index is ignored for flat products.
fn picks_strategy() -> impl Strategy<Value = Vec<(usize, usize)>> {
    prop::collection::vec((0usize..3, 0usize..3), 0..40)
}

#[derive(Clone, Debug)]
enum CartOp {
    Add(usize, usize),
    Remove(usize, usize),
    Update(usize, usize, u32),
}

fn ops_strategy() -> impl Strategy<Value = Vec<CartOp>> {
    let op = prop_oneof![
        3 => (0usize..3, 0usize..3).prop_map(|(p, s)| CartOp::Add(p, s)),
        1 => (0usize..3, 0usize..3).prop_map(|(p, s)| CartOp::Remove(p, s)),
        1 => (0usize..3, 0usize..3, 0u32..6).prop_map(|(p, s, q)| CartOp::Update(p, s, q)),
    ];
    prop::collection::vec(op, 0..60)
}

type Expected = HashMap<(i64, Option<String>), (Decimal, u32)>;

/// Applies `ops` to a cart and to a plain map of expected lines.
fn run_ops(ops: &[CartOp]) -> Result<(Cart, Expected), TestCaseError> {
    let menu = menu();
    let mut cart = Cart::new();
    let mut expected = Expected::new();

    let pick = |p: usize, s: usize| {
        let product = &menu[p];
        match product.sizes().get(s) {
            Some(size) => (product, Some(size.name.clone()), size.price),
            None => (product, None, product.flat_price().unwrap_or_default()),
        }
    };

    for op in ops {
        match *op {
            CartOp::Add(p, s) => {
                let (product, variant, price) = pick(p, s);
                cart.add_item(product, variant.as_deref()).unwrap();
                expected.entry((product.id, variant)).or_insert((price, 0)).1 += 1;
            }
            CartOp::Remove(p, s) => {
                let (product, variant, _) = pick(p, s);
                cart.remove_item(product.id, variant.as_deref());
                expected.remove(&(product.id, variant));
            }
            CartOp::Update(p, s, qty) => {
                let (product, variant, _) = pick(p, s);
                let result = cart.update_quantity(product.id, qty, variant.as_deref());
                let key = (product.id, variant);
                if qty == 0 {
                    expected.remove(&key);
                } else if let Some(entry) = expected.get_mut(&key) {
                    prop_assert!(result.is_ok());
                    entry.1 = qty;
                } else {
                    prop_assert!(result.is_err());
                }
            }
        }
    }
    Ok((cart, expected))
}

fn fill(picks: &[(usize, usize)]) -> Cart {
    let menu = menu();
    let mut cart = Cart::new();
    for &(p, s) in picks {
        let product = &menu[p];
        let size = product.sizes().get(s).map(|size| size.name.clone());
        cart.add_item(product, size.as_deref()).unwrap();
    }
    cart
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn cart_count_matches_adds(picks in picks_strategy()) {
        let cart = fill(&picks);
        prop_assert_eq!(cart.total_item_count() as usize, picks.len());
        prop_assert!(cart.lines().len() <= 5);
    }

    #[test]
    fn cart_lines_are_unique_per_product_and_size(picks in picks_strategy()) {
        let cart = fill(&picks);
        let lines = cart.lines();
        for (i, a) in lines.iter().enumerate() {
            for b in &lines[i + 1..] {
                prop_assert!(a.product_id != b.product_id || a.variant != b.variant);
            }
        }
    }

    #[test]
    fn cart_total_is_sum_of_lines(ops in ops_strategy()) {
        let (cart, expected) = run_ops(&ops)?;
        let line_sum: Decimal = cart
            .lines()
            .iter()
            .map(|l| l.unit_price * Decimal::from(l.quantity))
            .sum();
        let model_sum: Decimal = expected
            .values()
            .map(|(price, qty)| *price * Decimal::from(*qty))
            .sum();
        prop_assert_eq!(cart.total_price(), line_sum);
        prop_assert_eq!(cart.total_price(), model_sum);
    }

    #[test]
    fn cart_matches_model_after_mixed_operations(ops in ops_strategy()) {
        let (cart, expected) = run_ops(&ops)?;
        prop_assert_eq!(cart.lines().len(), expected.len());
        prop_assert_eq!(
            cart.total_item_count(),
            expected.values().map(|(_, qty)| *qty).sum::<u32>()
        );
        for line in cart.lines() {
            prop_assert!(line.quantity >= 1);
            let model = expected.get(&(line.product_id, line.variant.clone()));
            prop_assert_eq!(model, Some(&(line.unit_price, line.quantity)));
        }
    }

    #[test]
    fn removing_every_line_empties_cart(picks in picks_strategy()) {
        let mut cart = fill(&picks);
        let keys: Vec<_> = cart
            .lines()
            .iter()
            .map(|l| (l.product_id, l.variant.clone()))
            .collect();
        for (id, variant) in keys {
            cart.update_quantity(id, 0, variant.as_deref()).unwrap();
        }
        prop_assert!(cart.is_empty());
        prop_assert_eq!(cart.total_price(), Decimal::ZERO);
    }

    #[test]
    fn totals_add_up(subtotal in price_strategy()) {
        let pricing = PricingConfig::default();
        let totals = compute_totals(subtotal, &pricing).unwrap();
        prop_assert_eq!(totals.total, totals.subtotal + totals.delivery_fee + totals.tax);
        prop_assert!(totals.tax.scale() <= 2);
        prop_assert!(within_tolerance(totals.tax, subtotal * pricing.tax_rate));
    }

    #[test]
    fn minor_units_round_trip_for_cent_amounts(amount in price_strategy()) {
        let minor = to_minor_units(amount).unwrap();
        prop_assert_eq!(Decimal::new(minor, 2), amount);
    }

    #[test]
    fn status_labels_parse_case_insensitively(index in 0usize..7, upper in any::<bool>()) {
        let statuses = [
            OrderStatus::Pending,
            OrderStatus::AwaitingPayment,
            OrderStatus::Paid,
            OrderStatus::PaymentFailed,
            OrderStatus::Preparing,
            OrderStatus::OutForDelivery,
            OrderStatus::Delivered,
        ];
        let status = statuses[index];
        let label = if upper {
            status.label().to_uppercase()
        } else {
            format!("  {}  ", status.label().to_lowercase())
        };
        prop_assert_eq!(OrderStatus::parse_label(&label), Some(status));
    }
}
