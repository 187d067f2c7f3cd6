use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{Product, SizeOption};
use crate::services::pricing::{self, OrderLine};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CartError {
    /// The UI should prompt for one of `options` and retry.
    #[error("choose a size for {product_name}")]
    VariantSelectionRequired {
        product_id: i64,
        product_name: String,
        options: Vec<SizeOption>,
    },

    #[error("{product_name} has no size named {variant}")]
    UnknownVariant {
        product_id: i64,
        product_name: String,
        variant: String,
    },

    #[error("{product_name} is not sold in sizes")]
    UnexpectedVariant { product_id: i64, product_name: String },

    #[error("no cart line for product {product_id}")]
    LineNotFound {
        product_id: i64,
        variant: Option<String>,
    },
}

/// One product (and size) in the cart, priced when it was added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: i64,
    pub product_name: String,
    pub variant: Option<String>,
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl CartLine {
    fn matches(&self, product_id: i64, variant: Option<&str>) -> bool {
        self.product_id == product_id && self.variant.as_deref() == variant
    }

    pub fn line_total(&self) -> Decimal {
        self.unit_price.saturating_mul(Decimal::from(self.quantity))
    }

    /// `Margherita Pizza (Medium)`
    pub fn display_name(&self) -> String {
        match &self.variant {
            Some(variant) => format!("{} ({})", self.product_name, variant),
            None => self.product_name.clone(),
        }
    }

    pub fn to_order_line(&self) -> OrderLine {
        OrderLine {
            product_id: self.product_id,
            name: self.product_name.clone(),
            variant: self.variant.clone(),
            unit_price: self.unit_price,
            quantity: self.quantity,
        }
    }
}

/// Cart lines keyed by (product id, size).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one unit and returns the line's new quantity.
    pub fn add_item(&mut self, product: &Product, variant: Option<&str>) -> Result<u32, CartError> {
        let unit_price = match (product.has_sizes(), variant) {
            (true, None) => {
                return Err(CartError::VariantSelectionRequired {
                    product_id: product.id,
                    product_name: product.name.clone(),
                    options: product.sizes().to_vec(),
                })
            }
            (true, Some(name)) => {
                product
                    .size(name)
                    .ok_or_else(|| CartError::UnknownVariant {
                        product_id: product.id,
                        product_name: product.name.clone(),
                        variant: name.to_string(),
                    })?
                    .price
            }
            (false, Some(_)) => {
                return Err(CartError::UnexpectedVariant {
                    product_id: product.id,
                    product_name: product.name.clone(),
                })
            }
            (false, None) => product.starting_price(),
        };

        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|line| line.matches(product.id, variant))
        {
            line.quantity += 1;
            return Ok(line.quantity);
        }

        self.lines.push(CartLine {
            product_id: product.id,
            product_name: product.name.clone(),
            variant: variant.map(str::to_string),
            unit_price,
            quantity: 1,
        });
        Ok(1)
    }

    pub fn remove_item(&mut self, product_id: i64, variant: Option<&str>) -> Option<CartLine> {
        let index = self
            .lines
            .iter()
            .position(|line| line.matches(product_id, variant))?;
        Some(self.lines.remove(index))
    }

    /// Zero removes the line.
    pub fn update_quantity(
        &mut self,
        product_id: i64,
        new_quantity: u32,
        variant: Option<&str>,
    ) -> Result<(), CartError> {
        if new_quantity == 0 {
            self.remove_item(product_id, variant);
            return Ok(());
        }

        let line = self
            .lines
            .iter_mut()
            .find(|line| line.matches(product_id, variant))
            .ok_or_else(|| CartError::LineNotFound {
                product_id,
                variant: variant.map(str::to_string),
            })?;
        line.quantity = new_quantity;
        Ok(())
    }

    pub fn total_item_count(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    pub fn total_price(&self) -> Decimal {
        self.lines
            .iter()
            .map(CartLine::line_total)
            .fold(Decimal::ZERO, Decimal::saturating_add)
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn order_lines(&self) -> Vec<OrderLine> {
        self.lines.iter().map(CartLine::to_order_line).collect()
    }

    pub fn summary(&self, currency_label: &str) -> Option<String> {
        pricing::summarize(&self.order_lines(), currency_label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn pizza() -> Product {
        Product::sized(
            1,
            "Margherita Pizza",
            "Pizza",
            vec![
                SizeOption::new("Small", dec!(9.99)),
                SizeOption::new("Medium", dec!(12.99)),
                SizeOption::new("Large", dec!(15.99)),
            ],
        )
    }

    fn cola() -> Product {
        Product::flat(16, "Coca Cola", "Drinks", dec!(2.99))
    }

    #[test]
    fn sized_product_needs_a_size() {
        let mut cart = Cart::new();
        let err = cart.add_item(&pizza(), None).unwrap_err();
        assert_matches!(err, CartError::VariantSelectionRequired { ref options, .. } if options.len() == 3);
        assert_matches!(
            cart.add_item(&pizza(), Some("Huge")),
            Err(CartError::UnknownVariant { .. })
        );
        assert_matches!(
            cart.add_item(&cola(), Some("Large")),
            Err(CartError::UnexpectedVariant { .. })
        );
        assert!(cart.is_empty());
    }

    #[test]
    fn same_product_and_size_merge() {
        let mut cart = Cart::new();
        assert_eq!(cart.add_item(&pizza(), Some("Medium")).unwrap(), 1);
        assert_eq!(cart.add_item(&pizza(), Some("Medium")).unwrap(), 2);
        assert_eq!(cart.add_item(&pizza(), Some("Large")).unwrap(), 1);
        assert_eq!(cart.add_item(&cola(), None).unwrap(), 1);

        assert_eq!(cart.lines().len(), 3);
        assert_eq!(cart.total_item_count(), 4);
        assert_eq!(cart.total_price(), dec!(44.96));
        assert_eq!(cart.lines()[0].display_name(), "Margherita Pizza (Medium)");
    }

    #[test]
    fn remove_and_update() {
        let mut cart = Cart::new();
        cart.add_item(&pizza(), Some("Medium")).unwrap();
        cart.add_item(&pizza(), Some("Small")).unwrap();
        cart.add_item(&cola(), None).unwrap();

        cart.update_quantity(16, 3, None).unwrap();
        assert_eq!(cart.total_item_count(), 5);

        cart.update_quantity(1, 0, Some("Small")).unwrap();
        assert_eq!(cart.lines().len(), 2);

        let removed = cart.remove_item(1, Some("Medium")).unwrap();
        assert_eq!(removed.quantity, 1);
        assert!(cart.remove_item(1, Some("Medium")).is_none());

        assert_matches!(
            cart.update_quantity(99, 2, None),
            Err(CartError::LineNotFound { product_id: 99, .. })
        );

        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.total_price(), Decimal::ZERO);
    }

    #[test]
    fn summary_matches_order_format() {
        let mut cart = Cart::new();
        cart.add_item(&pizza(), Some("Medium")).unwrap();
        cart.add_item(&pizza(), Some("Medium")).unwrap();
        cart.add_item(&cola(), None).unwrap();
        assert_eq!(
            cart.summary("Php").as_deref(),
            Some("Margherita Pizza (Medium) (x2) - Php 25.98, Coca Cola (x1) - Php 2.99")
        );
    }
}
