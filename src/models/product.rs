use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A named size with its own price (e.g. "Medium" at 12.99).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SizeOption {
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64, example = 12.99)]
    pub price: Decimal,
}

impl SizeOption {
    pub fn new(name: impl Into<String>, price: Decimal) -> Self {
        Self {
            name: name.into(),
            price,
        }
    }
}

/// How a product is priced. A product is either flat-priced or sold in sizes, never both.
#[derive(Clone, Debug, PartialEq)]
pub enum Pricing {
    Flat(Decimal),
    Sized(Vec<SizeOption>),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProductError {
    #[error("product {0} has neither a price nor sizes")]
    MissingPricing(i64),
}

/// A catalog entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ProductWire", into = "ProductWire")]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub description: String,
    pub image: String,
    pub popular: bool,
    pub pricing: Pricing,
}

impl Product {
    pub fn flat(id: i64, name: impl Into<String>, category: impl Into<String>, price: Decimal) -> Self {
        Self {
            id,
            name: name.into(),
            category: category.into(),
            description: String::new(),
            image: String::new(),
            popular: false,
            pricing: Pricing::Flat(price),
        }
    }

    pub fn sized(
        id: i64,
        name: impl Into<String>,
        category: impl Into<String>,
        sizes: Vec<SizeOption>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            category: category.into(),
            description: String::new(),
            image: String::new(),
            popular: false,
            pricing: Pricing::Sized(sizes),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    pub fn popular(mut self, popular: bool) -> Self {
        self.popular = popular;
        self
    }

    pub fn has_sizes(&self) -> bool {
        matches!(self.pricing, Pricing::Sized(_))
    }

    pub fn sizes(&self) -> &[SizeOption] {
        match &self.pricing {
            Pricing::Sized(sizes) => sizes,
            Pricing::Flat(_) => &[],
        }
    }

    pub fn flat_price(&self) -> Option<Decimal> {
        match self.pricing {
            Pricing::Flat(price) => Some(price),
            Pricing::Sized(_) => None,
        }
    }

    /// Case-sensitive lookup of a size by name.
    pub fn size(&self, name: &str) -> Option<&SizeOption> {
        self.sizes().iter().find(|s| s.name == name)
    }

    /// Lowest price the product can be bought for ("From Php 10.99").
    pub fn starting_price(&self) -> Decimal {
        match &self.pricing {
            Pricing::Flat(price) => *price,
            Pricing::Sized(sizes) => sizes
                .iter()
                .map(|s| s.price)
                .min()
                .unwrap_or(Decimal::ZERO),
        }
    }
}

/// JSON shape of a product as served to and read from clients.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[schema(as = Product)]
pub struct ProductWire {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub popular: bool,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    #[schema(value_type = Option<f64>, example = 9.99)]
    pub price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sizes: Option<Vec<SizeOption>>,
}

impl TryFrom<ProductWire> for Product {
    type Error = ProductError;

    fn try_from(wire: ProductWire) -> Result<Self, Self::Error> {
        // Sizes win when a row carries both.
        let pricing = match (wire.sizes, wire.price) {
            (Some(sizes), _) if !sizes.is_empty() => Pricing::Sized(sizes),
            (_, Some(price)) => Pricing::Flat(price),
            _ => return Err(ProductError::MissingPricing(wire.id)),
        };

        Ok(Product {
            id: wire.id,
            name: wire.name,
            category: wire.category,
            description: wire.description,
            image: wire.image,
            popular: wire.popular,
            pricing,
        })
    }
}

impl From<Product> for ProductWire {
    fn from(product: Product) -> Self {
        let (price, sizes) = match product.pricing {
            Pricing::Flat(price) => (Some(price), None),
            Pricing::Sized(sizes) => (None, Some(sizes)),
        };
        ProductWire {
            id: product.id,
            name: product.name,
            category: product.category,
            description: product.description,
            image: product.image,
            popular: product.popular,
            price,
            sizes,
        }
    }
}

const PIZZA_IMAGE: &str = "assets/images/food/pepperoni.png";

fn pizza_sizes(small: Decimal, medium: Decimal, large: Decimal) -> Vec<SizeOption> {
    vec![
        SizeOption::new("Small", small),
        SizeOption::new("Medium", medium),
        SizeOption::new("Large", large),
    ]
}

/// Built-in menu served when no catalog source is reachable.
pub fn fallback_menu() -> Vec<Product> {
    vec![
        Product::sized(1, "Margherita Pizza", "Pizza", pizza_sizes(dec!(10.99), dec!(12.99), dec!(15.99)))
            .with_description("Classic tomato sauce, mozzarella, fresh basil")
            .with_image(PIZZA_IMAGE)
            .popular(true),
        Product::sized(2, "Pepperoni Pizza", "Pizza", pizza_sizes(dec!(12.99), dec!(14.99), dec!(17.99)))
            .with_description("Loaded with pepperoni and mozzarella")
            .with_image("assets/images/food/burgerpizza.png")
            .popular(true),
        Product::sized(3, "BBQ Chicken Pizza", "Pizza", pizza_sizes(dec!(13.99), dec!(15.99), dec!(18.99)))
            .with_description("BBQ sauce, grilled chicken, red onions")
            .with_image(PIZZA_IMAGE),
        Product::sized(4, "Veggie Supreme", "Pizza", pizza_sizes(dec!(11.99), dec!(13.99), dec!(16.99)))
            .with_description("Mushrooms, peppers, olives, onions")
            .with_image(PIZZA_IMAGE),
        Product::flat(5, "Classic Burger", "Burgers", dec!(9.99))
            .with_description("Beef patty, lettuce, tomato, cheese")
            .with_image(PIZZA_IMAGE)
            .popular(true),
        Product::flat(6, "Bacon Cheeseburger", "Burgers", dec!(11.99))
            .with_description("Double beef, bacon, cheddar cheese")
            .with_image(PIZZA_IMAGE)
            .popular(true),
        Product::flat(7, "Veggie Burger", "Burgers", dec!(10.99))
            .with_description("Plant-based patty, avocado, sprouts")
            .with_image(PIZZA_IMAGE),
        Product::flat(8, "Chicken Burger", "Burgers", dec!(10.49))
            .with_description("Grilled chicken breast, mayo, lettuce")
            .with_image(PIZZA_IMAGE),
        Product::flat(9, "Spaghetti Carbonara", "Pasta", dec!(13.99))
            .with_description("Creamy sauce, bacon, parmesan")
            .with_image(PIZZA_IMAGE)
            .popular(true),
        Product::flat(10, "Penne Arrabiata", "Pasta", dec!(12.49))
            .with_description("Spicy tomato sauce, garlic, herbs")
            .with_image(PIZZA_IMAGE),
        Product::flat(11, "Fettuccine Alfredo", "Pasta", dec!(13.49))
            .with_description("Rich cream sauce, parmesan cheese")
            .with_image(PIZZA_IMAGE)
            .popular(true),
        Product::flat(12, "Lasagna", "Pasta", dec!(14.99))
            .with_description("Layered pasta, beef, ricotta, mozzarella")
            .with_image(PIZZA_IMAGE),
        Product::flat(13, "Caesar Salad", "Salads", dec!(8.99))
            .with_description("Romaine, croutons, parmesan, caesar dressing")
            .with_image(PIZZA_IMAGE)
            .popular(true),
        Product::flat(14, "Greek Salad", "Salads", dec!(9.49))
            .with_description("Feta, olives, cucumber, tomatoes")
            .with_image(PIZZA_IMAGE),
        Product::flat(15, "Caprese Salad", "Salads", dec!(10.99))
            .with_description("Fresh mozzarella, tomatoes, basil")
            .with_image(PIZZA_IMAGE),
        Product::flat(16, "Coca Cola", "Drinks", dec!(2.99))
            .with_description("Classic cola, 500ml")
            .with_image(PIZZA_IMAGE)
            .popular(true),
        Product::flat(17, "Fresh Lemonade", "Drinks", dec!(3.49))
            .with_description("Freshly squeezed lemon juice")
            .with_image(PIZZA_IMAGE)
            .popular(true),
        Product::flat(18, "Iced Tea", "Drinks", dec!(2.99))
            .with_description("Peach iced tea")
            .with_image(PIZZA_IMAGE),
        Product::flat(19, "Chocolate Cake", "Desserts", dec!(6.99))
            .with_description("Rich chocolate layer cake")
            .with_image(PIZZA_IMAGE)
            .popular(true),
        Product::flat(20, "Tiramisu", "Desserts", dec!(7.49))
            .with_description("Italian coffee-flavored dessert")
            .with_image(PIZZA_IMAGE)
            .popular(true),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn sizes_take_precedence_over_price() {
        let product: Product = serde_json::from_value(json!({
            "id": 1,
            "name": "Margherita Pizza",
            "price": 9.0,
            "sizes": [{"name": "Small", "price": 10.99}]
        }))
        .unwrap();

        assert!(product.has_sizes());
        assert_eq!(product.flat_price(), None);
        assert_eq!(product.size("Small").unwrap().price, dec!(10.99));
    }

    #[test]
    fn product_without_pricing_is_rejected() {
        let result: Result<Product, _> = serde_json::from_value(json!({
            "id": 42,
            "name": "Mystery",
            "sizes": []
        }));
        assert!(result.is_err());

        let wire = ProductWire {
            id: 42,
            name: "Mystery".into(),
            category: String::new(),
            description: String::new(),
            image: String::new(),
            popular: false,
            price: None,
            sizes: None,
        };
        assert_matches!(Product::try_from(wire), Err(ProductError::MissingPricing(42)));
    }

    #[test]
    fn serializes_flat_price_as_number() {
        let value = serde_json::to_value(Product::flat(16, "Coca Cola", "Drinks", dec!(2.99))).unwrap();
        assert_eq!(value["price"], json!(2.99));
        assert!(value.get("sizes").is_none());
    }

    #[test]
    fn fallback_menu_is_well_formed() {
        let menu = fallback_menu();
        assert_eq!(menu.len(), 20);
        let margherita = &menu[0];
        assert_eq!(margherita.size("Medium").unwrap().price, dec!(12.99));
        assert_eq!(margherita.starting_price(), dec!(10.99));
        assert!(menu.iter().all(|p| p.has_sizes() || p.flat_price().is_some()));
    }
}
