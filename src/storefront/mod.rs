//! Client side of the storefront: the shopping cart, menu loading with an
//! offline fallback, and checkout against the orders API.

pub mod cart;
pub mod catalog_client;
pub mod checkout;

pub use cart::{Cart, CartError, CartLine};
pub use catalog_client::{CatalogClient, MenuLoad};
pub use checkout::{CheckoutClient, CheckoutForm, CheckoutOutcome, ClientError, PaymentReturn};
