pub mod order;
pub mod payment;
pub mod product;

pub use order::{CustomerDetails, Order, OrderStatus, OrderTotals, PaymentMethod};
pub use payment::PaymentSource;
pub use product::{fallback_menu, Pricing, Product, ProductWire, SizeOption};
