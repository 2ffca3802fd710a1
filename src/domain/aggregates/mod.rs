//! Aggregates module
pub mod product;
pub mod order;
pub mod provider;

pub use product::{Product, ProductError, ProductPrice, ProductStatus};
pub use order::{Order, OrderDelivery, OrderError, OrderPayment, OrderPosition};
pub use provider::Provider;
