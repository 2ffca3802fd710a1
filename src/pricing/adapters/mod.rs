//! Built-in pricing adapters.
//!
//! Product, delivery and payment chains start from a base price and run the
//! VAT adapter last. The order chain copies the component sheets into the
//! order ledger and finishes with the discount allocator.

mod catalog;
mod fees;
mod order;
mod vat;

pub use catalog::CatalogPrice;
pub use fees::{DeliveryFee, FeeSettings, PaymentFee};
pub use order::{OrderDeliveryFee, OrderItems, OrderPaymentFee};
pub use vat::VatTax;

pub use crate::pricing::allocator::OrderDiscount;

pub const CATALOG_PRICE_KEY: &str = "opensase.pricing.catalog-price";
pub const VAT_KEY: &str = "opensase.pricing.vat";
pub const DELIVERY_FEE_KEY: &str = "opensase.pricing.delivery-fee";
pub const PAYMENT_FEE_KEY: &str = "opensase.pricing.payment-fee";
pub const ORDER_ITEMS_KEY: &str = "opensase.pricing.order-items";
pub const ORDER_DELIVERY_KEY: &str = "opensase.pricing.order-delivery";
pub const ORDER_PAYMENT_KEY: &str = "opensase.pricing.order-payment";
pub const ORDER_DISCOUNT_KEY: &str = "opensase.pricing.order-discount";
