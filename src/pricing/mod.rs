//! Pricing engine: ledgers, contexts, the director and the built-in adapters.

pub mod adapters;
pub mod allocator;
pub mod context;
pub mod director;
pub mod discount;
pub mod row;
pub mod sheet;

pub use allocator::{allocate, distribute, Allocation, DiscountPool, Share};
pub use context::{
    DeliveryPricingContext, OrderPricingContext, PaymentPricingContext, PositionCalculation, PricingContext,
    ProductPricingContext, ProviderPricingContext, RequestContext,
};
pub use director::{PricingAdapter, PricingDirector, PricingRegistry, PricingRun};
pub use discount::{ApplicableDiscount, Discount, DiscountConfiguration, DiscountTrigger, DiscountValue};
pub use row::{CalculationRow, NewRow, RowCategory};
pub use sheet::{DiscountPrice, PricingSheet, RowFilter};
