use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::debug;

use super::CATALOG_PRICE_KEY;
use crate::pricing::context::ProductPricingContext;
use crate::pricing::director::{PricingAdapter, PricingRun};
use crate::pricing::row::{CalculationRow, NewRow};
use crate::registry::Adapter;
use crate::Result;

/// Base price of a position taken from the product's catalog prices.
pub struct CatalogPrice;

impl Adapter for CatalogPrice {
    fn key(&self) -> &str { CATALOG_PRICE_KEY }
    fn label(&self) -> &str { "Catalog Price" }
    fn version(&self) -> &str { "1.0.0" }
}

#[async_trait]
impl PricingAdapter<ProductPricingContext> for CatalogPrice {
    async fn calculate(&self, run: &PricingRun<'_, ProductPricingContext>) -> Result<Vec<CalculationRow>> {
        let context = run.context;
        let mut result = run.result_sheet();
        let Some(price) = context.product.catalog_price(&context.currency, &context.country, context.quantity) else {
            debug!(sku = context.product.sku().as_str(), currency = %context.currency, "no catalog price");
            return Ok(result.into_rows());
        };
        result.add_item(
            NewRow::new(price.amount * Decimal::from(context.quantity))
                .taxable(price.is_taxable)
                .net_price(price.is_net_price)
                .meta("unitAmount", price.amount.to_string())
                .adapter(self.key()),
        );
        Ok(result.into_rows())
    }
}
