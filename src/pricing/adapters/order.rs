//! Order chain adapters that copy the component sheets into the order ledger.

use async_trait::async_trait;

use super::{ORDER_DELIVERY_KEY, ORDER_ITEMS_KEY, ORDER_PAYMENT_KEY};
use crate::pricing::context::OrderPricingContext;
use crate::pricing::director::{PricingAdapter, PricingRun};
use crate::pricing::row::{CalculationRow, NewRow, RowCategory};
use crate::pricing::sheet::PricingSheet;
use crate::registry::Adapter;
use crate::Result;

/// Books a component's net amount under `category` and its tax separately.
fn copy_component(result: &mut PricingSheet, key: &str, category: RowCategory, component: &PricingSheet, meta: Option<(&str, &str)>) {
    let with_meta = |row: NewRow| match meta {
        Some((name, value)) => row.meta(name, value).adapter(key),
        None => row.adapter(key),
    };
    result.add(category, with_meta(NewRow::new(component.net())));
    let tax = component.tax_sum();
    if !tax.is_zero() {
        result.add_tax(with_meta(NewRow::new(tax)));
    }
}

pub struct OrderItems;

impl Adapter for OrderItems {
    fn key(&self) -> &str { ORDER_ITEMS_KEY }
    fn label(&self) -> &str { "Order Items" }
    fn version(&self) -> &str { "1.0.0" }
}

#[async_trait]
impl PricingAdapter<OrderPricingContext> for OrderItems {
    async fn calculate(&self, run: &PricingRun<'_, OrderPricingContext>) -> Result<Vec<CalculationRow>> {
        let mut result = run.result_sheet();
        for (position, sheet) in run.context.positions.iter().zip(run.context.position_sheets()) {
            copy_component(&mut result, self.key(), RowCategory::Item, &sheet, Some(("positionId", position.position_id.as_str())));
        }
        Ok(result.into_rows())
    }
}

pub struct OrderDeliveryFee;

impl Adapter for OrderDeliveryFee {
    fn key(&self) -> &str { ORDER_DELIVERY_KEY }
    fn label(&self) -> &str { "Order Delivery Fee" }
    fn version(&self) -> &str { "1.0.0" }
    fn order_index(&self) -> i32 { 10 }
}

#[async_trait]
impl PricingAdapter<OrderPricingContext> for OrderDeliveryFee {
    async fn is_activated_for(&self, context: &OrderPricingContext) -> Result<bool> {
        Ok(context.delivery.is_some())
    }

    async fn calculate(&self, run: &PricingRun<'_, OrderPricingContext>) -> Result<Vec<CalculationRow>> {
        let mut result = run.result_sheet();
        if let Some(sheet) = run.context.delivery_sheet() {
            copy_component(&mut result, self.key(), RowCategory::Delivery, &sheet, None);
        }
        Ok(result.into_rows())
    }
}

pub struct OrderPaymentFee;

impl Adapter for OrderPaymentFee {
    fn key(&self) -> &str { ORDER_PAYMENT_KEY }
    fn label(&self) -> &str { "Order Payment Fee" }
    fn version(&self) -> &str { "1.0.0" }
    fn order_index(&self) -> i32 { 20 }
}

#[async_trait]
impl PricingAdapter<OrderPricingContext> for OrderPaymentFee {
    async fn is_activated_for(&self, context: &OrderPricingContext) -> Result<bool> {
        Ok(context.payment.is_some())
    }

    async fn calculate(&self, run: &PricingRun<'_, OrderPricingContext>) -> Result<Vec<CalculationRow>> {
        let mut result = run.result_sheet();
        if let Some(sheet) = run.context.payment_sheet() {
            copy_component(&mut result, self.key(), RowCategory::Payment, &sheet, None);
        }
        Ok(result.into_rows())
    }
}
