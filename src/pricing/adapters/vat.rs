use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::debug;

use super::VAT_KEY;
use crate::config::VatRates;
use crate::pricing::context::PricingContext;
use crate::pricing::director::{PricingAdapter, PricingRun};
use crate::pricing::row::{CalculationRow, NewRow, RowCategory};
use crate::pricing::sheet::RowFilter;
use crate::registry::Adapter;
use crate::Result;

/// Adds value added tax for the taxable rows of one category.
///
/// Net priced rows get the tax on top. Gross priced rows already contain
/// it, so the tax part is moved out of them with a correction row of the
/// same category and booked as a tax row instead.
pub struct VatTax {
    category: RowCategory,
    rates: Arc<VatRates>,
}

impl VatTax {
    pub fn new(category: RowCategory, rates: Arc<VatRates>) -> Self {
        Self { category, rates }
    }
}

impl Adapter for VatTax {
    fn key(&self) -> &str { VAT_KEY }
    fn label(&self) -> &str { "Value Added Tax" }
    fn version(&self) -> &str { "1.0.0" }
    fn order_index(&self) -> i32 { 80 }
}

#[async_trait]
impl<C: PricingContext> PricingAdapter<C> for VatTax {
    async fn is_activated_for(&self, context: &C) -> Result<bool> {
        Ok(self.rates.rate_for(context.country()).is_some())
    }

    async fn calculate(&self, run: &PricingRun<'_, C>) -> Result<Vec<CalculationRow>> {
        let mut result = run.result_sheet();
        let Some(rate) = self.rates.rate_for(run.context.country()) else {
            return Ok(result.into_rows());
        };

        let taxable = run.calculation.filter_by(RowFilter::category(self.category)).filter(|row| row.is_taxable());
        let (mut net, mut gross) = (Decimal::ZERO, Decimal::ZERO);
        for row in taxable {
            if row.is_net_price() {
                net += row.amount;
            } else {
                gross += row.amount;
            }
        }

        let included = gross - gross / (Decimal::ONE + rate);
        if !included.is_zero() {
            result.add(self.category, NewRow::new(-included).taxable(false).net_price(true).adapter(VAT_KEY));
        }
        let tax = net * rate + included;
        if !tax.is_zero() {
            debug!(country = run.context.country(), %rate, %tax, "vat calculated");
            result.add_tax(NewRow::new(tax).rate(rate).adapter(VAT_KEY));
        }
        Ok(result.into_rows())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::Product;
    use crate::domain::value_objects::Sku;
    use crate::pricing::context::{ProductPricingContext, RequestContext};
    use crate::pricing::sheet::PricingSheet;

    fn context(country: &str) -> ProductPricingContext {
        ProductPricingContext::new(Product::create(Sku::new("SKU-1").unwrap(), "Thing"), 1, "CHF", country)
    }

    async fn apply(calculation: &mut PricingSheet, context: &ProductPricingContext) {
        let request = RequestContext::new();
        let vat = VatTax::new(RowCategory::Item, Arc::new(VatRates::default()));
        let run = PricingRun { context, request: &request, calculation, discounts: Vec::new() };
        let rows = vat.calculate(&run).await.unwrap();
        calculation.extend(rows);
    }

    #[tokio::test]
    async fn test_net_price_gets_tax_on_top() {
        let mut sheet = PricingSheet::new("CHF");
        sheet.add_item(NewRow::new(Decimal::from(1000)).taxable(true).net_price(true));
        apply(&mut sheet, &context("CH")).await;

        assert_eq!(sheet.gross(), Decimal::from(1081));
        assert_eq!(sheet.net(), Decimal::from(1000));
        assert_eq!(sheet.get_rows(RowCategory::Tax)[0].rate, Some(Decimal::new(81, 3)));
    }

    #[tokio::test]
    async fn test_gross_price_is_split() {
        let mut sheet = PricingSheet::new("CHF");
        sheet.add_item(NewRow::new(Decimal::from(1081)).taxable(true).net_price(false));
        sheet.add_item(NewRow::new(Decimal::from(500)).taxable(false));
        apply(&mut sheet, &context("CH")).await;

        assert_eq!(sheet.gross(), Decimal::from(1581));
        assert_eq!(sheet.tax_sum(), Decimal::from(81));
        assert_eq!(sheet.items_sum(), Decimal::from(1500));
    }

    #[tokio::test]
    async fn test_unknown_country_is_not_activated() {
        let vat = VatTax::new(RowCategory::Item, Arc::new(VatRates::default()));
        assert!(!vat.is_activated_for(&context("US")).await.unwrap());
        assert!(vat.is_activated_for(&context("ch")).await.unwrap());
    }
}
