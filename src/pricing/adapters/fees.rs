use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;

use super::{DELIVERY_FEE_KEY, PAYMENT_FEE_KEY};
use crate::pricing::context::{DeliveryPricingContext, PaymentPricingContext, ProviderPricingContext};
use crate::pricing::director::{PricingAdapter, PricingRun};
use crate::pricing::row::{CalculationRow, NewRow, RowCategory};
use crate::pricing::sheet::PricingSheet;
use crate::registry::Adapter;
use crate::{EngineError, Result};

/// Fee settings read from a delivery or payment provider's configuration.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeeSettings {
    /// Flat gross fee.
    pub fee: Decimal,
    /// Orders whose items total reaches this amount pay no fee.
    #[serde(default)]
    pub free_above: Option<Decimal>,
    /// Additional fraction of the items total.
    #[serde(default)]
    pub rate: Option<Decimal>,
}

impl FeeSettings {
    pub fn from_context(key: &str, context: &ProviderPricingContext) -> Result<Self> {
        context
            .provider
            .settings()
            .map_err(|e| EngineError::configuration(key, format!("invalid fee settings: {e}")))
    }

    pub fn amount(&self, items_total: Decimal) -> Decimal {
        if self.free_above.is_some_and(|threshold| items_total >= threshold) {
            return Decimal::ZERO;
        }
        self.fee + self.rate.map_or(Decimal::ZERO, |rate| items_total * rate)
    }
}

fn fee_rows(key: &str, category: RowCategory, context: &ProviderPricingContext) -> Result<Vec<CalculationRow>> {
    let settings = FeeSettings::from_context(key, context)?;
    let mut result = PricingSheet::new(&context.currency);
    result.add(
        category,
        NewRow::new(settings.amount(context.items_total))
            .taxable(true)
            .net_price(false)
            .meta("provider", context.provider.id.as_str())
            .adapter(key),
    );
    Ok(result.into_rows())
}

/// Delivery fee configured on the selected delivery provider.
pub struct DeliveryFee;

impl Adapter for DeliveryFee {
    fn key(&self) -> &str { DELIVERY_FEE_KEY }
    fn label(&self) -> &str { "Delivery Fee" }
    fn version(&self) -> &str { "1.0.0" }
}

#[async_trait]
impl PricingAdapter<DeliveryPricingContext> for DeliveryFee {
    async fn calculate(&self, run: &PricingRun<'_, DeliveryPricingContext>) -> Result<Vec<CalculationRow>> {
        fee_rows(self.key(), RowCategory::Delivery, run.context)
    }
}

/// Payment fee configured on the selected payment provider.
pub struct PaymentFee;

impl Adapter for PaymentFee {
    fn key(&self) -> &str { PAYMENT_FEE_KEY }
    fn label(&self) -> &str { "Payment Fee" }
    fn version(&self) -> &str { "1.0.0" }
}

#[async_trait]
impl PricingAdapter<PaymentPricingContext> for PaymentFee {
    async fn calculate(&self, run: &PricingRun<'_, PaymentPricingContext>) -> Result<Vec<CalculationRow>> {
        fee_rows(self.key(), RowCategory::Payment, run.context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::Provider;
    use crate::pricing::context::RequestContext;

    fn delivery(provider: Provider, items_total: i64) -> DeliveryPricingContext {
        DeliveryPricingContext(ProviderPricingContext::new(provider, Decimal::from(items_total), "CHF", "CH"))
    }

    async fn price(context: &DeliveryPricingContext) -> Result<Vec<CalculationRow>> {
        let request = RequestContext::new();
        let calculation = PricingSheet::new("CHF");
        let run = PricingRun { context, request: &request, calculation: &calculation, discounts: Vec::new() };
        DeliveryFee.calculate(&run).await
    }

    #[tokio::test]
    async fn test_flat_fee_and_free_threshold() {
        let provider = Provider::new("post").with_setting("fee", 900).with_setting("freeAbove", 10000);

        let rows = price(&delivery(provider.clone(), 5000)).await.unwrap();
        assert_eq!(rows[0].category, RowCategory::Delivery);
        assert_eq!(rows[0].amount, Decimal::from(900));

        let rows = price(&delivery(provider, 10000)).await.unwrap();
        assert_eq!(rows[0].amount, Decimal::ZERO);
    }

    #[test]
    fn test_rate_on_items_total() {
        let settings = FeeSettings { fee: Decimal::from(30), free_above: None, rate: Some(Decimal::new(2, 2)) };
        assert_eq!(settings.amount(Decimal::from(10000)), Decimal::from(230));
    }

    #[tokio::test]
    async fn test_missing_fee_is_a_configuration_error() {
        let err = price(&delivery(Provider::new("post"), 100)).await.unwrap_err();
        assert!(err.is_configuration_issue());
    }
}
