//! Pricing director: folds one pricing domain's adapter chain over a ledger.
//!
//! A run is strictly sequential. Later adapters read the rows earlier ones
//! produced, so every activation check and calculation is awaited in place
//! before the next adapter starts. A failing or timed out adapter is logged
//! and contributes nothing; the run always completes.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, info_span, Instrument};

use crate::domain::events::PricingEvent;
use crate::pricing::context::{PricingContext, RequestContext};
use crate::pricing::discount::ApplicableDiscount;
use crate::pricing::row::CalculationRow;
use crate::pricing::sheet::PricingSheet;
use crate::registry::{Adapter, AdapterRegistry};
use crate::{EngineError, Result};

/// A pricing plugin for the domain described by `C`.
#[async_trait]
pub trait PricingAdapter<C: PricingContext>: Adapter {
    async fn is_activated_for(&self, _context: &C) -> Result<bool> {
        Ok(true)
    }

    /// Returns the rows this adapter adds to the run's ledger.
    async fn calculate(&self, run: &PricingRun<'_, C>) -> Result<Vec<CalculationRow>>;
}

pub type PricingRegistry<C> = AdapterRegistry<dyn PricingAdapter<C>>;

/// Everything an adapter sees while it calculates.
pub struct PricingRun<'a, C> {
    pub context: &'a C,
    pub request: &'a RequestContext,
    /// Ledger accumulated by the adapters that ran before this one.
    pub calculation: &'a PricingSheet,
    /// Discounts whose configuration targets this adapter.
    pub discounts: Vec<ApplicableDiscount>,
}

impl<C: PricingContext> PricingRun<'_, C> {
    /// Empty sheet in the run's currency for the adapter's own rows.
    pub fn result_sheet(&self) -> PricingSheet {
        PricingSheet::for_quantity(self.context.currency(), self.context.quantity())
    }
}

pub struct PricingDirector<C: PricingContext> {
    registry: Arc<PricingRegistry<C>>,
    adapter_timeout: Duration,
    calculation: PricingSheet,
    events: Vec<PricingEvent>,
}

impl<C: PricingContext> PricingDirector<C> {
    pub fn new(registry: Arc<PricingRegistry<C>>, adapter_timeout: Duration) -> Self {
        Self { registry, adapter_timeout, calculation: PricingSheet::new(""), events: Vec::new() }
    }

    /// Runs the adapter chain for `context`, replacing any earlier result.
    pub async fn calculate(&mut self, context: &C, request: &RequestContext) {
        let span = info_span!(
            "pricing",
            family = %self.registry.family(),
            request_id = %request.request_id,
            currency = context.currency(),
        );
        self.run(context, request).instrument(span).await
    }

    async fn run(&mut self, context: &C, request: &RequestContext) {
        let family = self.registry.family();
        self.events.clear();

        let mut active = Vec::new();
        for adapter in self.registry.list() {
            match bounded(adapter.key(), self.adapter_timeout, adapter.is_activated_for(context)).await {
                Ok(true) => active.push(adapter),
                Ok(false) => {
                    debug!(adapter = adapter.key(), "adapter not activated, skipping");
                    self.events.push(PricingEvent::AdapterSkipped { family, adapter: adapter.key().to_string() });
                }
                Err(e) => {
                    error!(adapter = adapter.key(), error = %e, "adapter activation check failed, skipping");
                    self.events.push(PricingEvent::AdapterFailed {
                        family,
                        adapter: adapter.key().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let mut calculation = PricingSheet::for_quantity(context.currency(), context.quantity());
        for adapter in active {
            let discounts = context
                .discounts()
                .iter()
                .filter_map(|discount| {
                    discount
                        .configuration_for_adapter_key(adapter.key(), &calculation)
                        .map(|configuration| ApplicableDiscount { discount_id: discount.discount_id.clone(), configuration })
                })
                .collect();
            let run = PricingRun { context, request, calculation: &calculation, discounts };
            let outcome = bounded(adapter.key(), self.adapter_timeout, adapter.calculate(&run))
                .await
                .and_then(|rows| ensure_currency(adapter.key(), context.currency(), rows));

            match outcome {
                Ok(rows) => {
                    debug!(adapter = adapter.key(), rows = rows.len(), "adapter calculated");
                    self.events.push(PricingEvent::AdapterApplied { family, adapter: adapter.key().to_string(), rows: rows.len() });
                    calculation.extend(rows);
                }
                Err(e) => {
                    error!(adapter = adapter.key(), error = %e, "pricing adapter failed, continuing without its rows");
                    self.events.push(PricingEvent::AdapterFailed {
                        family,
                        adapter: adapter.key().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        self.calculation = calculation;
    }

    /// Ledger of the last `calculate`. Before the first run it is empty and
    /// carries no currency.
    pub fn result_sheet(&self) -> PricingSheet {
        self.calculation.clone()
    }

    /// Owned form of `result_sheet`.
    pub fn into_result_sheet(self) -> PricingSheet {
        self.calculation
    }

    /// Per-adapter outcomes of the last run.
    pub fn take_events(&mut self) -> Vec<PricingEvent> {
        std::mem::take(&mut self.events)
    }
}

async fn bounded<T>(key: &str, limit: Duration, call: impl Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(EngineError::AdapterExecution { key, message })) => Err(EngineError::AdapterExecution { key, message }),
        Ok(Err(e)) => Err(EngineError::execution(key, e.to_string())),
        Err(_elapsed) => Err(EngineError::Timeout { key: key.to_string(), duration: limit }),
    }
}

fn ensure_currency(key: &str, currency: &str, rows: Vec<CalculationRow>) -> Result<Vec<CalculationRow>> {
    match rows.iter().find(|row| row.currency != currency) {
        Some(row) => Err(EngineError::execution(
            key,
            EngineError::CurrencyMismatch { expected: currency.to_string(), got: row.currency.clone() }.to_string(),
        )),
        None => Ok(rows),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::Product;
    use crate::domain::value_objects::Sku;
    use crate::pricing::context::ProductPricingContext;
    use crate::pricing::discount::{Discount, DiscountValue};
    use crate::pricing::row::NewRow;
    use crate::registry::PluginFamily;
    use rust_decimal::Decimal;

    enum Behaviour {
        AddItem(i64),
        Fail,
        Hang,
        Inactive,
        BrokenActivation,
        WrongCurrency,
        CountPriorRows,
        CountDiscounts,
    }

    struct StubAdapter {
        key: &'static str,
        order_index: i32,
        behaviour: Behaviour,
    }

    impl Adapter for StubAdapter {
        fn key(&self) -> &str { self.key }
        fn label(&self) -> &str { "Stub" }
        fn version(&self) -> &str { "1.0.0" }
        fn order_index(&self) -> i32 { self.order_index }
    }

    #[async_trait]
    impl PricingAdapter<ProductPricingContext> for StubAdapter {
        async fn is_activated_for(&self, _context: &ProductPricingContext) -> Result<bool> {
            match self.behaviour {
                Behaviour::Inactive => Ok(false),
                Behaviour::BrokenActivation => Err(EngineError::configuration(self.key, "missing rate table")),
                _ => Ok(true),
            }
        }

        async fn calculate(&self, run: &PricingRun<'_, ProductPricingContext>) -> Result<Vec<CalculationRow>> {
            let mut result = run.result_sheet();
            match self.behaviour {
                Behaviour::AddItem(amount) => result.add_item(NewRow::new(Decimal::from(amount)).adapter(self.key)),
                Behaviour::Fail => return Err(EngineError::execution(self.key, "rate service unavailable")),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    result.add_item(NewRow::new(Decimal::ONE));
                }
                Behaviour::Inactive | Behaviour::BrokenActivation => result.add_item(NewRow::new(Decimal::from(9999))),
                Behaviour::WrongCurrency => {
                    let mut other = PricingSheet::new("EUR");
                    other.add_item(NewRow::new(Decimal::from(5)));
                    return Ok(other.into_rows());
                }
                Behaviour::CountPriorRows => {
                    result.add_item(NewRow::new(Decimal::from(run.calculation.rows().len() as i64)).adapter(self.key))
                }
                Behaviour::CountDiscounts => {
                    result.add_item(NewRow::new(Decimal::from(run.discounts.len() as i64)).adapter(self.key))
                }
            }
            Ok(result.into_rows())
        }
    }

    fn registry(adapters: Vec<StubAdapter>) -> Arc<PricingRegistry<ProductPricingContext>> {
        let registry: PricingRegistry<ProductPricingContext> = AdapterRegistry::new(PluginFamily::ProductPricing);
        for adapter in adapters {
            registry.register(Arc::new(adapter));
        }
        Arc::new(registry)
    }

    fn stub(key: &'static str, order_index: i32, behaviour: Behaviour) -> StubAdapter {
        StubAdapter { key, order_index, behaviour }
    }

    fn context() -> ProductPricingContext {
        ProductPricingContext::new(Product::create(Sku::new("SKU-1").unwrap(), "Thing"), 1, "CHF", "CH")
    }

    fn adapters_of(sheet: &PricingSheet) -> Vec<&str> {
        sheet.rows().iter().filter_map(|r| r.adapter()).collect()
    }

    #[tokio::test]
    async fn test_failing_adapter_is_isolated() {
        let registry = registry(vec![
            stub("c", 30, Behaviour::AddItem(3)),
            stub("a", 10, Behaviour::AddItem(1)),
            stub("b", 20, Behaviour::Fail),
        ]);
        let mut director = PricingDirector::new(registry, Duration::from_secs(1));
        director.calculate(&context(), &RequestContext::new()).await;

        let sheet = director.result_sheet();
        assert_eq!(adapters_of(&sheet), vec!["a", "c"]);
        assert_eq!(sheet.gross(), Decimal::from(4));

        let events = director.take_events();
        assert_eq!(events.len(), 3);
        assert!(events[1].is_failure());
        assert_eq!(events[1].adapter(), "b");
    }

    #[tokio::test]
    async fn test_inactive_adapter_is_skipped() {
        let registry = registry(vec![stub("a", 0, Behaviour::AddItem(1)), stub("off", 1, Behaviour::Inactive)]);
        let mut director = PricingDirector::new(registry, Duration::from_secs(1));
        director.calculate(&context(), &RequestContext::new()).await;

        assert_eq!(director.result_sheet().gross(), Decimal::ONE);
        assert!(matches!(director.take_events()[0], PricingEvent::AdapterSkipped { .. }));
    }

    #[tokio::test]
    async fn test_failing_activation_check_skips_adapter() {
        let registry = registry(vec![stub("broken", 0, Behaviour::BrokenActivation), stub("a", 1, Behaviour::AddItem(5))]);
        let mut director = PricingDirector::new(registry, Duration::from_secs(1));
        director.calculate(&context(), &RequestContext::new()).await;

        assert_eq!(adapters_of(&director.result_sheet()), vec!["a"]);
        let events = director.take_events();
        assert!(matches!(
            &events[0],
            PricingEvent::AdapterFailed { adapter, reason, .. } if adapter == "broken" && reason.contains("missing rate table")
        ));
        assert!(matches!(events[1], PricingEvent::AdapterApplied { rows: 1, .. }));
    }

    #[tokio::test]
    async fn test_result_before_calculate_is_empty() {
        let director = PricingDirector::new(registry(vec![stub("a", 0, Behaviour::AddItem(1))]), Duration::from_secs(1));
        let sheet = director.result_sheet();
        assert!(sheet.rows().is_empty());
        assert!(!sheet.is_valid());
    }

    #[tokio::test]
    async fn test_timeout_counts_as_failure() {
        let registry = registry(vec![stub("slow", 0, Behaviour::Hang), stub("after", 1, Behaviour::AddItem(7))]);
        let mut director = PricingDirector::new(registry, Duration::from_millis(50));
        director.calculate(&context(), &RequestContext::new()).await;

        assert_eq!(adapters_of(&director.result_sheet()), vec!["after"]);
        let events = director.take_events();
        assert!(matches!(&events[0], PricingEvent::AdapterFailed { reason, .. } if reason.contains("timed out")));
    }

    #[tokio::test]
    async fn test_rows_in_foreign_currency_are_rejected() {
        let registry = registry(vec![stub("eur", 0, Behaviour::WrongCurrency), stub("a", 1, Behaviour::AddItem(2))]);
        let mut director = PricingDirector::new(registry, Duration::from_secs(1));
        director.calculate(&context(), &RequestContext::new()).await;

        let sheet = director.result_sheet();
        assert_eq!(sheet.rows().len(), 1);
        assert_eq!(sheet.currency(), "CHF");
    }

    #[tokio::test]
    async fn test_adapters_see_accumulated_rows_and_runs_are_repeatable() {
        let registry = registry(vec![
            stub("first", 0, Behaviour::AddItem(10)),
            stub("second", 0, Behaviour::AddItem(20)),
            stub("count", 5, Behaviour::CountPriorRows),
        ]);
        let mut director = PricingDirector::new(registry, Duration::from_secs(1));
        let request = RequestContext::new();

        director.calculate(&context(), &request).await;
        let first = director.result_sheet();
        director.calculate(&context(), &request).await;
        let second = director.result_sheet();

        assert_eq!(first.rows().last().unwrap().amount, Decimal::from(2));
        assert_eq!(serde_json::to_string(&first).unwrap(), serde_json::to_string(&second).unwrap());
    }

    #[tokio::test]
    async fn test_only_matching_discounts_are_passed() {
        let registry = registry(vec![stub("discounted", 0, Behaviour::CountDiscounts)]);
        let mut ctx = context();
        ctx.discounts = vec![
            Discount::new("discounted", DiscountValue::Rate(Decimal::new(1, 1))),
            Discount::new("discounted", DiscountValue::FixedRate(Decimal::from(100))),
            Discount::new("elsewhere", DiscountValue::FixedRate(Decimal::from(100))),
        ];
        let mut director = PricingDirector::new(registry, Duration::from_secs(1));
        director.calculate(&ctx, &RequestContext::new()).await;

        assert_eq!(director.into_result_sheet().gross(), Decimal::from(2));
    }
}
