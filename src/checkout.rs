//! Checkout workflow.
//!
//! Prices an order bottom-up: every position through the product chain,
//! then delivery and payment (which see the items total), and finally the
//! order chain, which reads all component sheets. The resulting rows are
//! written back to the order.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, info_span, Instrument};

use crate::domain::aggregates::Order;
use crate::domain::events::{DomainEvent, PricingEvent};
use crate::domain::value_objects::Money;
use crate::plugins::messaging::{self, Message};
use crate::plugins::payment::ChargeOutcome;
use crate::plugins::Plugins;
use crate::pricing::{
    DeliveryPricingContext, DiscountPrice, OrderPricingContext, PaymentPricingContext, PricingSheet,
    ProductPricingContext, RequestContext,
};
use crate::{EngineError, Result};

/// All sheets produced while pricing one order.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPricing {
    pub order_id: String,
    pub positions: Vec<PricingSheet>,
    pub delivery: Option<PricingSheet>,
    pub payment: Option<PricingSheet>,
    pub order: PricingSheet,
    pub events: Vec<PricingEvent>,
}

impl OrderPricing {
    pub fn total(&self, use_net_price: bool) -> Money {
        self.order.total(use_net_price)
    }

    pub fn items_total(&self) -> Decimal {
        self.positions.iter().map(PricingSheet::gross).sum()
    }

    pub fn discounts(&self) -> Vec<DiscountPrice> {
        self.order.discount_prices(None)
    }

    pub fn has_failures(&self) -> bool {
        self.events.iter().any(PricingEvent::is_failure)
    }
}

pub async fn price_order(plugins: &Plugins, order: &mut Order, request: &RequestContext) -> OrderPricing {
    let span = info_span!("price_order", order_id = order.id(), request_id = %request.request_id);
    async move {
        let mut events = Vec::new();

        let mut director = plugins.product_director();
        let mut positions = Vec::with_capacity(order.positions().len());
        for index in 0..order.positions().len() {
            let context = ProductPricingContext::for_position(order, &order.positions()[index]);
            director.calculate(&context, request).await;
            events.extend(director.take_events());
            let sheet = director.result_sheet();
            order.set_position_calculation(index, sheet.rows().to_vec());
            positions.push(sheet);
        }
        let items_total: Decimal = positions.iter().map(PricingSheet::gross).sum();

        let delivery = match DeliveryPricingContext::for_order(order, items_total) {
            Some(context) => {
                let mut director = plugins.delivery_director();
                director.calculate(&context, request).await;
                events.extend(director.take_events());
                let sheet = director.into_result_sheet();
                order.set_delivery_calculation(sheet.rows().to_vec());
                Some(sheet)
            }
            None => None,
        };

        let payment = match PaymentPricingContext::for_order(order, items_total) {
            Some(context) => {
                let mut director = plugins.payment_director();
                director.calculate(&context, request).await;
                events.extend(director.take_events());
                let sheet = director.into_result_sheet();
                order.set_payment_calculation(sheet.rows().to_vec());
                Some(sheet)
            }
            None => None,
        };

        let mut director = plugins.order_director();
        director.calculate(&OrderPricingContext::from_order(order), request).await;
        events.extend(director.take_events());
        let sheet = director.into_result_sheet();
        let gross = sheet.total(false).amount();
        order.set_calculation(sheet.rows().to_vec(), gross);

        info!(%gross, currency = order.currency(), positions = positions.len(), "order priced");
        OrderPricing { order_id: order.id().to_string(), positions, delivery, payment, order: sheet, events }
    }
    .instrument(span)
    .await
}

/// Charges the order's priced gross total through its payment provider.
pub async fn charge_order(plugins: &Plugins, order: &Order) -> Result<ChargeOutcome> {
    let payment = order
        .payment()
        .ok_or_else(|| EngineError::Validation("order has no payment provider".into()))?;
    let adapter = plugins.payment_providers().actions(&payment.provider).adapter()?;
    let total = PricingSheet::from_rows(order.currency(), 1, order.calculation().to_vec()).total(false);
    adapter.charge(&payment.provider, order.id(), &total).await
}

/// Publishes the order's pending domain events; returns how many deliveries succeeded.
pub async fn publish_events(plugins: &Plugins, order: &mut Order) -> Result<usize> {
    let mut delivered = 0;
    for event in order.take_events() {
        let subject = match &event {
            DomainEvent::Pricing(_) => "opensase.pricing",
            DomainEvent::Order(_) => "opensase.order",
        };
        delivered += messaging::dispatch(&plugins.messaging, &Message::new(subject, &event)?).await;
    }
    Ok(delivered)
}
