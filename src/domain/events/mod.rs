//! Domain events
use crate::registry::PluginFamily;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "domain", content = "event")]
pub enum DomainEvent {
    Pricing(PricingEvent),
    Order(OrderEvent),
}

/// Outcome of one adapter within a director run.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PricingEvent {
    AdapterApplied { family: PluginFamily, adapter: String, rows: usize },
    AdapterSkipped { family: PluginFamily, adapter: String },
    AdapterFailed { family: PluginFamily, adapter: String, reason: String },
}

impl PricingEvent {
    pub fn adapter(&self) -> &str {
        match self {
            Self::AdapterApplied { adapter, .. } | Self::AdapterSkipped { adapter, .. } | Self::AdapterFailed { adapter, .. } => adapter,
        }
    }
    pub fn is_failure(&self) -> bool { matches!(self, Self::AdapterFailed { .. }) }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OrderEvent {
    DiscountAdded { order_id: String, discount_id: String },
    DiscountRemoved { order_id: String, discount_id: String },
    Repriced { order_id: String, gross: Decimal, priced_at: DateTime<Utc> },
}
