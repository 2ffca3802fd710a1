//! Pricing contexts handed to adapters.
//!
//! Each pricing domain (product, delivery, payment, order) gets its own
//! context built from the domain entity. Contexts own their data so a run
//! never holds a borrow on the entity it will write back to.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::aggregates::{Order, OrderPosition, Product, Provider};
use crate::pricing::discount::Discount;
use crate::pricing::row::CalculationRow;
use crate::pricing::sheet::PricingSheet;

/// Data every pricing context exposes to the director and generic adapters.
pub trait PricingContext: Send + Sync + 'static {
    fn currency(&self) -> &str;
    fn country(&self) -> &str;
    fn discounts(&self) -> &[Discount];

    fn quantity(&self) -> u32 {
        1
    }
}

/// Per-request data that is not part of the priced entity.
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub locale: Option<String>,
    pub user_id: Option<String>,
    pub received_at: DateTime<Utc>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self { request_id: Uuid::new_v4(), locale: None, user_id: None, received_at: Utc::now() }
    }

    pub fn for_user(user_id: Option<String>) -> Self {
        Self { user_id, ..Self::new() }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug)]
pub struct ProductPricingContext {
    pub product: Product,
    pub quantity: u32,
    pub currency: String,
    pub country: String,
    pub user_id: Option<String>,
    pub discounts: Vec<Discount>,
}

impl ProductPricingContext {
    pub fn new(product: Product, quantity: u32, currency: &str, country: &str) -> Self {
        Self {
            product,
            quantity,
            currency: currency.to_uppercase(),
            country: country.to_uppercase(),
            user_id: None,
            discounts: Vec::new(),
        }
    }

    pub fn for_position(order: &Order, position: &OrderPosition) -> Self {
        Self {
            user_id: order.user_id().map(str::to_string),
            discounts: order.discounts().to_vec(),
            ..Self::new(position.product.clone(), position.quantity, order.currency(), order.country())
        }
    }
}

impl PricingContext for ProductPricingContext {
    fn currency(&self) -> &str { &self.currency }
    fn country(&self) -> &str { &self.country }
    fn discounts(&self) -> &[Discount] { &self.discounts }
    fn quantity(&self) -> u32 { self.quantity }
}

/// Shared shape of the delivery and payment fee contexts.
#[derive(Clone, Debug)]
pub struct ProviderPricingContext {
    pub provider: Provider,
    /// Gross of all order positions, used for thresholds and percentage fees.
    pub items_total: Decimal,
    pub currency: String,
    pub country: String,
    pub user_id: Option<String>,
    pub discounts: Vec<Discount>,
}

impl ProviderPricingContext {
    pub fn new(provider: Provider, items_total: Decimal, currency: &str, country: &str) -> Self {
        Self {
            provider,
            items_total,
            currency: currency.to_uppercase(),
            country: country.to_uppercase(),
            user_id: None,
            discounts: Vec::new(),
        }
    }

    fn for_order(order: &Order, provider: &Provider, items_total: Decimal) -> Self {
        Self {
            user_id: order.user_id().map(str::to_string),
            discounts: order.discounts().to_vec(),
            ..Self::new(provider.clone(), items_total, order.currency(), order.country())
        }
    }
}

#[derive(Clone, Debug)]
pub struct DeliveryPricingContext(pub ProviderPricingContext);

#[derive(Clone, Debug)]
pub struct PaymentPricingContext(pub ProviderPricingContext);

impl DeliveryPricingContext {
    pub fn for_order(order: &Order, items_total: Decimal) -> Option<Self> {
        order.delivery().map(|d| Self(ProviderPricingContext::for_order(order, &d.provider, items_total)))
    }
}

impl PaymentPricingContext {
    pub fn for_order(order: &Order, items_total: Decimal) -> Option<Self> {
        order.payment().map(|p| Self(ProviderPricingContext::for_order(order, &p.provider, items_total)))
    }
}

impl std::ops::Deref for DeliveryPricingContext {
    type Target = ProviderPricingContext;
    fn deref(&self) -> &Self::Target { &self.0 }
}

impl std::ops::Deref for PaymentPricingContext {
    type Target = ProviderPricingContext;
    fn deref(&self) -> &Self::Target { &self.0 }
}

impl PricingContext for DeliveryPricingContext {
    fn currency(&self) -> &str { &self.0.currency }
    fn country(&self) -> &str { &self.0.country }
    fn discounts(&self) -> &[Discount] { &self.0.discounts }
}

impl PricingContext for PaymentPricingContext {
    fn currency(&self) -> &str { &self.0.currency }
    fn country(&self) -> &str { &self.0.country }
    fn discounts(&self) -> &[Discount] { &self.0.discounts }
}

/// Order context: the already calculated component sheets plus discounts.
#[derive(Clone, Debug)]
pub struct OrderPricingContext {
    pub order_id: String,
    pub positions: Vec<PositionCalculation>,
    pub delivery: Option<Vec<CalculationRow>>,
    pub payment: Option<Vec<CalculationRow>>,
    pub currency: String,
    pub country: String,
    pub user_id: Option<String>,
    pub discounts: Vec<Discount>,
}

#[derive(Clone, Debug)]
pub struct PositionCalculation {
    pub position_id: String,
    pub quantity: u32,
    pub calculation: Vec<CalculationRow>,
}

impl OrderPricingContext {
    pub fn from_order(order: &Order) -> Self {
        Self {
            order_id: order.id().to_string(),
            positions: order
                .positions()
                .iter()
                .map(|p| PositionCalculation {
                    position_id: p.id.clone(),
                    quantity: p.quantity,
                    calculation: p.calculation.clone(),
                })
                .collect(),
            delivery: order.delivery().map(|d| d.calculation.clone()),
            payment: order.payment().map(|p| p.calculation.clone()),
            currency: order.currency().to_string(),
            country: order.country().to_string(),
            user_id: order.user_id().map(str::to_string),
            discounts: order.discounts().to_vec(),
        }
    }

    pub fn position_sheets(&self) -> Vec<PricingSheet> {
        self.positions
            .iter()
            .map(|p| PricingSheet::from_rows(&self.currency, p.quantity, p.calculation.clone()))
            .collect()
    }

    pub fn delivery_sheet(&self) -> Option<PricingSheet> {
        self.delivery.as_ref().map(|rows| PricingSheet::from_rows(&self.currency, 1, rows.clone()))
    }

    pub fn payment_sheet(&self) -> Option<PricingSheet> {
        self.payment.as_ref().map(|rows| PricingSheet::from_rows(&self.currency, 1, rows.clone()))
    }
}

impl PricingContext for OrderPricingContext {
    fn currency(&self) -> &str { &self.currency }
    fn country(&self) -> &str { &self.country }
    fn discounts(&self) -> &[Discount] { &self.discounts }
}
