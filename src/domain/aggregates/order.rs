//! Order Aggregate
//!
//! Only the parts of an order the pricing engine reads or writes back:
//! positions, the chosen delivery and payment providers, discounts and the
//! calculation rows of every component.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;
use crate::domain::aggregates::{Product, Provider};
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::pricing::{CalculationRow, Discount};

#[derive(Clone, Debug)]
pub struct Order {
    id: String,
    user_id: Option<String>,
    currency: String,
    country: String,
    positions: Vec<OrderPosition>,
    delivery: Option<OrderDelivery>,
    payment: Option<OrderPayment>,
    discounts: Vec<Discount>,
    calculation: Vec<CalculationRow>,
    updated_at: DateTime<Utc>,
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug)] pub struct OrderPosition { pub id: String, pub product: Product, pub quantity: u32, pub calculation: Vec<CalculationRow> }
#[derive(Clone, Debug)] pub struct OrderDelivery { pub provider: Provider, pub calculation: Vec<CalculationRow> }
#[derive(Clone, Debug)] pub struct OrderPayment { pub provider: Provider, pub calculation: Vec<CalculationRow> }

impl Order {
    pub fn create(user_id: Option<String>, currency: &str, country: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(), user_id, currency: currency.to_uppercase(), country: country.to_uppercase(),
            positions: vec![], delivery: None, payment: None, discounts: vec![], calculation: vec![],
            updated_at: now, events: vec![],
        }
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn user_id(&self) -> Option<&str> { self.user_id.as_deref() }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn country(&self) -> &str { &self.country }
    pub fn positions(&self) -> &[OrderPosition] { &self.positions }
    pub fn delivery(&self) -> Option<&OrderDelivery> { self.delivery.as_ref() }
    pub fn payment(&self) -> Option<&OrderPayment> { self.payment.as_ref() }
    pub fn discounts(&self) -> &[Discount] { &self.discounts }
    pub fn calculation(&self) -> &[CalculationRow] { &self.calculation }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    pub fn add_position(&mut self, product: Product, quantity: u32) -> Result<&OrderPosition, OrderError> {
        if quantity == 0 { return Err(OrderError::InvalidQuantity); }
        self.positions.push(OrderPosition { id: Uuid::new_v4().to_string(), product, quantity, calculation: vec![] });
        self.touch();
        Ok(&self.positions[self.positions.len() - 1])
    }

    pub fn set_delivery_provider(&mut self, provider: Provider) {
        self.delivery = Some(OrderDelivery { provider, calculation: vec![] });
        self.touch();
    }

    pub fn set_payment_provider(&mut self, provider: Provider) {
        self.payment = Some(OrderPayment { provider, calculation: vec![] });
        self.touch();
    }

    pub fn add_discount(&mut self, discount: Discount) -> Result<(), OrderError> {
        if self.discounts.iter().any(|d| d.discount_id == discount.discount_id) { return Err(OrderError::DuplicateDiscount); }
        self.raise_event(DomainEvent::Order(OrderEvent::DiscountAdded { order_id: self.id.clone(), discount_id: discount.discount_id.clone() }));
        self.discounts.push(discount);
        self.touch();
        Ok(())
    }

    pub fn remove_discount(&mut self, discount_id: &str) -> Result<Discount, OrderError> {
        let index = self.discounts.iter().position(|d| d.discount_id == discount_id).ok_or(OrderError::DiscountNotFound)?;
        let discount = self.discounts.remove(index);
        self.raise_event(DomainEvent::Order(OrderEvent::DiscountRemoved { order_id: self.id.clone(), discount_id: discount.discount_id.clone() }));
        self.touch();
        Ok(discount)
    }

    pub(crate) fn set_position_calculation(&mut self, index: usize, rows: Vec<CalculationRow>) {
        if let Some(position) = self.positions.get_mut(index) { position.calculation = rows; }
    }

    pub(crate) fn set_delivery_calculation(&mut self, rows: Vec<CalculationRow>) {
        if let Some(delivery) = self.delivery.as_mut() { delivery.calculation = rows; }
    }

    pub(crate) fn set_payment_calculation(&mut self, rows: Vec<CalculationRow>) {
        if let Some(payment) = self.payment.as_mut() { payment.calculation = rows; }
    }

    pub(crate) fn set_calculation(&mut self, rows: Vec<CalculationRow>, gross: Decimal) {
        self.calculation = rows;
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::Repriced { order_id: self.id.clone(), gross, priced_at: self.updated_at }));
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq)] pub enum OrderError { InvalidQuantity, DuplicateDiscount, DiscountNotFound }
impl std::error::Error for OrderError {}
impl std::fmt::Display for OrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidQuantity => write!(f, "Invalid quantity"),
            Self::DuplicateDiscount => write!(f, "Discount already applied"),
            Self::DiscountNotFound => write!(f, "Discount not found"),
        }
    }
}
