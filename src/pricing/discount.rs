//! Discounts attached to an order and the configuration pricing adapters see.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pricing::adapters::ORDER_DISCOUNT_KEY;
use crate::pricing::sheet::{PricingSheet, RowFilter};

/// Who caused the discount to be applied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountTrigger {
    #[default]
    System,
    User,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DiscountValue {
    /// Fraction of the discounted amount, `0.1` for 10%.
    Rate(Decimal),
    /// Absolute amount in the smallest currency unit.
    FixedRate(Decimal),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discount {
    pub discount_id: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub trigger: DiscountTrigger,
    /// Key of the pricing adapter that applies this discount.
    pub adapter_key: String,
    pub value: DiscountValue,
}

impl Discount {
    pub fn new(adapter_key: impl Into<String>, value: DiscountValue) -> Self {
        Self {
            discount_id: Uuid::new_v4().to_string(),
            code: None,
            trigger: DiscountTrigger::System,
            adapter_key: adapter_key.into(),
            value,
        }
    }

    /// Discount distributed across the whole order by the order discount adapter.
    pub fn order_discount(value: DiscountValue) -> Self {
        Self::new(ORDER_DISCOUNT_KEY, value)
    }

    pub fn with_id(mut self, discount_id: impl Into<String>) -> Self {
        self.discount_id = discount_id.into();
        self
    }

    /// Marks the discount as entered by the customer through a code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self.trigger = DiscountTrigger::User;
        self
    }

    /// Configuration for the given pricing adapter, or `None` when the
    /// discount is not handled by that adapter.
    ///
    /// Whatever earlier adapters in the same run already booked against this
    /// discount (discount rows plus their tax share) is reported as
    /// `already_deducted`.
    pub fn configuration_for_adapter_key(
        &self,
        adapter_key: &str,
        calculation: &PricingSheet,
    ) -> Option<DiscountConfiguration> {
        if self.adapter_key != adapter_key {
            return None;
        }
        let already_deducted = (-calculation.sum(RowFilter::discount(&self.discount_id))).max(Decimal::ZERO);
        Some(DiscountConfiguration { value: self.value, already_deducted })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountConfiguration {
    pub value: DiscountValue,
    pub already_deducted: Decimal,
}

impl DiscountConfiguration {
    /// Deduction this discount asks for on a group worth `group_total`.
    pub fn deduction(&self, group_total: Decimal) -> Decimal {
        match self.value {
            DiscountValue::Rate(rate) => group_total * rate,
            DiscountValue::FixedRate(fixed) => fixed,
        }
    }

    /// Most this discount may deduct from a pool worth `pool_total`, before
    /// subtracting what was already deducted.
    pub fn ceiling(&self, pool_total: Decimal) -> Decimal {
        self.deduction(pool_total)
    }
}

/// A discount that matched the adapter about to run.
#[derive(Clone, Debug, PartialEq)]
pub struct ApplicableDiscount {
    pub discount_id: String,
    pub configuration: DiscountConfiguration,
}
