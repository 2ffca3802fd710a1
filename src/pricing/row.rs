//! Calculation rows, the unit of every pricing ledger.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RowCategory {
    Item,
    Tax,
    Discount,
    Delivery,
    Payment,
}

/// One immutable ledger entry.
///
/// Amounts are additive and expressed in the smallest currency unit;
/// fractions are kept until a total is rounded for display.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationRow {
    pub category: RowCategory,
    pub amount: Decimal,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_taxable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_net_price: Option<bool>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, Value>,
}

impl CalculationRow {
    /// Key of the adapter that produced the row, if it tagged itself.
    pub fn adapter(&self) -> Option<&str> {
        self.meta.get("adapter").and_then(Value::as_str)
    }

    pub fn is_taxable(&self) -> bool {
        self.is_taxable.unwrap_or(false)
    }

    pub fn is_net_price(&self) -> bool {
        self.is_net_price.unwrap_or(false)
    }
}

/// Row contents before a sheet stamps category and currency on them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NewRow {
    amount: Decimal,
    discount_id: Option<String>,
    rate: Option<Decimal>,
    is_taxable: Option<bool>,
    is_net_price: Option<bool>,
    meta: BTreeMap<String, Value>,
}

impl NewRow {
    pub fn new(amount: Decimal) -> Self {
        Self { amount, ..Self::default() }
    }

    pub fn discount(mut self, discount_id: impl Into<String>) -> Self {
        self.discount_id = Some(discount_id.into());
        self
    }

    pub fn rate(mut self, rate: Decimal) -> Self {
        self.rate = Some(rate);
        self
    }

    pub fn taxable(mut self, is_taxable: bool) -> Self {
        self.is_taxable = Some(is_taxable);
        self
    }

    pub fn net_price(mut self, is_net_price: bool) -> Self {
        self.is_net_price = Some(is_net_price);
        self
    }

    pub fn adapter(self, key: &str) -> Self {
        self.meta("adapter", key)
    }

    pub fn meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.meta.insert(key.to_string(), value.into());
        self
    }

    pub(crate) fn into_row(self, category: RowCategory, currency: &str) -> CalculationRow {
        CalculationRow {
            category,
            amount: self.amount,
            currency: currency.to_string(),
            discount_id: self.discount_id,
            rate: self.rate,
            is_taxable: self.is_taxable,
            is_net_price: self.is_net_price,
            meta: self.meta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_serializes_without_empty_fields() {
        let row = NewRow::new(Decimal::new(-200, 0))
            .discount("SPRING")
            .adapter("opensase.pricing.order-discount")
            .into_row(RowCategory::Discount, "CHF");

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["category"], "DISCOUNT");
        assert_eq!(json["discountId"], "SPRING");
        assert_eq!(json["meta"]["adapter"], "opensase.pricing.order-discount");
        assert!(json.get("rate").is_none());
        assert!(json.get("isTaxable").is_none());
        assert_eq!(row.adapter(), Some("opensase.pricing.order-discount"));

        let back: CalculationRow = serde_json::from_value(json).unwrap();
        assert_eq!(back, row);
    }
}
