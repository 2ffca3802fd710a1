//! Append-only pricing ledger with aggregation queries.
//!
//! Rows are additive: after a chain's tax adapter has run, item, delivery,
//! payment and discount rows hold net amounts and tax rows hold the tax, so
//! `gross()` is the plain sum of all rows and `net()` removes the tax again.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{round_units, Money};
use crate::pricing::row::{CalculationRow, NewRow, RowCategory};

/// Row selection used by [`PricingSheet::sum`] and [`PricingSheet::filter_by`].
#[derive(Clone, Copy, Debug, Default)]
pub struct RowFilter<'a> {
    pub category: Option<RowCategory>,
    pub discount_id: Option<&'a str>,
}

impl<'a> RowFilter<'a> {
    pub fn category(category: RowCategory) -> Self {
        Self { category: Some(category), discount_id: None }
    }

    pub fn discount(discount_id: &'a str) -> Self {
        Self { category: None, discount_id: Some(discount_id) }
    }

    pub fn and_discount(mut self, discount_id: &'a str) -> Self {
        self.discount_id = Some(discount_id);
        self
    }

    fn matches(&self, row: &CalculationRow) -> bool {
        self.category.map_or(true, |category| row.category == category)
            && self.discount_id.map_or(true, |id| row.discount_id.as_deref() == Some(id))
    }
}

/// Amount deducted by one discount, as shown to customers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountPrice {
    pub discount_id: String,
    pub amount: Decimal,
    pub currency: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingSheet {
    currency: String,
    quantity: u32,
    calculation: Vec<CalculationRow>,
}

impl PricingSheet {
    pub fn new(currency: &str) -> Self {
        Self::for_quantity(currency, 1)
    }

    pub fn for_quantity(currency: &str, quantity: u32) -> Self {
        Self { currency: currency.to_string(), quantity, calculation: Vec::new() }
    }

    /// Wraps rows that were calculated earlier, e.g. a persisted position sheet.
    pub fn from_rows(currency: &str, quantity: u32, calculation: Vec<CalculationRow>) -> Self {
        Self { currency: currency.to_string(), quantity, calculation }
    }

    pub fn currency(&self) -> &str { &self.currency }
    pub fn quantity(&self) -> u32 { self.quantity }
    pub fn rows(&self) -> &[CalculationRow] { &self.calculation }
    pub fn into_rows(self) -> Vec<CalculationRow> { self.calculation }

    pub fn add(&mut self, category: RowCategory, row: NewRow) {
        let row = row.into_row(category, &self.currency);
        self.calculation.push(row);
    }

    pub fn add_item(&mut self, row: NewRow) { self.add(RowCategory::Item, row) }
    pub fn add_tax(&mut self, row: NewRow) { self.add(RowCategory::Tax, row) }
    pub fn add_discount(&mut self, row: NewRow) { self.add(RowCategory::Discount, row) }
    pub fn add_delivery(&mut self, row: NewRow) { self.add(RowCategory::Delivery, row) }
    pub fn add_payment(&mut self, row: NewRow) { self.add(RowCategory::Payment, row) }

    /// Appends rows produced elsewhere, unchanged.
    pub fn extend(&mut self, rows: impl IntoIterator<Item = CalculationRow>) {
        self.calculation.extend(rows);
    }

    pub fn filter_by<'s>(&'s self, filter: RowFilter<'s>) -> impl Iterator<Item = &'s CalculationRow> + 's {
        self.calculation.iter().filter(move |row| filter.matches(row))
    }

    pub fn get_rows(&self, category: RowCategory) -> Vec<&CalculationRow> {
        self.filter_by(RowFilter::category(category)).collect()
    }

    pub fn sum(&self, filter: RowFilter<'_>) -> Decimal {
        self.filter_by(filter).map(|row| row.amount).sum()
    }

    pub fn gross(&self) -> Decimal { self.sum(RowFilter::default()) }
    pub fn net(&self) -> Decimal { self.gross() - self.tax_sum() }
    pub fn tax_sum(&self) -> Decimal { self.sum(RowFilter::category(RowCategory::Tax)) }
    pub fn items_sum(&self) -> Decimal { self.sum(RowFilter::category(RowCategory::Item)) }
    pub fn delivery_sum(&self) -> Decimal { self.sum(RowFilter::category(RowCategory::Delivery)) }
    pub fn payment_sum(&self) -> Decimal { self.sum(RowFilter::category(RowCategory::Payment)) }

    /// Sum of discount rows, optionally for a single discount.
    pub fn discount_sum(&self, discount_id: Option<&str>) -> Decimal {
        let filter = RowFilter::category(RowCategory::Discount);
        match discount_id {
            Some(id) => self.sum(filter.and_discount(id)),
            None => self.sum(filter),
        }
    }

    /// Gross or net total, rounded to whole units.
    pub fn total(&self, use_net_price: bool) -> Money {
        let amount = if use_net_price { self.net() } else { self.gross() };
        Money::new(round_units(amount), &self.currency)
    }

    /// Unrounded total divided by the quantity, rounded once.
    pub fn unit_price(&self, use_net_price: bool) -> Money {
        if self.quantity == 0 {
            return Money::zero(&self.currency);
        }
        let amount = if use_net_price { self.net() } else { self.gross() };
        Money::new(round_units(amount / Decimal::from(self.quantity)), &self.currency)
    }

    /// Deductions per discount in order of first appearance.
    ///
    /// The amount includes the tax share booked for the discount, is positive
    /// for a deduction and discounts that net out to zero are left out.
    pub fn discount_prices(&self, discount_id: Option<&str>) -> Vec<DiscountPrice> {
        let mut discount_ids: Vec<&str> = Vec::new();
        for row in self.filter_by(RowFilter::category(RowCategory::Discount)) {
            if let Some(id) = row.discount_id.as_deref() {
                if discount_id.map_or(true, |wanted| wanted == id) && !discount_ids.contains(&id) {
                    discount_ids.push(id);
                }
            }
        }
        discount_ids
            .into_iter()
            .filter_map(|id| {
                let amount = round_units(-self.sum(RowFilter::discount(id)));
                (!amount.is_zero()).then(|| DiscountPrice {
                    discount_id: id.to_string(),
                    amount,
                    currency: self.currency.clone(),
                })
            })
            .collect()
    }

    pub fn is_valid(&self) -> bool {
        !self.calculation.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(amount: i64) -> Decimal {
        Decimal::from(amount)
    }

    fn product_sheet() -> PricingSheet {
        let mut sheet = PricingSheet::for_quantity("CHF", 2);
        sheet.add_item(NewRow::new(d(2162)).taxable(true).net_price(false));
        sheet.add_item(NewRow::new(d(-162)).taxable(false).net_price(true));
        sheet.add_tax(NewRow::new(d(162)).rate(Decimal::new(81, 3)));
        sheet
    }

    #[test]
    fn test_gross_net_and_tax() {
        let sheet = product_sheet();
        assert_eq!(sheet.gross(), d(2162));
        assert_eq!(sheet.net(), d(2000));
        assert_eq!(sheet.tax_sum(), d(162));
        assert_eq!(sheet.items_sum(), d(2000));
        assert_eq!(sheet.gross(), sheet.net() + sheet.tax_sum());
        assert!(sheet.is_valid());
        assert!(!PricingSheet::new("CHF").is_valid());
    }

    #[test]
    fn test_unit_price() {
        let sheet = product_sheet();
        assert_eq!(sheet.unit_price(false).amount(), d(1081));
        assert_eq!(sheet.unit_price(true).amount(), d(1000));
        assert_eq!(sheet.total(true), Money::new(d(2000), "CHF"));
        assert_eq!(PricingSheet::for_quantity("CHF", 0).unit_price(false).amount(), d(0));
    }

    #[test]
    fn test_unit_price_rounds_once() {
        let mut sheet = PricingSheet::for_quantity("CHF", 2);
        sheet.add_item(NewRow::new(Decimal::new(21626, 1)));
        assert_eq!(sheet.total(false).amount(), d(2163));
        assert_eq!(sheet.unit_price(false).amount(), d(1081));
    }

    #[test]
    fn test_discount_prices() {
        let mut sheet = PricingSheet::new("CHF");
        sheet.add_item(NewRow::new(d(100)));
        sheet.add_discount(NewRow::new(d(-20)).discount("x"));
        sheet.add_discount(NewRow::new(d(-20)).discount("x"));

        assert_eq!(
            sheet.discount_prices(Some("x")),
            vec![DiscountPrice { discount_id: "x".into(), amount: d(40), currency: "CHF".into() }]
        );
        assert!(sheet.discount_prices(Some("not-a-discount")).is_empty());
        assert_eq!(sheet.discount_sum(Some("x")), d(-40));
    }

    #[test]
    fn test_discount_prices_include_tax_share_and_skip_zero() {
        let mut sheet = PricingSheet::new("CHF");
        sheet.add_discount(NewRow::new(Decimal::new(-9251, 1)).discount("a"));
        sheet.add_tax(NewRow::new(Decimal::new(-749, 1)).discount("a"));
        sheet.add_discount(NewRow::new(d(-50)).discount("b"));
        sheet.add_discount(NewRow::new(d(50)).discount("b"));
        sheet.add_discount(NewRow::new(d(-10)).discount("c"));

        let prices = sheet.discount_prices(None);
        assert_eq!(prices.len(), 2);
        assert_eq!(prices[0].discount_id, "a");
        assert_eq!(prices[0].amount, d(1000));
        assert_eq!(prices[1].discount_id, "c");
        assert_eq!(sheet.discount_sum(None), Decimal::new(-9351, 1));
    }

    #[test]
    fn test_get_rows_keeps_order() {
        let mut sheet = PricingSheet::new("CHF");
        sheet.add_delivery(NewRow::new(d(900)));
        sheet.add_payment(NewRow::new(d(200)));
        sheet.add_delivery(NewRow::new(d(-100)));

        let deliveries: Vec<Decimal> = sheet.get_rows(RowCategory::Delivery).iter().map(|r| r.amount).collect();
        assert_eq!(deliveries, vec![d(900), d(-100)]);
        assert_eq!(sheet.delivery_sum(), d(800));
        assert_eq!(sheet.payment_sum(), d(200));
        assert!(sheet.rows().iter().all(|r| r.currency == "CHF"));
    }
}
