//! Order discount allocation.
//!
//! Order level discounts are spread over a pool made of every position's
//! product sheet plus the delivery and payment sheets. Items are served
//! first. A fixed discount reaches delivery and payment only with what the
//! items could not absorb, while a rate discount takes its rate from every
//! group. Each deduction is split into its net and tax parts using the tax
//! structure of the member it is taken from, so the order's tax stays
//! correct after discounting.

use std::ops::AddAssign;

use async_trait::async_trait;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::debug;

use crate::domain::value_objects::round_units;
use crate::pricing::adapters::ORDER_DISCOUNT_KEY;
use crate::pricing::context::OrderPricingContext;
use crate::pricing::director::{PricingAdapter, PricingRun};
use crate::pricing::discount::ApplicableDiscount;
use crate::pricing::row::{CalculationRow, NewRow};
use crate::pricing::sheet::PricingSheet;
use crate::registry::Adapter;
use crate::Result;

/// Decimal places kept in a group's booked deduction.
pub const ALLOCATION_SCALE: u32 = 4;

/// One pool member's proportion of its group and its tax structure.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Share {
    pub ratio: Decimal,
    /// `gross / net` of the member; `1` means untaxed.
    pub tax_divisor: Decimal,
}

impl Share {
    /// Share of `sheet` within a group worth `pool_total`.
    pub fn of(sheet: Option<&PricingSheet>, pool_total: Decimal) -> Self {
        let sheet = match sheet {
            Some(sheet) if !pool_total.is_zero() => sheet,
            _ => return Self { ratio: Decimal::ONE, tax_divisor: Decimal::ONE },
        };
        let gross = sheet.gross();
        let net = gross - sheet.tax_sum();
        if net.is_zero() {
            return Self { ratio: Decimal::ZERO, tax_divisor: Decimal::ZERO };
        }
        Self {
            ratio: gross.checked_div(pool_total).unwrap_or(Decimal::ZERO),
            tax_divisor: gross.checked_div(net).unwrap_or(Decimal::ZERO),
        }
    }

    /// Part of `amount` this member carries, with the tax contained in it.
    pub fn allocate(&self, amount: Decimal) -> Allocation {
        let discount_amount = amount.checked_mul(self.ratio).unwrap_or(Decimal::ZERO);
        let tax_amount = discount_amount
            .checked_div(self.tax_divisor)
            .map(|net| discount_amount - net)
            .unwrap_or(Decimal::ZERO);
        Allocation { discount_amount, tax_amount }
    }
}

/// Gross deduction and the tax it contains.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Allocation {
    pub discount_amount: Decimal,
    pub tax_amount: Decimal,
}

impl Allocation {
    fn rounded(self) -> Self {
        let round = |amount: Decimal| amount.round_dp_with_strategy(ALLOCATION_SCALE, RoundingStrategy::MidpointAwayFromZero).normalize();
        Self { discount_amount: round(self.discount_amount), tax_amount: round(self.tax_amount) }
    }
}

impl AddAssign for Allocation {
    fn add_assign(&mut self, other: Self) {
        self.discount_amount += other.discount_amount;
        self.tax_amount += other.tax_amount;
    }
}

/// Spreads `amount` over a group of shares. The group total is rounded to
/// `ALLOCATION_SCALE` decimals.
pub fn distribute(amount: Decimal, shares: &[Share]) -> Allocation {
    let mut total = Allocation::default();
    for share in shares {
        total += share.allocate(amount);
    }
    total.rounded()
}

/// Pool members grouped the way discounts are applied to them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DiscountPool {
    pub item_shares: Vec<Share>,
    pub items_total: Decimal,
    /// Delivery and payment, in that order. Absent components are not members.
    pub fee_shares: Vec<Share>,
    pub fees_total: Decimal,
}

impl DiscountPool {
    pub fn new(items: &[PricingSheet], delivery: Option<&PricingSheet>, payment: Option<&PricingSheet>) -> Self {
        let items_total: Decimal = items.iter().map(PricingSheet::gross).sum();
        let fees: Vec<&PricingSheet> = delivery.into_iter().chain(payment).collect();
        let fees_total: Decimal = fees.iter().map(|sheet| sheet.gross()).sum();

        Self {
            item_shares: items.iter().map(|sheet| Share::of(Some(sheet), items_total)).collect(),
            items_total,
            fee_shares: fees.iter().map(|sheet| Share::of(Some(sheet), fees_total)).collect(),
            fees_total,
        }
    }

    pub fn from_context(context: &OrderPricingContext) -> Self {
        let delivery = context.delivery_sheet();
        let payment = context.payment_sheet();
        Self::new(&context.position_sheets(), delivery.as_ref(), payment.as_ref())
    }

    pub fn total(&self) -> Decimal {
        self.items_total + self.fees_total
    }
}

/// Books every discount against the pool, appending to `sheet`.
///
/// Discounts are handled in the order given. A discount never takes more
/// than its own ceiling, more than the group it is applied to or more than
/// what earlier discounts left in the pool.
pub fn allocate(pool: &DiscountPool, discounts: &[ApplicableDiscount], adapter_key: &str, sheet: &mut PricingSheet) {
    let pool_total = pool.total();
    let mut amount_left = pool_total.max(Decimal::ZERO);

    for discount in discounts {
        let configuration = &discount.configuration;
        let remaining = configuration.ceiling(pool_total) - configuration.already_deducted;
        let mut deducted = Decimal::ZERO;
        let mut booked = Allocation::default();

        for (shares, group_total) in [(&pool.item_shares, pool.items_total), (&pool.fee_shares, pool.fees_total)] {
            let target = configuration
                .deduction(group_total)
                .min(remaining - deducted)
                .min(group_total)
                .min(amount_left)
                .max(Decimal::ZERO);
            if target.is_zero() {
                continue;
            }
            let allocation = distribute(target, shares);
            amount_left = (amount_left - allocation.discount_amount).max(Decimal::ZERO);
            deducted += allocation.discount_amount;
            booked += allocation;
        }

        if round_units(booked.discount_amount) <= Decimal::ZERO {
            debug!(discount_id = %discount.discount_id, "discount deducts nothing, no rows added");
            continue;
        }
        debug!(
            discount_id = %discount.discount_id,
            amount = %booked.discount_amount,
            tax = %booked.tax_amount,
            "order discount allocated"
        );
        sheet.add_discount(
            NewRow::new(-(booked.discount_amount - booked.tax_amount))
                .discount(discount.discount_id.as_str())
                .adapter(adapter_key),
        );
        if !booked.tax_amount.is_zero() {
            sheet.add_tax(
                NewRow::new(-booked.tax_amount)
                    .discount(discount.discount_id.as_str())
                    .adapter(adapter_key),
            );
        }
    }
}

/// Order pricing adapter applying the order's discounts to the whole pool.
pub struct OrderDiscount;

impl Adapter for OrderDiscount {
    fn key(&self) -> &str { ORDER_DISCOUNT_KEY }
    fn label(&self) -> &str { "Order Discount" }
    fn version(&self) -> &str { "1.0.0" }
    fn order_index(&self) -> i32 { 90 }
}

#[async_trait]
impl PricingAdapter<OrderPricingContext> for OrderDiscount {
    async fn calculate(&self, run: &PricingRun<'_, OrderPricingContext>) -> Result<Vec<CalculationRow>> {
        let mut result = run.result_sheet();
        if run.discounts.is_empty() {
            return Ok(result.into_rows());
        }
        let pool = DiscountPool::from_context(run.context);
        allocate(&pool, &run.discounts, self.key(), &mut result);
        Ok(result.into_rows())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::context::{PositionCalculation, RequestContext};
    use crate::pricing::discount::{Discount, DiscountConfiguration, DiscountValue};
    use crate::pricing::row::RowCategory;
    use crate::pricing::sheet::RowFilter;

    fn d(amount: i64) -> Decimal {
        Decimal::from(amount)
    }

    fn item_sheet(net: i64, tax: i64) -> PricingSheet {
        let mut sheet = PricingSheet::new("CHF");
        sheet.add_item(NewRow::new(d(net)));
        if tax != 0 {
            sheet.add_tax(NewRow::new(d(tax)));
        }
        sheet
    }

    fn fee_sheet(category: RowCategory, amount: i64) -> PricingSheet {
        let mut sheet = PricingSheet::new("CHF");
        sheet.add(category, NewRow::new(d(amount)));
        sheet
    }

    fn fixed(id: &str, amount: i64) -> ApplicableDiscount {
        ApplicableDiscount {
            discount_id: id.to_string(),
            configuration: DiscountConfiguration { value: DiscountValue::FixedRate(d(amount)), already_deducted: Decimal::ZERO },
        }
    }

    fn rate(id: &str, rate: Decimal) -> ApplicableDiscount {
        ApplicableDiscount {
            discount_id: id.to_string(),
            configuration: DiscountConfiguration { value: DiscountValue::Rate(rate), already_deducted: Decimal::ZERO },
        }
    }

    #[test]
    fn test_share_rules() {
        let taxed = item_sheet(1000, 81);
        assert_eq!(Share::of(Some(&taxed), Decimal::ZERO), Share { ratio: d(1), tax_divisor: d(1) });
        assert_eq!(Share::of(None, d(500)), Share { ratio: d(1), tax_divisor: d(1) });

        let pure_tax = item_sheet(0, 81);
        assert_eq!(Share::of(Some(&pure_tax), d(500)), Share { ratio: d(0), tax_divisor: d(0) });

        let share = Share::of(Some(&taxed), d(2162));
        assert_eq!(share.ratio, Decimal::new(5, 1));
        assert_eq!(share.tax_divisor, Decimal::new(1081, 3));
        assert_eq!(share.allocate(d(0)), Allocation::default());
        assert_eq!(Share { ratio: d(0), tax_divisor: d(0) }.allocate(d(100)), Allocation::default());
    }

    #[test]
    fn test_fixed_discount_is_split_proportionally_over_items() {
        let items = [item_sheet(12000, 0), item_sheet(8000, 0)];
        let delivery = fee_sheet(RowCategory::Delivery, 1000);
        let payment = fee_sheet(RowCategory::Payment, 500);
        let pool = DiscountPool::new(&items, Some(&delivery), Some(&payment));

        assert_eq!(pool.item_shares[0].allocate(d(2000)).discount_amount, d(1200));
        assert_eq!(pool.item_shares[1].allocate(d(2000)).discount_amount, d(800));

        let mut sheet = PricingSheet::new("CHF");
        allocate(&pool, &[fixed("SPRING", 2000)], ORDER_DISCOUNT_KEY, &mut sheet);

        assert_eq!(sheet.rows().len(), 1);
        let row = &sheet.rows()[0];
        assert_eq!(row.category, RowCategory::Discount);
        assert_eq!(row.amount, d(-2000));
        assert_eq!(row.discount_id.as_deref(), Some("SPRING"));
        assert_eq!(row.adapter(), Some(ORDER_DISCOUNT_KEY));
    }

    #[test]
    fn test_fixed_discount_overflows_into_delivery_and_payment() {
        let items = [item_sheet(1000, 0)];
        let delivery = fee_sheet(RowCategory::Delivery, 900);
        let payment = fee_sheet(RowCategory::Payment, 100);
        let pool = DiscountPool::new(&items, Some(&delivery), Some(&payment));

        let mut sheet = PricingSheet::new("CHF");
        allocate(&pool, &[fixed("BIG", 1500)], ORDER_DISCOUNT_KEY, &mut sheet);

        assert_eq!(sheet.discount_sum(Some("BIG")), d(-1500));
    }

    #[test]
    fn test_discount_never_exceeds_pool() {
        let items = [item_sheet(300, 0), item_sheet(200, 0)];
        let pool = DiscountPool::new(&items, None, None);

        let mut sheet = PricingSheet::new("CHF");
        allocate(&pool, &[fixed("HUGE", 100_000)], ORDER_DISCOUNT_KEY, &mut sheet);

        assert_eq!(sheet.discount_sum(Some("HUGE")), d(-500));
        assert!(sheet.discount_sum(Some("HUGE")).abs() <= pool.total());
    }

    #[test]
    fn test_subunit_discount_adds_no_rows() {
        let items = [item_sheet(300, 0)];
        let pool = DiscountPool::new(&items, None, None);
        let tiny = ApplicableDiscount {
            discount_id: "TINY".to_string(),
            configuration: DiscountConfiguration { value: DiscountValue::FixedRate(Decimal::new(4, 1)), already_deducted: Decimal::ZERO },
        };

        let mut sheet = PricingSheet::new("CHF");
        allocate(&pool, &[tiny], ORDER_DISCOUNT_KEY, &mut sheet);

        assert!(sheet.rows().is_empty());
    }

    #[test]
    fn test_repeating_ratios_book_clean_rows() {
        let items = [item_sheet(1000, 0), item_sheet(1000, 0), item_sheet(1000, 0)];
        let pool = DiscountPool::new(&items, None, None);

        let mut sheet = PricingSheet::new("CHF");
        allocate(&pool, &[fixed("THIRDS", 100)], ORDER_DISCOUNT_KEY, &mut sheet);

        assert_eq!(sheet.rows().len(), 1);
        assert_eq!(sheet.rows()[0].amount.to_string(), "-100");
    }

    #[test]
    fn test_zero_pool_adds_no_rows() {
        let items = [item_sheet(0, 0)];
        let pool = DiscountPool::new(&items, None, None);

        let mut sheet = PricingSheet::new("CHF");
        allocate(&pool, &[fixed("A", 100), rate("B", Decimal::new(1, 1))], ORDER_DISCOUNT_KEY, &mut sheet);

        assert!(!sheet.is_valid());
    }

    #[test]
    fn test_tax_share_is_booked_separately() {
        let items = [item_sheet(1000, 81)];
        let pool = DiscountPool::new(&items, None, None);

        let mut sheet = PricingSheet::new("CHF");
        allocate(&pool, &[rate("HALF", Decimal::new(5, 1))], ORDER_DISCOUNT_KEY, &mut sheet);

        let discount = sheet.get_rows(RowCategory::Discount);
        let tax = sheet.get_rows(RowCategory::Tax);
        assert_eq!(discount[0].amount, d(-500));
        assert_eq!(tax[0].amount, Decimal::new(-405, 1));
        assert_eq!(tax[0].discount_id.as_deref(), Some("HALF"));
        assert_eq!(sheet.sum(RowFilter::discount("HALF")), Decimal::new(-5405, 1));
    }

    #[test]
    fn test_rate_discount_spans_all_groups() {
        let items = [item_sheet(2000, 0)];
        let delivery = fee_sheet(RowCategory::Delivery, 1000);
        let pool = DiscountPool::new(&items, Some(&delivery), None);

        let mut sheet = PricingSheet::new("CHF");
        allocate(&pool, &[rate("TEN", Decimal::new(1, 1))], ORDER_DISCOUNT_KEY, &mut sheet);

        assert_eq!(sheet.discount_sum(Some("TEN")), d(-300));
    }

    #[test]
    fn test_later_discounts_only_get_what_is_left() {
        let items = [item_sheet(1000, 0)];
        let pool = DiscountPool::new(&items, None, None);

        let mut sheet = PricingSheet::new("CHF");
        allocate(&pool, &[fixed("FIRST", 800), fixed("SECOND", 800)], ORDER_DISCOUNT_KEY, &mut sheet);

        assert_eq!(sheet.discount_sum(Some("FIRST")), d(-800));
        assert_eq!(sheet.discount_sum(Some("SECOND")), d(-200));
    }

    #[test]
    fn test_already_deducted_lowers_the_ceiling() {
        let items = [item_sheet(1000, 0)];
        let pool = DiscountPool::new(&items, None, None);
        let mut discount = fixed("PART", 500);
        discount.configuration.already_deducted = d(350);

        let mut sheet = PricingSheet::new("CHF");
        allocate(&pool, &[discount], ORDER_DISCOUNT_KEY, &mut sheet);

        assert_eq!(sheet.discount_sum(Some("PART")), d(-150));
    }

    #[tokio::test]
    async fn test_adapter_keeps_order_sheet_reconciled() {
        let mut order_sheet = PricingSheet::new("CHF");
        order_sheet.add_item(NewRow::new(d(3000)));
        order_sheet.add_tax(NewRow::new(d(162)));

        let context = OrderPricingContext {
            order_id: "order-1".into(),
            positions: vec![
                PositionCalculation { position_id: "p1".into(), quantity: 2, calculation: item_sheet(2000, 162).into_rows() },
                PositionCalculation { position_id: "p2".into(), quantity: 1, calculation: item_sheet(1000, 0).into_rows() },
            ],
            delivery: None,
            payment: None,
            currency: "CHF".into(),
            country: "CH".into(),
            user_id: None,
            discounts: vec![Discount::order_discount(DiscountValue::FixedRate(d(1000))).with_id("WELCOME")],
        };
        let request = RequestContext::new();
        let discounts = context
            .discounts
            .iter()
            .filter_map(|discount| {
                discount
                    .configuration_for_adapter_key(ORDER_DISCOUNT_KEY, &order_sheet)
                    .map(|configuration| ApplicableDiscount { discount_id: discount.discount_id.clone(), configuration })
            })
            .collect();
        let run = PricingRun { context: &context, request: &request, calculation: &order_sheet, discounts };

        let rows = OrderDiscount.calculate(&run).await.unwrap();
        order_sheet.extend(rows);

        assert_eq!(order_sheet.total(false).amount(), d(2162));
        assert_eq!(order_sheet.gross(), order_sheet.net() + order_sheet.tax_sum());
        assert_eq!(order_sheet.discount_prices(Some("WELCOME"))[0].amount, d(1000));
    }
}
