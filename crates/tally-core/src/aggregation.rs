//! # Aggregation Engine
//!
//! Pure reductions over a slice of sales for the back-office dashboard.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Dashboard Aggregation                               │
//! │                                                                         │
//! │  &[Sale] ──► completed only ──┬──► totals()          count/sum/avg     │
//! │                               ├──► top_by_employee()                    │
//! │                               ├──► top_by_product()   grouped, stable  │
//! │                               ├──► top_by_payment_method()  desc sort   │
//! │                               └──► hourly_histogram() every bucket      │
//! │                                                                         │
//! │  &[Sale] ──► all statuses ────────► status_breakdown()                  │
//! │                                                                         │
//! │  two periods ─────────────────────► PeriodComparison (growth %)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Grouping keeps first-seen order and sorting is stable, so two entries with
//! the same amount always come out in the order their first sale appeared.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, Timelike, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Sale, SaleStatus};

// =============================================================================
// Totals
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalesTotals {
    pub count: u64,
    pub sum: Money,
    /// `sum / count`, zero when there are no sales.
    pub average: Money,
}

fn completed(sales: &[Sale]) -> impl Iterator<Item = &Sale> {
    sales.iter().filter(|s| s.status == SaleStatus::Completed)
}

/// Count, sum and average of completed sales.
pub fn totals(sales: &[Sale]) -> SalesTotals {
    let (count, sum) = completed(sales).fold((0u64, Money::zero()), |(count, sum), sale| {
        (count + 1, sum + sale.total())
    });

    SalesTotals {
        count,
        sum,
        average: sum.average_over(count),
    }
}

/// `(current − previous) / previous × 100`.
///
/// Defined as 0 when `previous` is zero, so going from $0 to $500 reports no
/// growth. Never NaN or infinite.
///
/// ```rust
/// use tally_core::aggregation::growth_percentage;
/// use tally_core::money::Money;
///
/// assert_eq!(growth_percentage(Money::from_cents(15000), Money::from_cents(10000)), 50.0);
/// assert_eq!(growth_percentage(Money::from_cents(50000), Money::zero()), 0.0);
/// ```
pub fn growth_percentage(current: Money, previous: Money) -> f64 {
    if previous.is_zero() {
        return 0.0;
    }
    let current = current.cents() as f64;
    let previous = previous.cents() as f64;
    (current - previous) / previous * 100.0
}

/// Totals of two periods side by side.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PeriodComparison {
    pub current: SalesTotals,
    pub previous: SalesTotals,
    pub growth_percentage: f64,
}

impl PeriodComparison {
    pub fn compute(current: &[Sale], previous: &[Sale]) -> Self {
        let current = totals(current);
        let previous = totals(previous);
        PeriodComparison {
            current,
            previous,
            growth_percentage: growth_percentage(current.sum, previous.sum),
        }
    }
}

/// Sales with `from <= created_at < to`.
pub fn in_range(sales: &[Sale], from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<Sale> {
    sales
        .iter()
        .filter(|s| s.created_at >= from && s.created_at < to)
        .cloned()
        .collect()
}

// =============================================================================
// Rankings
// =============================================================================

/// One row of a top-N table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RankedEntry {
    /// Grouping key (employee id, product id, payment method).
    pub key: String,
    /// Display label (first name seen for the key).
    pub label: String,
    /// Sales for employees and payment methods, units for products.
    pub count: u64,
    pub amount: Money,
}

/// Insertion-ordered grouping.
#[derive(Default)]
struct Grouper {
    entries: Vec<RankedEntry>,
    index: HashMap<String, usize>,
}

impl Grouper {
    fn add(&mut self, key: &str, label: &str, count: u64, amount: Money) {
        match self.index.get(key) {
            Some(&idx) => {
                let entry = &mut self.entries[idx];
                entry.count += count;
                entry.amount += amount;
            }
            None => {
                self.index.insert(key.to_string(), self.entries.len());
                self.entries.push(RankedEntry {
                    key: key.to_string(),
                    label: label.to_string(),
                    count,
                    amount,
                });
            }
        }
    }

    fn top(self, n: usize) -> Vec<RankedEntry> {
        let mut entries = self.entries;
        // sort_by is stable: ties keep first-seen order
        entries.sort_by(|a, b| b.amount.cmp(&a.amount));
        entries.truncate(n);
        entries
    }
}

pub fn top_by_employee(sales: &[Sale], n: usize) -> Vec<RankedEntry> {
    let mut grouper = Grouper::default();
    for sale in completed(sales) {
        grouper.add(&sale.employee_id, &sale.employee_name, 1, sale.total());
    }
    grouper.top(n)
}

/// Ranks products by line revenue. `count` is units sold.
pub fn top_by_product(sales: &[Sale], n: usize) -> Vec<RankedEntry> {
    let mut grouper = Grouper::default();
    for item in completed(sales).flat_map(|s| s.items.iter()) {
        grouper.add(
            &item.product_id,
            &item.product_name_snapshot,
            item.quantity.max(0) as u64,
            item.line_total(),
        );
    }
    grouper.top(n)
}

pub fn top_by_payment_method(sales: &[Sale], n: usize) -> Vec<RankedEntry> {
    let mut grouper = Grouper::default();
    for sale in completed(sales) {
        let method = sale.payment_method.as_str();
        grouper.add(method, method, 1, sale.total());
    }
    grouper.top(n)
}

// =============================================================================
// Hour Histogram
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct HourBucket {
    /// Local hour of day, 0-23.
    pub hour: u32,
    /// "22:00"
    pub label: String,
    pub count: u64,
    pub amount: Money,
}

/// Buckets completed sales by local hour of `created_at`.
///
/// Every hour in `hours` is present in the output, in the given order, even
/// when no sale falls into it. Sales outside the configured hours are not
/// counted. Duplicate or out-of-range hours are skipped.
pub fn hourly_histogram(sales: &[Sale], hours: &[u32], offset: FixedOffset) -> Vec<HourBucket> {
    let mut buckets: Vec<HourBucket> = Vec::with_capacity(hours.len());
    for &hour in hours {
        if hour < 24 && !buckets.iter().any(|b| b.hour == hour) {
            buckets.push(HourBucket {
                hour,
                label: format!("{:02}:00", hour),
                count: 0,
                amount: Money::zero(),
            });
        }
    }

    for sale in completed(sales) {
        let hour = sale.created_at.with_timezone(&offset).hour();
        if let Some(bucket) = buckets.iter_mut().find(|b| b.hour == hour) {
            bucket.count += 1;
            bucket.amount += sale.total();
        }
    }

    buckets
}

// =============================================================================
// Status Breakdown
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StatusSummary {
    pub status: SaleStatus,
    pub count: u64,
    pub amount: Money,
}

/// Count and amount per status, every status present. Cancelled and
/// refunded are reported separately.
pub fn status_breakdown(sales: &[Sale]) -> Vec<StatusSummary> {
    SaleStatus::ALL
        .iter()
        .map(|&status| {
            let (count, amount) = sales
                .iter()
                .filter(|s| s.status == status)
                .fold((0u64, Money::zero()), |(c, a), s| (c + 1, a + s.total()));
            StatusSummary {
                status,
                count,
                amount,
            }
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PaymentMethod, SaleItem};
    use chrono::TimeZone;

    fn sale(id: &str, employee: &str, total: i64, status: SaleStatus) -> Sale {
        let created_at = Utc.with_ymd_and_hms(2026, 3, 7, 22, 15, 0).unwrap();
        Sale {
            id: id.to_string(),
            venue_id: crate::DEFAULT_VENUE_ID.to_string(),
            sale_number: 1,
            items: vec![SaleItem {
                id: format!("{}-i", id),
                sale_id: id.to_string(),
                product_id: "p1".to_string(),
                product_name_snapshot: "Lager".to_string(),
                unit_price_cents: total,
                quantity: 1,
                line_total_cents: total,
                created_at,
            }],
            subtotal_cents: total,
            discount_cents: 0,
            tax_cents: 0,
            total_cents: total,
            payment_method: PaymentMethod::Cash,
            status,
            employee_id: employee.to_string(),
            employee_name: employee.to_uppercase(),
            notes: None,
            refund_reason: None,
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn test_totals_only_count_completed() {
        let sales = vec![
            sale("a", "e1", 1000, SaleStatus::Completed),
            sale("b", "e1", 2000, SaleStatus::Completed),
            sale("c", "e1", 9999, SaleStatus::Cancelled),
            sale("d", "e1", 5000, SaleStatus::Pending),
        ];
        let totals = totals(&sales);
        assert_eq!(totals.count, 2);
        assert_eq!(totals.sum, Money::from_cents(3000));
        assert_eq!(totals.average, Money::from_cents(1500));
    }

    #[test]
    fn test_totals_empty() {
        assert_eq!(totals(&[]), SalesTotals::default());
    }

    #[test]
    fn test_growth_with_zero_previous_is_zero() {
        let growth = growth_percentage(Money::from_cents(50_000), Money::zero());
        assert_eq!(growth, 0.0);
        assert!(growth.is_finite());
        assert_eq!(growth_percentage(Money::zero(), Money::zero()), 0.0);
    }

    #[test]
    fn test_growth_between_consecutive_periods() {
        let previous = vec![sale("a", "e1", 10_000, SaleStatus::Completed)];
        let current = vec![sale("b", "e1", 15_000, SaleStatus::Completed)];
        let comparison = PeriodComparison::compute(&current, &previous);
        assert_eq!(comparison.growth_percentage, 50.0);
        assert_eq!(comparison.previous.sum, Money::from_cents(10_000));
    }

    #[test]
    fn test_growth_can_be_negative() {
        assert_eq!(
            growth_percentage(Money::from_cents(5_000), Money::from_cents(10_000)),
            -50.0
        );
    }

    #[test]
    fn test_top_by_employee_ties_keep_first_seen_order() {
        let sales = vec![
            sale("a", "bob", 1000, SaleStatus::Completed),
            sale("b", "ana", 1000, SaleStatus::Completed),
            sale("c", "cid", 3000, SaleStatus::Completed),
            sale("d", "dan", 500, SaleStatus::Completed),
        ];
        let top = top_by_employee(&sales, 3);
        let keys: Vec<&str> = top.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["cid", "bob", "ana"]);
        assert_eq!(top[0].label, "CID");
    }

    #[test]
    fn test_top_by_product_counts_units() {
        let mut big = sale("a", "e1", 0, SaleStatus::Completed);
        big.items[0].quantity = 3;
        big.items[0].line_total_cents = 1800;
        let sales = vec![big, sale("b", "e1", 600, SaleStatus::Completed)];

        let top = top_by_product(&sales, 5);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].count, 4);
        assert_eq!(top[0].amount, Money::from_cents(2400));
    }

    #[test]
    fn test_top_by_payment_method() {
        let mut card = sale("a", "e1", 4000, SaleStatus::Completed);
        card.payment_method = PaymentMethod::Debit;
        let sales = vec![sale("b", "e1", 1000, SaleStatus::Completed), card];

        let top = top_by_payment_method(&sales, 1);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].key, "debit");
    }

    #[test]
    fn test_histogram_with_no_sales_has_every_bucket() {
        let hours = [20, 21, 22, 23, 0, 1, 2];
        let buckets = hourly_histogram(&[], &hours, FixedOffset::east_opt(0).unwrap());
        assert_eq!(buckets.len(), hours.len());
        assert!(buckets.iter().all(|b| b.count == 0 && b.amount.is_zero()));
        assert_eq!(buckets[4].label, "00:00");
    }

    #[test]
    fn test_histogram_applies_offset() {
        // 22:15 UTC is 19:15 at UTC-3
        let sales = vec![sale("a", "e1", 1000, SaleStatus::Completed)];
        let offset = FixedOffset::west_opt(3 * 3600).unwrap();
        let buckets = hourly_histogram(&sales, &[19, 22], offset);
        assert_eq!(buckets[0].count, 1);
        assert_eq!(buckets[1].count, 0);
    }

    #[test]
    fn test_histogram_skips_duplicate_and_invalid_hours() {
        let buckets = hourly_histogram(&[], &[22, 22, 25], FixedOffset::east_opt(0).unwrap());
        assert_eq!(buckets.len(), 1);
    }

    #[test]
    fn test_status_breakdown_separates_cancel_and_refund() {
        let sales = vec![
            sale("a", "e1", 1000, SaleStatus::Cancelled),
            sale("b", "e1", 2000, SaleStatus::Refunded),
            sale("c", "e1", 3000, SaleStatus::Refunded),
        ];
        let breakdown = status_breakdown(&sales);
        assert_eq!(breakdown.len(), 4);
        let refunded = breakdown
            .iter()
            .find(|s| s.status == SaleStatus::Refunded)
            .unwrap();
        assert_eq!(refunded.count, 2);
        assert_eq!(refunded.amount, Money::from_cents(5000));
    }

    #[test]
    fn test_in_range_is_half_open() {
        let sales = vec![sale("a", "e1", 1000, SaleStatus::Completed)];
        let at = sales[0].created_at;
        assert_eq!(in_range(&sales, at, at + chrono::Duration::hours(1)).len(), 1);
        assert!(in_range(&sales, at - chrono::Duration::hours(1), at).is_empty());
    }
}
