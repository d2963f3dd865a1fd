//! # Dashboard Service
//!
//! Fetches a reporting window through the gateway and reduces it with
//! [`tally_core::aggregation`].
//!
//! ```text
//!   previous period          current period
//! ├──────────────────────┼──────────────────────┤
//! prev.from          current.from          current.to
//!
//! one list_sales(prev.from .. current.to) ── split with in_range ──►
//!   PeriodComparison (growth %), top-N tables, hourly histogram,
//!   status breakdown (current period only)
//! ```

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tally_core::aggregation::{
    self, HourBucket, PeriodComparison, RankedEntry, StatusSummary,
};
use tally_core::{SaleFilter, TransactionGateway, ValidationError};
use tracing::{debug, info};
use ts_rs::TS;

use crate::config::DashboardSettings;
use crate::error::{SaleOperation, SessionError, SessionResult};

/// Upper bound on sales fetched for one report.
const REPORT_SALE_LIMIT: i64 = 20_000;

/// Half-open reporting window `[from, to)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReportPeriod {
    #[ts(as = "String")]
    pub from: DateTime<Utc>,
    #[ts(as = "String")]
    pub to: DateTime<Utc>,
}

impl ReportPeriod {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> SessionResult<Self> {
        if from >= to {
            return Err(SessionError::validation(
                SaleOperation::Report,
                ValidationError::InvalidFormat {
                    field: "period".into(),
                    reason: "start must be before end".into(),
                },
            ));
        }
        Ok(ReportPeriod { from, to })
    }

    /// The window of `length` ending at `to`.
    pub fn ending_at(to: DateTime<Utc>, length: Duration) -> SessionResult<Self> {
        Self::new(to - length, to)
    }

    pub fn length(&self) -> Duration {
        self.to - self.from
    }

    /// The window of the same length immediately before this one.
    pub fn previous(&self) -> Self {
        ReportPeriod {
            from: self.from - self.length(),
            to: self.from,
        }
    }
}

/// Everything the dashboard shows for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DashboardReport {
    pub venue_id: String,
    /// Header name; falls back to the venue id.
    pub venue_name: String,
    pub period: ReportPeriod,
    pub comparison: PeriodComparison,
    pub top_employees: Vec<RankedEntry>,
    pub top_products: Vec<RankedEntry>,
    pub top_payment_methods: Vec<RankedEntry>,
    pub hourly: Vec<HourBucket>,
    pub statuses: Vec<StatusSummary>,
}

pub struct DashboardService<G> {
    gateway: Arc<G>,
    venue_id: String,
    venue_name: Option<String>,
    settings: DashboardSettings,
}

impl<G: TransactionGateway> DashboardService<G> {
    pub fn new(gateway: Arc<G>, venue_id: impl Into<String>, settings: DashboardSettings) -> Self {
        DashboardService {
            gateway,
            venue_id: venue_id.into(),
            venue_name: None,
            settings,
        }
    }

    pub fn with_venue_name(mut self, name: impl Into<String>) -> Self {
        self.venue_name = Some(name.into());
        self
    }

    /// Builds the report for `period`, compared against the preceding
    /// period of equal length.
    pub async fn report(&self, period: ReportPeriod) -> SessionResult<DashboardReport> {
        let previous = period.previous();

        debug!(
            venue_id = %self.venue_id,
            from = %period.from,
            to = %period.to,
            "Fetching dashboard window"
        );

        let filter = SaleFilter {
            limit: Some(REPORT_SALE_LIMIT),
            ..SaleFilter::for_venue(&self.venue_id).between(previous.from, period.to)
        };
        let sales = self
            .gateway
            .list_sales(&filter)
            .await
            .map_err(|e| SessionError::gateway(SaleOperation::Report, e))?;

        let current_sales = aggregation::in_range(&sales, period.from, period.to);
        let previous_sales = aggregation::in_range(&sales, previous.from, previous.to);
        let top_n = self.settings.top_n;

        let report = DashboardReport {
            venue_id: self.venue_id.clone(),
            venue_name: self
                .venue_name
                .clone()
                .unwrap_or_else(|| self.venue_id.clone()),
            period,
            comparison: PeriodComparison::compute(&current_sales, &previous_sales),
            top_employees: aggregation::top_by_employee(&current_sales, top_n),
            top_products: aggregation::top_by_product(&current_sales, top_n),
            top_payment_methods: aggregation::top_by_payment_method(&current_sales, top_n),
            hourly: aggregation::hourly_histogram(
                &current_sales,
                &self.settings.hours,
                self.settings.offset(),
            ),
            statuses: aggregation::status_breakdown(&current_sales),
        };

        info!(
            venue_id = %self.venue_id,
            sales = report.comparison.current.count,
            total = %report.comparison.current.sum,
            growth = report.comparison.growth_percentage,
            "Dashboard report built"
        );
        Ok(report)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use tally_core::command::CreateSaleCommand;
    use tally_core::{
        GatewayError, GatewayResult, Money, PaymentMethod, Sale, SaleItem, SaleReceipt,
        SaleStatus, DEFAULT_VENUE_ID,
    };

    /// Serves a fixed list of sales, honouring the time window.
    struct FixedSales(Vec<Sale>);

    #[async_trait]
    impl TransactionGateway for FixedSales {
        async fn create_sale(&self, _: &CreateSaleCommand) -> GatewayResult<SaleReceipt> {
            Err(GatewayError::Unavailable("read only".into()))
        }
        async fn add_item(&self, _: &str, _: &str, _: i64, _: Option<Money>) -> GatewayResult<String> {
            Err(GatewayError::Unavailable("read only".into()))
        }
        async fn update_item(&self, _: &str, _: Option<i64>, _: Option<Money>) -> GatewayResult<()> {
            Err(GatewayError::Unavailable("read only".into()))
        }
        async fn remove_item(&self, _: &str) -> GatewayResult<()> {
            Err(GatewayError::Unavailable("read only".into()))
        }
        async fn transition_status(&self, _: &str, _: SaleStatus, _: Option<&str>) -> GatewayResult<()> {
            Err(GatewayError::Unavailable("read only".into()))
        }
        async fn get_sale(&self, sale_id: &str) -> GatewayResult<Sale> {
            self.0
                .iter()
                .find(|s| s.id == sale_id)
                .cloned()
                .ok_or_else(|| tally_core::CoreError::SaleNotFound(sale_id.into()).into())
        }
        async fn list_sales(&self, filter: &SaleFilter) -> GatewayResult<Vec<Sale>> {
            Ok(self
                .0
                .iter()
                .filter(|s| filter.from.map_or(true, |from| s.created_at >= from))
                .filter(|s| filter.to.map_or(true, |to| s.created_at < to))
                .cloned()
                .collect())
        }
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, 15, 0).unwrap()
    }

    fn sale(id: &str, employee: &str, total: i64, status: SaleStatus, created_at: DateTime<Utc>) -> Sale {
        Sale {
            id: id.into(),
            venue_id: DEFAULT_VENUE_ID.into(),
            sale_number: 1,
            items: vec![SaleItem {
                id: format!("{}-1", id),
                sale_id: id.into(),
                product_id: "p-lager".into(),
                product_name_snapshot: "Lager".into(),
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
            employee_id: employee.into(),
            employee_name: employee.to_uppercase(),
            notes: None,
            refund_reason: None,
            created_at,
            updated_at: created_at,
        }
    }

    fn service(sales: Vec<Sale>) -> DashboardService<FixedSales> {
        DashboardService::new(
            Arc::new(FixedSales(sales)),
            DEFAULT_VENUE_ID,
            DashboardSettings {
                hours: vec![22, 23, 0, 1],
                top_n: 2,
                utc_offset_minutes: 0,
            },
        )
    }

    #[tokio::test]
    async fn test_growth_between_consecutive_days() {
        let svc = service(vec![
            sale("s-1", "e-1", 10_000, SaleStatus::Completed, at(1, 22)),
            sale("s-2", "e-1", 15_000, SaleStatus::Completed, at(2, 22)),
        ]);
        let period = ReportPeriod::new(at(2, 0), at(3, 0)).unwrap();

        let report = svc.report(period).await.unwrap();

        assert_eq!(report.comparison.current.sum, Money::from_cents(15_000));
        assert_eq!(report.comparison.previous.sum, Money::from_cents(10_000));
        assert_eq!(report.comparison.growth_percentage, 50.0);
        assert_eq!(report.venue_name, DEFAULT_VENUE_ID);

        let named = service(vec![]).with_venue_name("Rooftop");
        let report = named.report(period).await.unwrap();
        assert_eq!(report.venue_name, "Rooftop");
        assert_eq!(report.comparison.growth_percentage, 0.0);
    }

    #[tokio::test]
    async fn test_empty_night_has_every_hour_and_zero_growth() {
        let svc = service(vec![sale("s-1", "e-1", 5_000, SaleStatus::Completed, at(2, 23))]);
        let period = ReportPeriod::new(at(2, 0), at(3, 0)).unwrap();

        let report = svc.report(period).await.unwrap();

        assert_eq!(report.comparison.growth_percentage, 0.0);
        let hours: Vec<u32> = report.hourly.iter().map(|b| b.hour).collect();
        assert_eq!(hours, vec![22, 23, 0, 1]);
        assert_eq!(report.hourly[1].count, 1);
        assert!(report.hourly.iter().filter(|b| b.hour != 23).all(|b| b.count == 0));
    }

    #[tokio::test]
    async fn test_tables_only_cover_current_period() {
        let svc = service(vec![
            sale("s-0", "e-9", 99_000, SaleStatus::Completed, at(1, 22)),
            sale("s-1", "e-1", 2_000, SaleStatus::Completed, at(2, 22)),
            sale("s-2", "e-2", 3_000, SaleStatus::Completed, at(2, 23)),
            sale("s-3", "e-3", 1_000, SaleStatus::Completed, at(2, 23)),
            sale("s-4", "e-1", 4_000, SaleStatus::Refunded, at(2, 23)),
        ]);
        let period = ReportPeriod::new(at(2, 0), at(3, 0)).unwrap();

        let report = svc.report(period).await.unwrap();

        let employees: Vec<&str> = report.top_employees.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(employees, vec!["e-2", "e-1"]);
        assert_eq!(report.top_products[0].count, 3);

        let refunded = report
            .statuses
            .iter()
            .find(|s| s.status == SaleStatus::Refunded)
            .unwrap();
        assert_eq!(refunded.count, 1);
        assert_eq!(report.statuses.len(), 4);
    }

    #[test]
    fn test_period_helpers() {
        let period = ReportPeriod::ending_at(at(3, 0), Duration::days(1)).unwrap();
        assert_eq!(period.from, at(2, 0));
        assert_eq!(period.previous(), ReportPeriod::new(at(1, 0), at(2, 0)).unwrap());
        assert!(ReportPeriod::new(at(2, 0), at(2, 0)).is_err());
    }
}
