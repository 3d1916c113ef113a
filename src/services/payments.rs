use chrono::{Datelike, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::schemas::{Payment, PaymentStatus};

/// Inclusive due-date window; either bound may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start.is_none_or(|start| day >= start) && self.end.is_none_or(|end| day <= end)
    }
}

/// Criteria of the payment list. `None` means "all".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PaymentFilter {
    pub status: Option<PaymentStatus>,
    pub tenant_id: Option<String>,
    pub property_id: Option<String>,
    pub date_range: DateRange,
    pub show_archived: bool,
}

impl PaymentFilter {
    /// Build from the raw select values, where `"all"` or empty disables a
    /// criterion.
    pub fn from_params(
        status: &str,
        tenant_id: &str,
        property_id: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        show_archived: bool,
    ) -> Self {
        Self {
            status: PaymentStatus::parse(status),
            tenant_id: selection(tenant_id),
            property_id: selection(property_id),
            date_range: DateRange { start, end },
            show_archived,
        }
    }

    pub fn matches(&self, payment: &Payment) -> bool {
        if payment.is_archived != self.show_archived {
            return false;
        }
        if self.status.is_some_and(|status| status != payment.status) {
            return false;
        }
        if self
            .tenant_id
            .as_deref()
            .is_some_and(|tenant_id| tenant_id != payment.tenant_id())
        {
            return false;
        }
        if self
            .property_id
            .as_deref()
            .is_some_and(|property_id| property_id != payment.property_id())
        {
            return false;
        }
        self.date_range.contains(payment.due_date)
    }
}

fn selection(raw: &str) -> Option<String> {
    let value = raw.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("all") {
        None
    } else {
        Some(value.to_string())
    }
}

/// Payments matching `filter`, in input order.
pub fn filter_payments(payments: &[Payment], filter: &PaymentFilter) -> Vec<Payment> {
    payments
        .iter()
        .filter(|payment| filter.matches(payment))
        .cloned()
        .collect()
}

/// Dashboard headline figures.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PaymentStatistics {
    pub total_revenue: f64,
    /// Percentage of this month's due amount already paid, 0 when nothing is due.
    pub payment_rate: f64,
    pub late_payments: f64,
    pub pending_payments: f64,
    pub total_month: f64,
    pub paid_month: f64,
}

pub fn compute_statistics(payments: &[Payment], today: NaiveDate) -> PaymentStatistics {
    let mut stats = PaymentStatistics::default();
    for payment in payments {
        match payment.status {
            PaymentStatus::Paid => stats.total_revenue += payment.amount,
            PaymentStatus::Late => stats.late_payments += payment.amount,
            PaymentStatus::Pending => stats.pending_payments += payment.amount,
        }
        if same_month(payment.due_date, today) {
            stats.total_month += payment.amount;
            if payment.status == PaymentStatus::Paid {
                stats.paid_month += payment.amount;
            }
        }
    }
    stats.payment_rate = percentage(stats.paid_month, stats.total_month);
    stats
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatusTotals {
    pub count: usize,
    pub amount: f64,
}

impl StatusTotals {
    fn push(&mut self, amount: f64) {
        self.count += 1;
        self.amount += amount;
    }
}

/// Inline statistics of the accounting page over the list currently shown.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AccountingSummary {
    pub paid: StatusTotals,
    pub pending: StatusTotals,
    pub late: StatusTotals,
    pub total: StatusTotals,
    /// Sum actually received, `paid_amount` when recorded.
    pub collected: f64,
    pub outstanding: f64,
    /// Paid payments over all payments, by count.
    pub collection_rate: f64,
}

pub fn accounting_summary(payments: &[Payment]) -> AccountingSummary {
    let mut summary = AccountingSummary::default();
    for payment in payments {
        summary.total.push(payment.amount);
        match payment.status {
            PaymentStatus::Paid => {
                summary.paid.push(payment.amount);
                summary.collected += payment.paid_amount.unwrap_or(payment.amount);
            }
            PaymentStatus::Pending => summary.pending.push(payment.amount),
            PaymentStatus::Late => summary.late.push(payment.amount),
        }
    }
    summary.outstanding = summary.pending.amount + summary.late.amount;
    summary.collection_rate = percentage(summary.paid.count as f64, summary.total.count as f64);
    summary
}

/// What a tenant sees on their own dashboard.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TenantOverview {
    /// Pending payments, earliest due first.
    pub upcoming: Vec<Payment>,
    pub late: Vec<Payment>,
    /// Paid payments, most recent due date first.
    pub history: Vec<Payment>,
    pub amount_due: f64,
}

impl TenantOverview {
    pub fn next_due(&self) -> Option<&Payment> {
        self.upcoming.first()
    }
}

pub fn payments_for_tenant(payments: &[Payment], tenant_id: &str) -> Vec<Payment> {
    let filter = PaymentFilter {
        tenant_id: Some(tenant_id.to_string()),
        ..PaymentFilter::default()
    };
    filter_payments(payments, &filter)
}

pub fn tenant_overview(payments: &[Payment], tenant_id: &str) -> TenantOverview {
    let mut overview = TenantOverview::default();
    for payment in payments_for_tenant(payments, tenant_id) {
        match payment.status {
            PaymentStatus::Pending => {
                overview.amount_due += payment.amount;
                overview.upcoming.push(payment);
            }
            PaymentStatus::Late => {
                overview.amount_due += payment.amount;
                overview.late.push(payment);
            }
            PaymentStatus::Paid => overview.history.push(payment),
        }
    }
    overview.upcoming.sort_by_key(|payment| payment.due_date);
    overview.late.sort_by_key(|payment| payment.due_date);
    overview
        .history
        .sort_by(|left, right| right.due_date.cmp(&left.due_date));
    overview
}

/// Today's date in the configured timezone, which decides "current month".
pub fn today_in(timezone: Tz) -> NaiveDate {
    Utc::now().with_timezone(&timezone).date_naive()
}

fn same_month(day: NaiveDate, today: NaiveDate) -> bool {
    day.year() == today.year() && day.month() == today.month()
}

fn percentage(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    use super::{
        accounting_summary, compute_statistics, filter_payments, tenant_overview, DateRange,
        PaymentFilter,
    };
    use crate::schemas::{
        PartySummary, Payment, PaymentScheduleRef, PaymentStatus, PropertySummary,
    };

    pub(crate) fn day(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    pub(crate) fn payment(
        id: &str,
        amount: f64,
        status: PaymentStatus,
        due_date: NaiveDate,
        tenant_id: &str,
        property_id: &str,
    ) -> Payment {
        Payment {
            id: id.to_string(),
            amount,
            due_date,
            status,
            paid_amount: None,
            paid_at: None,
            payment_method: None,
            transaction_id: None,
            notes: None,
            is_archived: false,
            payment_schedule: PaymentScheduleRef {
                id: format!("sch-{tenant_id}"),
                tenant: PartySummary {
                    id: tenant_id.to_string(),
                    ..PartySummary::default()
                },
                property: PropertySummary {
                    id: property_id.to_string(),
                    ..PropertySummary::default()
                },
            },
        }
    }

    fn ledger() -> Vec<Payment> {
        let mut archived = payment("p5", 900.0, PaymentStatus::Paid, day(2026, 1, 5), "t1", "a");
        archived.is_archived = true;
        vec![
            payment("p1", 1200.0, PaymentStatus::Paid, day(2026, 10, 5), "t1", "a"),
            payment("p2", 500.0, PaymentStatus::Late, day(2026, 10, 1), "t2", "b"),
            payment("p3", 700.0, PaymentStatus::Pending, day(2026, 11, 5), "t2", "b"),
            payment("p4", 1200.0, PaymentStatus::Pending, day(2026, 9, 5), "t1", "a"),
            archived,
        ]
    }

    fn ids(payments: &[crate::schemas::Payment]) -> Vec<&str> {
        payments.iter().map(|payment| payment.id.as_str()).collect()
    }

    #[test]
    fn default_filter_hides_archived_only() {
        let filtered = filter_payments(&ledger(), &PaymentFilter::default());
        assert_eq!(ids(&filtered), vec!["p1", "p2", "p3", "p4"]);

        let archived = PaymentFilter {
            show_archived: true,
            ..PaymentFilter::default()
        };
        assert_eq!(ids(&filter_payments(&ledger(), &archived)), vec!["p5"]);
    }

    #[test]
    fn combines_every_criterion() {
        let filter = PaymentFilter::from_params(
            "pending",
            "t2",
            "all",
            Some(day(2026, 11, 5)),
            Some(day(2026, 11, 5)),
            false,
        );
        assert_eq!(ids(&filter_payments(&ledger(), &filter)), vec!["p3"]);

        let by_property = PaymentFilter::from_params("all", "", "a", None, None, false);
        assert_eq!(ids(&filter_payments(&ledger(), &by_property)), vec!["p1", "p4"]);
    }

    #[test]
    fn date_bounds_are_inclusive_and_optional() {
        let range = DateRange {
            start: Some(day(2026, 10, 1)),
            end: None,
        };
        assert!(range.contains(day(2026, 10, 1)));
        assert!(!range.contains(day(2026, 9, 30)));
        assert!(DateRange::default().contains(day(1999, 1, 1)));
    }

    #[test]
    fn filtering_is_idempotent_and_leaves_input_untouched() {
        let payments = ledger();
        let filter = PaymentFilter::from_params("all", "t1", "all", None, None, false);
        let once = filter_payments(&payments, &filter);
        let twice = filter_payments(&once, &filter);
        assert_eq!(once, twice);
        assert_eq!(payments, ledger());
    }

    #[test]
    fn empty_statistics_are_zero() {
        let stats = compute_statistics(&[], day(2026, 10, 19));
        assert_eq!(stats.total_revenue, 0.0);
        assert_eq!(stats.late_payments, 0.0);
        assert_eq!(stats.pending_payments, 0.0);
        assert_eq!(stats.payment_rate, 0.0);
        assert!(!stats.payment_rate.is_nan());
    }

    #[test]
    fn payment_rate_uses_current_month_amounts() {
        let payments = vec![
            payment("p1", 1200.0, PaymentStatus::Paid, day(2026, 10, 5), "t1", "a"),
            payment("p2", 500.0, PaymentStatus::Late, day(2026, 10, 1), "t2", "b"),
        ];
        let stats = compute_statistics(&payments, day(2026, 10, 19));
        assert_eq!(stats.total_revenue, 1200.0);
        assert_eq!(stats.late_payments, 500.0);
        assert!((stats.payment_rate - 1200.0 / 1700.0 * 100.0).abs() < 1e-9);
        assert_eq!(format!("{:.1}", stats.payment_rate), "70.6");
    }

    #[test]
    fn other_months_do_not_count_towards_the_rate() {
        let stats = compute_statistics(&ledger(), day(2026, 12, 1));
        assert_eq!(stats.total_month, 0.0);
        assert_eq!(stats.payment_rate, 0.0);
        assert_eq!(stats.total_revenue, 2100.0);
        assert_eq!(stats.pending_payments, 1900.0);
    }

    #[test]
    fn accounting_rate_counts_payments() {
        let mut payments = ledger();
        payments[0].paid_amount = Some(1150.0);
        let summary = accounting_summary(&filter_payments(&payments, &PaymentFilter::default()));
        assert_eq!(summary.total.count, 4);
        assert_eq!(summary.paid.count, 1);
        assert_eq!(summary.collection_rate, 25.0);
        assert_eq!(summary.collected, 1150.0);
        assert_eq!(summary.outstanding, 2400.0);
        assert_eq!(accounting_summary(&[]).collection_rate, 0.0);
    }

    #[test]
    fn tenant_overview_partitions_and_sorts() {
        let overview = tenant_overview(&ledger(), "t1");
        assert_eq!(ids(&overview.upcoming), vec!["p4"]);
        assert!(overview.late.is_empty());
        assert_eq!(ids(&overview.history), vec!["p1"]);
        assert_eq!(overview.amount_due, 1200.0);
        assert_eq!(overview.next_due().map(|p| p.id.as_str()), Some("p4"));
    }
}
