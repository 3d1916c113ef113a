use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use chrono::NaiveDate;
use moka::sync::Cache;

use crate::schemas::Payment;
use crate::services::payments::{
    accounting_summary, compute_statistics, filter_payments, AccountingSummary, PaymentFilter,
    PaymentStatistics,
};

const MAX_CACHED_VIEWS: u64 = 64;

/// Loaded payments plus memoized derived views.
///
/// Every derived value is keyed by the dataset version, so replacing the
/// payments makes old entries unreachable without explicit bookkeeping.
pub struct PaymentBook {
    payments: RwLock<Arc<Vec<Payment>>>,
    version: AtomicU64,
    filtered: Cache<(u64, PaymentFilter), Arc<Vec<Payment>>>,
    statistics: Cache<(u64, NaiveDate), PaymentStatistics>,
    summaries: Cache<(u64, PaymentFilter), AccountingSummary>,
}

impl Default for PaymentBook {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl PaymentBook {
    pub fn new(payments: Vec<Payment>) -> Self {
        Self {
            payments: RwLock::new(Arc::new(payments)),
            version: AtomicU64::new(0),
            filtered: Cache::new(MAX_CACHED_VIEWS),
            statistics: Cache::new(MAX_CACHED_VIEWS),
            summaries: Cache::new(MAX_CACHED_VIEWS),
        }
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    pub fn payments(&self) -> Arc<Vec<Payment>> {
        self.payments
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Swap in a freshly fetched list.
    pub fn replace(&self, payments: Vec<Payment>) {
        {
            let mut guard = self
                .payments
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            *guard = Arc::new(payments);
            self.version.fetch_add(1, Ordering::AcqRel);
        }
        self.filtered.invalidate_all();
        self.statistics.invalidate_all();
        self.summaries.invalidate_all();
    }

    pub fn filtered(&self, filter: &PaymentFilter) -> Arc<Vec<Payment>> {
        let (version, payments) = self.snapshot();
        self.filtered
            .get_with((version, filter.clone()), || {
                Arc::new(filter_payments(&payments, filter))
            })
    }

    pub fn statistics(&self, today: NaiveDate) -> PaymentStatistics {
        let (version, payments) = self.snapshot();
        self.statistics
            .get_with((version, today), || compute_statistics(&payments, today))
    }

    pub fn accounting(&self, filter: &PaymentFilter) -> AccountingSummary {
        let version = self.version();
        let rows = self.filtered(filter);
        self.summaries
            .get_with((version, filter.clone()), || accounting_summary(&rows))
    }

    fn snapshot(&self) -> (u64, Arc<Vec<Payment>>) {
        let guard = self
            .payments
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        (self.version(), guard.clone())
    }
}
