//! Rate provider trait and test implementation.

use async_trait::async_trait;
use fxhistory_common::{Currency, DateRange, ExchangeRate, ProviderId};

use crate::error::HistoryResult;

/// Trait for remote exchange-rate providers.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Get the provider identifier. Used as the first cache key segment.
    fn id(&self) -> &ProviderId;

    /// Get one record per published day in `range`, in any order.
    ///
    /// Fails with `ProviderUnavailable` on transport or upstream errors and
    /// with `InvalidRange` when the provider rejects the range.
    async fn get_history(&self, base: &Currency, range: DateRange)
        -> HistoryResult<Vec<ExchangeRate>>;

    /// Get the most recently published record.
    async fn get_latest(&self, base: &Currency) -> HistoryResult<ExchangeRate>;
}

#[cfg(any(test, feature = "test-utils"))]
pub use mock::MockRateProvider;

#[cfg(any(test, feature = "test-utils"))]
mod mock {
    use std::sync::atomic::{AtomicBool, Ordering};

    use chrono::{Datelike, NaiveDate};
    use parking_lot::Mutex;
    use rust_decimal::Decimal;

    use super::*;
    use crate::error::HistoryError;

    /// Mock rate provider for testing.
    ///
    /// Produces a deterministic record for every requested day and records
    /// each ranged call it receives.
    pub struct MockRateProvider {
        id: ProviderId,
        calls: Mutex<Vec<(Currency, DateRange)>>,
        failing: AtomicBool,
        reverse_order: AtomicBool,
        latest_date: Mutex<NaiveDate>,
    }

    impl MockRateProvider {
        /// Create a new mock provider.
        pub fn new(id: impl Into<String>) -> Self {
            Self {
                id: ProviderId::new(id),
                calls: Mutex::new(Vec::new()),
                failing: AtomicBool::new(false),
                reverse_order: AtomicBool::new(false),
                latest_date: Mutex::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default()),
            }
        }

        /// The record this provider publishes for `base` on `date`.
        pub fn rate_for(base: &Currency, date: NaiveDate) -> ExchangeRate {
            let bump = Decimal::new(date.ordinal() as i64, 4);
            let quotes = [Currency::eur(), Currency::gbp(), Currency::jpy(), Currency::usd()];
            ExchangeRate::new(
                date,
                quotes
                    .into_iter()
                    .filter(|q| q != base)
                    .enumerate()
                    .map(|(i, q)| (q, Decimal::new(i as i64 + 1, 0) + bump)),
            )
        }

        /// Make every subsequent call fail.
        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        /// Return history records newest first.
        pub fn set_reverse_order(&self, reverse: bool) {
            self.reverse_order.store(reverse, Ordering::SeqCst);
        }

        /// Set the date reported by `get_latest`.
        pub fn set_latest_date(&self, date: NaiveDate) {
            *self.latest_date.lock() = date;
        }

        /// Ranged calls received so far.
        pub fn calls(&self) -> Vec<DateRange> {
            self.calls.lock().iter().map(|(_, range)| *range).collect()
        }

        /// Number of ranged calls received so far.
        pub fn call_count(&self) -> usize {
            self.calls.lock().len()
        }

        /// Forget recorded calls.
        pub fn reset_calls(&self) {
            self.calls.lock().clear();
        }

        fn check_failing(&self) -> HistoryResult<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(HistoryError::provider(self.id.as_str(), "mock provider failure"));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl RateProvider for MockRateProvider {
        fn id(&self) -> &ProviderId {
            &self.id
        }

        async fn get_history(
            &self,
            base: &Currency,
            range: DateRange,
        ) -> HistoryResult<Vec<ExchangeRate>> {
            self.calls.lock().push((base.clone(), range));
            self.check_failing()?;

            let mut rates: Vec<ExchangeRate> =
                range.days().map(|day| Self::rate_for(base, day)).collect();
            if self.reverse_order.load(Ordering::SeqCst) {
                rates.reverse();
            }
            Ok(rates)
        }

        async fn get_latest(&self, base: &Currency) -> HistoryResult<ExchangeRate> {
            self.check_failing()?;
            let date = *self.latest_date.lock();
            Ok(Self::rate_for(base, date))
        }
    }
}
