//! Synthetic rate provider.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

use fxhistory_common::{Currency, DateRange, ExchangeRate, ProviderId};
use fxhistory_engine::{HistoryError, HistoryResult, RateProvider};

/// Reference rates against USD, in units per dollar.
const REFERENCE: &[(&str, i64, u32)] = &[
    ("USD", 1, 0),
    ("EUR", 92, 2),
    ("GBP", 79, 2),
    ("JPY", 14850, 2),
    ("CHF", 88, 2),
];

/// Provider publishing a seeded random walk around fixed reference rates.
///
/// The record for a given base and date is a pure function of the seed, so
/// repeated fetches of the same day agree.
pub struct SyntheticProvider {
    id: ProviderId,
    seed: u64,
    latency: Duration,
    fetches: AtomicU64,
    failing: AtomicBool,
}

impl SyntheticProvider {
    pub fn new(seed: u64, latency: Duration) -> Self {
        Self {
            id: ProviderId::new("synthetic"),
            seed,
            latency,
            fetches: AtomicU64::new(0),
            failing: AtomicBool::new(false),
        }
    }

    /// Ranged calls received so far.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    /// The record published for `base` on `date`.
    pub fn rate_for(&self, base: &Currency, date: NaiveDate) -> ExchangeRate {
        let day_seed = self.seed ^ (date.num_days_from_ce() as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        let mut rng = StdRng::seed_from_u64(day_seed);

        let base_per_usd = reference(base).unwrap_or(Decimal::ONE);
        let rates = REFERENCE.iter().filter_map(|(code, mantissa, scale)| {
            let quote = Currency::new(*code);
            if &quote == base {
                return None;
            }
            // +/- 50 basis points around the reference cross rate.
            let drift = Decimal::new(rng.gen_range(-50..=50), 4);
            let cross = Decimal::new(*mantissa, *scale) / base_per_usd;
            Some((quote, (cross * (Decimal::ONE + drift)).round_dp(6)))
        });

        ExchangeRate::new(date, rates)
    }

    fn check_failing(&self) -> HistoryResult<()> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(HistoryError::provider(self.id.as_str(), "injected outage"));
        }
        Ok(())
    }
}

fn reference(currency: &Currency) -> Option<Decimal> {
    REFERENCE
        .iter()
        .find(|(code, _, _)| *code == currency.code())
        .map(|(_, mantissa, scale)| Decimal::new(*mantissa, *scale))
}

#[async_trait]
impl RateProvider for SyntheticProvider {
    fn id(&self) -> &ProviderId {
        &self.id
    }

    async fn get_history(
        &self,
        base: &Currency,
        range: DateRange,
    ) -> HistoryResult<Vec<ExchangeRate>> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        tokio::time::sleep(self.latency).await;
        self.check_failing()?;

        Ok(range.days().map(|day| self.rate_for(base, day)).collect())
    }

    async fn get_latest(&self, base: &Currency) -> HistoryResult<ExchangeRate> {
        tokio::time::sleep(self.latency).await;
        self.check_failing()?;

        let today = chrono::Utc::now().date_naive();
        Ok(self.rate_for(base, today))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        fxhistory_common::parse_date(s).unwrap()
    }

    #[test]
    fn test_deterministic_per_day() {
        let a = SyntheticProvider::new(7, Duration::ZERO);
        let b = SyntheticProvider::new(7, Duration::ZERO);

        assert_eq!(
            a.rate_for(&Currency::usd(), d("2024-01-02")),
            b.rate_for(&Currency::usd(), d("2024-01-02"))
        );
    }

    #[test]
    fn test_base_excluded_from_quotes() {
        let provider = SyntheticProvider::new(1, Duration::ZERO);
        let rate = provider.rate_for(&Currency::eur(), d("2024-01-02"));

        assert!(rate.rate(&Currency::eur()).is_none());
        assert_eq!(rate.rates.len(), REFERENCE.len() - 1);
    }

    #[tokio::test]
    async fn test_counts_ranged_calls() {
        let provider = SyntheticProvider::new(1, Duration::ZERO);
        let range = DateRange::parse("2024-01-01", "2024-01-03").unwrap();

        let rates = provider.get_history(&Currency::usd(), range).await.unwrap();

        assert_eq!(rates.len(), 3);
        assert_eq!(provider.fetch_count(), 1);
    }
}
