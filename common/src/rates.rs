//! Daily exchange-rate records.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::currency::{Currency, ProviderId};
use crate::pagination::PaginationInfo;

/// Rates for one calendar day, quoted against a base currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRate {
    /// Publication date.
    pub date: NaiveDate,
    /// Quote currency code to rate.
    pub rates: BTreeMap<Currency, Decimal>,
}

impl ExchangeRate {
    /// Create a new daily record.
    pub fn new(date: NaiveDate, rates: impl IntoIterator<Item = (Currency, Decimal)>) -> Self {
        Self {
            date,
            rates: rates.into_iter().collect(),
        }
    }

    /// Get the rate for a quote currency.
    pub fn rate(&self, quote: &Currency) -> Option<Decimal> {
        self.rates.get(quote).copied()
    }
}

/// Ordered daily rates for a base currency over a date range.
///
/// `rates` is sorted ascending by date with no duplicate dates. When the
/// history was requested with pagination it holds only the requested page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRateHistory {
    /// Provider that produced the rates.
    pub provider: ProviderId,
    /// Base currency of every record.
    pub base_currency: Currency,
    /// First requested day.
    pub start_date: NaiveDate,
    /// Last requested day.
    pub end_date: NaiveDate,
    /// Daily records, ascending by date.
    pub rates: Vec<ExchangeRate>,
    /// Page position of `rates` within the full history.
    pub pagination: PaginationInfo,
}

impl ExchangeRateHistory {
    /// Check the ordering invariant: strictly ascending dates.
    pub fn is_sorted(&self) -> bool {
        self.rates.windows(2).all(|w| w[0].date < w[1].date)
    }

    /// Dates of the contained records.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rates.iter().map(|r| r.date).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_rate_keys_normalized() {
        let rate = ExchangeRate::new(day(1), [(Currency::new("eur"), dec!(0.91))]);
        assert_eq!(rate.rate(&Currency::eur()), Some(dec!(0.91)));
    }

    #[test]
    fn test_serialize_round_trip() {
        let rate = ExchangeRate::new(
            day(2),
            [(Currency::eur(), dec!(0.9123)), (Currency::gbp(), dec!(0.7861))],
        );

        let json = serde_json::to_string(&rate).unwrap();
        assert!(json.contains("\"2024-01-02\""));

        let back: ExchangeRate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rate);
    }

    #[test]
    fn test_history_sorted() {
        let mut history = ExchangeRateHistory {
            provider: ProviderId::new("test"),
            base_currency: Currency::usd(),
            start_date: day(1),
            end_date: day(3),
            rates: vec![
                ExchangeRate::new(day(1), []),
                ExchangeRate::new(day(2), []),
                ExchangeRate::new(day(3), []),
            ],
            pagination: PaginationInfo::single_page(3),
        };
        assert!(history.is_sorted());

        history.rates.swap(0, 1);
        assert!(!history.is_sorted());
    }
}
