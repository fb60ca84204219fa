//! Cache key derivation.
//!
//! Keys have the shape `provider:BASE:selector`. The selector is either an ISO
//! date (`2024-01-05`, the per-day namespace) or a range token with a page
//! group suffix (`2024-01-01..2024-01-31#p10` or `...#all`, the page-store
//! namespace). A date never contains `..` or `#`, so the two namespaces cannot
//! collide.

use std::fmt;

use chrono::NaiveDate;
use fxhistory_common::{format_date, parse_date, Currency, DateRange, ProviderId};

/// Separator between key segments.
pub const KEY_SEPARATOR: char = ':';

const RANGE_TOKEN: &str = "..";
const GROUP_MARKER: char = '#';
const ALL_GROUP: &str = "all";
const SIZE_PREFIX: char = 'p';

/// Page grouping of a stored range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageGroup {
    /// Whole collection stored as a single page.
    All,
    /// Fixed page size.
    Size(u32),
}

impl fmt::Display for PageGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageGroup::All => write!(f, "{}", ALL_GROUP),
            PageGroup::Size(size) => write!(f, "{}{}", SIZE_PREFIX, size),
        }
    }
}

/// Selector segment of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySelector {
    /// Per-day record.
    Day(NaiveDate),
    /// Page group for a range.
    Range { range: DateRange, group: PageGroup },
}

/// A key split back into its segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedKey {
    pub provider: ProviderId,
    pub base_currency: Currency,
    pub selector: KeySelector,
}

/// Derives cache keys for one provider and base currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKeyScheme {
    provider: ProviderId,
    base_currency: Currency,
}

impl CacheKeyScheme {
    /// Create a scheme. The currency is already upper case by construction.
    pub fn new(provider: ProviderId, base_currency: Currency) -> Self {
        Self {
            provider,
            base_currency,
        }
    }

    pub fn provider(&self) -> &ProviderId {
        &self.provider
    }

    pub fn base_currency(&self) -> &Currency {
        &self.base_currency
    }

    /// Prefix shared by every key of this provider and currency.
    pub fn prefix(&self) -> String {
        format!(
            "{}{sep}{}{sep}",
            self.provider,
            self.base_currency,
            sep = KEY_SEPARATOR
        )
    }

    /// Key of the per-day record for `date`.
    pub fn day(&self, date: NaiveDate) -> String {
        format!("{}{}", self.prefix(), format_date(date))
    }

    /// Logical key of a whole range, before page grouping.
    pub fn range(&self, range: DateRange) -> String {
        format!("{}{}", self.prefix(), range)
    }

    /// Key of the page group for `range` split by `group`.
    pub fn range_group(&self, range: DateRange, group: PageGroup) -> String {
        Self::group_key(&self.range(range), group)
    }

    /// Append a page group suffix to a logical key.
    pub fn group_key(logical: &str, group: PageGroup) -> String {
        format!("{}{}{}", logical, GROUP_MARKER, group)
    }

    /// Split a key back into provider, currency and selector.
    pub fn parse(key: &str) -> Option<ParsedKey> {
        let mut segments = key.splitn(3, KEY_SEPARATOR);
        let provider = segments.next().filter(|s| !s.is_empty())?;
        let currency = segments.next().filter(|s| !s.is_empty())?;
        let selector = segments.next()?;

        let selector = match selector.split_once(GROUP_MARKER) {
            Some((range, group)) => {
                let (start, end) = range.split_once(RANGE_TOKEN)?;
                let range = DateRange::parse(start, end).ok()?;
                let group = if group == ALL_GROUP {
                    PageGroup::All
                } else {
                    let size = group.strip_prefix(SIZE_PREFIX)?.parse().ok()?;
                    PageGroup::Size(size)
                };
                KeySelector::Range { range, group }
            }
            None => KeySelector::Day(parse_date(selector).ok()?),
        };

        Some(ParsedKey {
            provider: ProviderId::new(provider),
            base_currency: Currency::new(currency),
            selector,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheme(base: &str) -> CacheKeyScheme {
        CacheKeyScheme::new(ProviderId::new("frankfurter"), Currency::new(base))
    }

    fn d(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn test_day_key() {
        assert_eq!(scheme("USD").day(d("2024-01-05")), "frankfurter:USD:2024-01-05");
    }

    #[test]
    fn test_currency_case_does_not_fragment_keys() {
        assert_eq!(scheme("usd").day(d("2024-01-05")), scheme("USD").day(d("2024-01-05")));
    }

    #[test]
    fn test_range_group_keys() {
        let range = DateRange::parse("2024-01-01", "2024-01-31").unwrap();

        assert_eq!(
            scheme("EUR").range_group(range, PageGroup::Size(10)),
            "frankfurter:EUR:2024-01-01..2024-01-31#p10"
        );
        assert_eq!(
            scheme("EUR").range_group(range, PageGroup::All),
            "frankfurter:EUR:2024-01-01..2024-01-31#all"
        );
    }

    #[test]
    fn test_namespaces_distinct() {
        let s = scheme("USD");
        let day = d("2024-01-01");
        let single = DateRange::single(day);

        let day_key = s.day(day);
        let group_key = s.range_group(single, PageGroup::Size(1));

        assert_ne!(day_key, group_key);
        assert!(matches!(
            CacheKeyScheme::parse(&day_key).unwrap().selector,
            KeySelector::Day(_)
        ));
        assert!(matches!(
            CacheKeyScheme::parse(&group_key).unwrap().selector,
            KeySelector::Range { .. }
        ));
    }

    #[test]
    fn test_parse_round_trip() {
        let s = scheme("GBP");
        let range = DateRange::parse("2024-03-01", "2024-03-10").unwrap();

        let parsed = CacheKeyScheme::parse(&s.range_group(range, PageGroup::Size(3))).unwrap();

        assert_eq!(parsed.provider, ProviderId::new("frankfurter"));
        assert_eq!(parsed.base_currency, Currency::gbp());
        assert_eq!(
            parsed.selector,
            KeySelector::Range {
                range,
                group: PageGroup::Size(3)
            }
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(CacheKeyScheme::parse("frankfurter:USD").is_none());
        assert!(CacheKeyScheme::parse("frankfurter:USD:yesterday").is_none());
        assert!(CacheKeyScheme::parse("frankfurter:USD:2024-01-01#p3").is_none());
        assert!(CacheKeyScheme::parse("frankfurter:USD:2024-01-01..2024-01-02#x3").is_none());
    }
}
