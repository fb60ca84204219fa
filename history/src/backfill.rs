//! Filling uncached runs from the rate provider.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::NaiveDate;
use futures::future::try_join_all;
use fxhistory_common::{DateRange, ExchangeRate};
use tracing::{debug, info, warn};

use crate::backend::CacheBackend;
use crate::error::{HistoryError, HistoryResult};
use crate::keys::CacheKeyScheme;
use crate::provider::RateProvider;
use crate::segment::{Segment, NO_PUBLICATION};

/// Result of reconciling a segmented range.
#[derive(Debug, Clone, Default)]
pub struct Backfill {
    /// Every record of the range, ascending by date.
    pub rates: Vec<ExchangeRate>,
    /// Ranged provider calls issued.
    pub fetches: usize,
    /// Days served from cache, including cached no-publication days.
    pub hit_days: usize,
    /// Days returned by the provider and written through.
    pub fetched_days: usize,
}

/// Fetches each MISS segment with one ranged call and writes results through.
pub struct BackfillOrchestrator<'a> {
    provider: &'a dyn RateProvider,
    backend: &'a dyn CacheBackend,
    keys: &'a CacheKeyScheme,
    ttl: Option<Duration>,
    parallel: bool,
}

impl<'a> BackfillOrchestrator<'a> {
    pub fn new(
        provider: &'a dyn RateProvider,
        backend: &'a dyn CacheBackend,
        keys: &'a CacheKeyScheme,
        ttl: Option<Duration>,
    ) -> Self {
        Self {
            provider,
            backend,
            keys,
            ttl,
            parallel: true,
        }
    }

    /// Fetch MISS segments concurrently (default) or one after another.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Resolve every segment into records and merge them by date.
    ///
    /// Any failed fetch or write aborts the whole backfill. Writes issued
    /// before the failure stay in the cache.
    pub async fn run(&self, segments: Vec<Segment>) -> HistoryResult<Backfill> {
        let mut merged: BTreeMap<NaiveDate, ExchangeRate> = BTreeMap::new();
        let mut misses = Vec::new();
        let mut hit_days = 0;

        for segment in segments {
            match segment {
                Segment::Hit(rate) => {
                    hit_days += 1;
                    merged.insert(rate.date, rate);
                }
                Segment::Closed(_) => hit_days += 1,
                Segment::Miss(range) => misses.push(range),
            }
        }

        let fetched = if self.parallel {
            try_join_all(misses.iter().map(|range| self.fill(*range))).await?
        } else {
            let mut fetched = Vec::with_capacity(misses.len());
            for range in &misses {
                fetched.push(self.fill(*range).await?);
            }
            fetched
        };

        let mut fetched_days = 0;
        for rate in fetched.into_iter().flatten() {
            fetched_days += 1;
            merged.insert(rate.date, rate);
        }

        if !misses.is_empty() {
            info!(
                provider = %self.provider.id(),
                base = %self.keys.base_currency(),
                fetches = misses.len(),
                fetched_days,
                hit_days,
                "Backfilled missing days"
            );
        }

        Ok(Backfill {
            rates: merged.into_values().collect(),
            fetches: misses.len(),
            hit_days,
            fetched_days,
        })
    }

    /// One ranged fetch followed by a write-through of every returned day.
    ///
    /// Skipped days before the last returned day are cached as
    /// no-publication. Skipped trailing days stay uncached, since the
    /// provider may not have published them yet.
    async fn fill(&self, range: DateRange) -> HistoryResult<Vec<ExchangeRate>> {
        let returned = self
            .provider
            .get_history(self.keys.base_currency(), range)
            .await?;

        let mut by_date: BTreeMap<NaiveDate, ExchangeRate> = BTreeMap::new();
        for rate in returned {
            if !range.contains(rate.date) {
                return Err(HistoryError::provider(
                    self.provider.id().as_str(),
                    format!("returned {} outside requested span {}", rate.date, range),
                ));
            }
            if by_date.insert(rate.date, rate).is_some() {
                warn!(range = %range, "Provider returned a day twice, keeping the last");
            }
        }

        let closed: Vec<NaiveDate> = match by_date.keys().next_back() {
            Some(last) => range
                .days()
                .take_while(|day| day < last)
                .filter(|day| !by_date.contains_key(day))
                .collect(),
            None => Vec::new(),
        };
        if by_date.len() as u32 != range.len_days() {
            debug!(
                range = %range,
                returned = by_date.len(),
                expected = range.len_days(),
                closed = closed.len(),
                "Provider returned a partial span"
            );
        }

        let rates: Vec<ExchangeRate> = by_date.into_values().collect();
        try_join_all(rates.iter().map(|rate| self.write_through(rate))).await?;
        try_join_all(closed.iter().map(|day| self.mark_closed(*day))).await?;
        Ok(rates)
    }

    async fn mark_closed(&self, day: NaiveDate) -> HistoryResult<()> {
        self.backend
            .set(&self.keys.day(day), NO_PUBLICATION.to_string(), self.ttl)
            .await
    }

    async fn write_through(&self, rate: &ExchangeRate) -> HistoryResult<()> {
        let value =
            serde_json::to_string(rate).map_err(|e| HistoryError::Serialization(e.to_string()))?;
        self.backend.set(&self.keys.day(rate.date), value, self.ttl).await
    }
}
